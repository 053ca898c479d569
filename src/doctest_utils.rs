// Internal utilities for tests and documentation examples
// Builds byte images of recordings field by field; not a general-purpose writer.

use std::path::Path;

use crate::types::{BDF_ANNOTATIONS_LABEL, EDF_ANNOTATIONS_LABEL};
use crate::{Result, HEADER_BLOCK_SIZE};

type SampleFn = Box<dyn Fn(u64, u64) -> i32>;

/// One channel of a fixture recording.
pub struct FixtureSignal {
    label: String,
    transducer: String,
    dimension: String,
    physical: (f64, f64),
    digital: (i32, i32),
    prefilter: String,
    samples_per_record: u32,
    annotation: bool,
    generator: Option<SampleFn>,
}

impl FixtureSignal {
    /// A channel with digital range `[-2048, 2047]` mapped onto `[-500, 500]` mV.
    pub fn new(label: &str, samples_per_record: u32) -> Self {
        FixtureSignal {
            label: label.to_string(),
            transducer: "AgAgCl electrode".to_string(),
            dimension: "mV".to_string(),
            physical: (-500.0, 500.0),
            digital: (-2048, 2047),
            prefilter: "HP:0.1Hz LP:70Hz".to_string(),
            samples_per_record,
            annotation: false,
            generator: None,
        }
    }

    pub fn physical_range(mut self, min: f64, max: f64) -> Self {
        self.physical = (min, max);
        self
    }

    pub fn digital_range(mut self, min: i32, max: i32) -> Self {
        self.digital = (min, max);
        self
    }

    pub fn dimension(mut self, dimension: &str) -> Self {
        self.dimension = dimension.to_string();
        self
    }

    /// Raw value of sample `s` in record `r`. Defaults to a ramp over the digital range.
    pub fn samples<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, u64) -> i32 + 'static,
    {
        self.generator = Some(Box::new(f));
        self
    }

    fn sample(&self, record: u64, sample: u64) -> i32 {
        match &self.generator {
            Some(f) => f(record, sample),
            None => {
                let span = (self.digital.1 as i64 - self.digital.0 as i64 + 1).max(1);
                let n = (record * self.samples_per_record as u64 + sample) as i64;
                (self.digital.0 as i64 + n % span) as i32
            }
        }
    }
}

/// Assembles a complete recording in memory.
pub struct FixtureBuilder {
    bdf: bool,
    plus: bool,
    reserved: Option<String>,
    patient: String,
    recording: String,
    date: String,
    time: String,
    record_duration: String,
    records: u64,
    declared_records: Option<i64>,
    declared_header_size: Option<i64>,
    signals: Vec<FixtureSignal>,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        FixtureBuilder {
            bdf: false,
            plus: false,
            reserved: None,
            patient: "X X X X".to_string(),
            recording: "Startdate X X X X".to_string(),
            date: "01.01.24".to_string(),
            time: "00.00.00".to_string(),
            record_duration: "1".to_string(),
            records: 1,
            declared_records: None,
            declared_header_size: None,
            signals: Vec::new(),
        }
    }

    pub fn edf_plus(mut self) -> Self {
        self.plus = true;
        self
    }

    /// 24-bit samples with the BioSemi version field.
    pub fn bdf(mut self) -> Self {
        self.bdf = true;
        self
    }

    /// Overrides the reserved field (e.g. `EDF+D`).
    pub fn reserved(mut self, reserved: &str) -> Self {
        self.reserved = Some(reserved.to_string());
        self
    }

    pub fn patient(mut self, patient: &str) -> Self {
        self.patient = patient.to_string();
        self
    }

    pub fn recording(mut self, recording: &str) -> Self {
        self.recording = recording.to_string();
        self
    }

    /// Start date `dd.mm.yy` and time `hh.mm.ss`.
    pub fn start(mut self, date: &str, time: &str) -> Self {
        self.date = date.to_string();
        self.time = time.to_string();
        self
    }

    /// Record duration exactly as written in the header.
    pub fn record_duration(mut self, duration: &str) -> Self {
        self.record_duration = duration.to_string();
        self
    }

    /// Data records actually written.
    pub fn records(mut self, records: u64) -> Self {
        self.records = records;
        self
    }

    /// Record count written to the header, when it should differ from `records`.
    pub fn declared_records(mut self, declared: Option<i64>) -> Self {
        self.declared_records = declared;
        self
    }

    /// Header size written to the header, when it should differ from the real one.
    pub fn declared_header_size(mut self, declared: Option<i64>) -> Self {
        self.declared_header_size = declared;
        self
    }

    pub fn signal(mut self, signal: FixtureSignal) -> Self {
        self.signals.push(signal);
        self
    }

    /// Adds an annotation channel of `samples_per_record` two-byte (or three-byte) units.
    pub fn annotation_channel(mut self, samples_per_record: u32) -> Self {
        let mut signal = FixtureSignal::new(EDF_ANNOTATIONS_LABEL, samples_per_record)
            .physical_range(-1.0, 1.0)
            .digital_range(-32768, 32767)
            .dimension("");
        signal.transducer.clear();
        signal.prefilter.clear();
        signal.annotation = true;
        self.signals.push(signal);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let width = if self.bdf { 3 } else { 2 };
        let header_size = (self.signals.len() + 1) * HEADER_BLOCK_SIZE;
        let mut out = Vec::with_capacity(header_size);

        // 版本 (8字节)
        if self.bdf {
            out.push(0xFF);
            out.extend_from_slice(b"BIOSEMI");
        } else {
            put(&mut out, "0", 8);
        }

        let reserved = match (&self.reserved, self.bdf, self.plus) {
            (Some(r), _, _) => r.clone(),
            (None, true, true) => "BDF+C".to_string(),
            (None, true, false) => "24BIT".to_string(),
            (None, false, true) => "EDF+C".to_string(),
            (None, false, false) => String::new(),
        };

        put(&mut out, &self.patient, 80);
        put(&mut out, &self.recording, 80);
        put(&mut out, &self.date, 8);
        put(&mut out, &self.time, 8);
        put(&mut out, &self.declared_header_size.unwrap_or(header_size as i64).to_string(), 8);
        put(&mut out, &reserved, 44);
        put(&mut out, &self.declared_records.unwrap_or(self.records as i64).to_string(), 8);
        put(&mut out, &self.record_duration, 8);
        put(&mut out, &self.signals.len().to_string(), 4);

        // 按字段逐列写入所有信号
        let label = |s: &FixtureSignal| {
            if s.annotation && self.bdf {
                BDF_ANNOTATIONS_LABEL.to_string()
            } else {
                s.label.clone()
            }
        };
        for s in &self.signals { put(&mut out, &label(s), 16); }
        for s in &self.signals { put(&mut out, &s.transducer, 80); }
        for s in &self.signals { put(&mut out, &s.dimension, 8); }
        for s in &self.signals { put(&mut out, &s.physical.0.to_string(), 8); }
        for s in &self.signals { put(&mut out, &s.physical.1.to_string(), 8); }
        for s in &self.signals { put(&mut out, &s.digital.0.to_string(), 8); }
        for s in &self.signals { put(&mut out, &s.digital.1.to_string(), 8); }
        for s in &self.signals { put(&mut out, &s.prefilter, 80); }
        for s in &self.signals { put(&mut out, &s.samples_per_record.to_string(), 8); }
        for _ in &self.signals { put(&mut out, "", 32); }

        // 数据记录
        for record in 0..self.records {
            for s in &self.signals {
                let bytes = s.samples_per_record as usize * width;
                if s.annotation {
                    let tal = format!("+{}\x14\x14\0", record);
                    let mut block = tal.into_bytes();
                    block.resize(bytes, 0);
                    out.extend_from_slice(&block[..bytes]);
                    continue;
                }
                for sample in 0..s.samples_per_record as u64 {
                    let v = s.sample(record, sample);
                    out.extend_from_slice(&v.to_le_bytes()[..width]);
                }
            }
        }

        out
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.build())?;
        Ok(())
    }
}

impl Default for FixtureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 左对齐、空格填充、超长截断
fn put(out: &mut Vec<u8>, value: &str, width: usize) {
    let mut field = [b' '; 256];
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    field[..len].copy_from_slice(&bytes[..len]);
    out.extend_from_slice(&field[..width]);
}

/// Creates a simple single-channel test recording for documentation examples
pub fn create_simple_test_file<P: AsRef<Path>>(path: P) -> Result<()> {
    FixtureBuilder::new()
        .signal(FixtureSignal::new("EEG Fp1", 256).samples(|_, s| {
            let t = s as f64 / 256.0;
            (1000.0 * (2.0 * std::f64::consts::PI * 10.0 * t).sin()) as i32
        }))
        .records(2)
        .write_to(path)
}

/// Creates an EDF+ test recording with two sampling rates and an annotation channel
pub fn create_multi_channel_test_file<P: AsRef<Path>>(path: P) -> Result<()> {
    FixtureBuilder::new()
        .edf_plus()
        .signal(FixtureSignal::new("EEG C3", 256).physical_range(-200.0, 200.0).dimension("uV"))
        .signal(FixtureSignal::new("ECG Lead II", 128).physical_range(-5.0, 5.0))
        .annotation_channel(30)
        .records(2)
        .write_to(path)
}
