use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, trace};

use crate::calibration::{CalibrationParams, CalibrationTable};
use crate::config::ReaderOptions;
use crate::decoder::{group_by_rate, partition, ChannelGroup, Decoder};
use crate::error::{EdfError, Result};
use crate::header::parse_header;
use crate::layout::RecordLayout;
use crate::slice::{RawSlice, SliceReader};
use crate::types::{FileHeader, SignalHeader};

/// A time-bounded block of channels sharing one sampling rate.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalBlock {
    /// Channel indices, one per column of `data`.
    pub channels: Vec<usize>,
    pub sampling_rate: f64,
    /// Time of the first returned sample, in seconds from recording start.
    pub t_start: f64,
    /// One column per channel; every column has the same length.
    pub data: Vec<Vec<f64>>,
}

impl SignalBlock {
    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.data.first().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reading session over one EDF/EDF+/BDF recording
///
/// Opening parses the header, builds the record layout and calibration table
/// and groups channels by sampling rate. None of that changes afterwards;
/// reads only seek and read the bytes a slice needs.
///
/// Annotation channels are part of the record layout but are not exposed:
/// channel indices count data channels only.
///
/// # Examples
///
/// ```rust
/// use edfslice::EdfReader;
///
/// # // Generate test file (hidden from docs)
/// # edfslice::doctest_utils::create_simple_test_file("recording.edf")?;
/// #
/// let mut reader = EdfReader::open("recording.edf")?;
/// println!("Duration: {:.1} seconds", reader.duration());
///
/// for (i, signal) in reader.channel_headers().iter().enumerate() {
///     println!("Signal {}: {} ({})", i, signal.label, signal.physical_dimension);
/// }
///
/// // 300 ms starting half a second in
/// let slice = reader.read_slice(&[0], Some(0.5), Some(0.8))?;
/// println!("Read {} samples", slice[&0].len());
///
/// reader.close();
/// # std::fs::remove_file("recording.edf").ok();
/// # Ok::<(), edfslice::EdfError>(())
/// ```
pub struct EdfReader<R = BufReader<File>> {
    source: R,
    header: FileHeader,
    /// 对外可见的信号（不含注释通道）
    signals: Vec<SignalHeader>,
    /// 可见通道号 -> 头部中的位置
    header_index: Vec<usize>,
    layout: RecordLayout,
    calibration: CalibrationTable,
    groups: Vec<ChannelGroup>,
    options: ReaderOptions,
    /// 读取失败后会话不可再用
    failed: bool,
}

impl EdfReader<BufReader<File>> {
    /// Opens a recording with default options
    ///
    /// # Errors
    ///
    /// * `EdfError::FileNotFound` - File doesn't exist or can't be opened
    /// * `EdfError::MalformedHeader` - Header fields are unparsable or inconsistent
    /// * `EdfError::TruncatedFile` - Declared sizes disagree with the file size
    /// * `EdfError::UnsupportedFileType` - Not EDF/BDF, or a discontinuous recording
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReaderOptions) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| EdfError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;

        debug!("opening {}", path.as_ref().display());
        Self::from_reader_with_options(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> EdfReader<R> {
    /// Builds a session over any seekable byte source.
    ///
    /// The file size is taken by seeking to the end of `source`.
    pub fn from_reader(source: R) -> Result<Self> {
        Self::from_reader_with_options(source, ReaderOptions::default())
    }

    pub fn from_reader_with_options(mut source: R, options: ReaderOptions) -> Result<Self> {
        let file_size = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        // 读取并解析头部
        let (header, all_signals) = parse_header(&mut source)?;

        let layout = RecordLayout::new(
            &all_signals,
            header.file_type.sample_width(),
            header.header_size,
            header.record_count,
            file_size,
        )?;

        // 只有非注释信号才添加到用户可见的信号列表中
        let (header_index, signals): (Vec<usize>, Vec<SignalHeader>) = all_signals
            .into_iter()
            .enumerate()
            .filter(|(_, s)| !s.is_annotation())
            .unzip();

        let calibration = CalibrationTable::new(&signals);
        let groups = group_by_rate(&signals, header.record_duration_secs());

        debug!(
            "{:?}: {} channels in {} rate groups, {} records of {}s",
            header.file_type,
            signals.len(),
            groups.len(),
            layout.record_count(),
            header.record_duration_secs()
        );

        Ok(EdfReader {
            source,
            header,
            signals,
            header_index,
            layout,
            calibration,
            groups,
            options,
            failed: false,
        })
    }

    /// Gets a reference to the file header information
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Data channel headers in file order, annotation channels excluded.
    pub fn channel_headers(&self) -> &[SignalHeader] {
        &self.signals
    }

    pub fn channel_count(&self) -> usize {
        self.signals.len()
    }

    /// Indices of every data channel.
    pub fn all_channels(&self) -> Vec<usize> {
        (0..self.signals.len()).collect()
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Number of data records, resolved against the file size when the header left it open.
    pub fn record_count(&self) -> u64 {
        self.layout.record_count()
    }

    /// Recording length in seconds.
    pub fn duration(&self) -> f64 {
        self.layout.record_count() as f64 * self.header.record_duration_secs()
    }

    pub fn t_start(&self) -> f64 {
        0.0
    }

    pub fn t_stop(&self) -> f64 {
        self.duration()
    }

    pub fn sampling_rate(&self, channel: usize) -> Result<f64> {
        let signal = self.signals.get(channel).ok_or(EdfError::InvalidSignalIndex(channel))?;
        Ok(signal.sampling_rate(self.header.record_duration_secs()))
    }

    pub fn samples_in_file(&self, channel: usize) -> Result<u64> {
        let index = *self.header_index.get(channel).ok_or(EdfError::InvalidSignalIndex(channel))?;
        Ok(self.layout.samples_in_file(index))
    }

    pub fn calibration(&self, channel: usize) -> Result<CalibrationParams> {
        self.calibration
            .get(channel)
            .copied()
            .ok_or(EdfError::InvalidSignalIndex(channel))
    }

    /// Reads digital samples of `channels` covering `[t_start, t_stop)`
    ///
    /// `None` bounds stand for the start or end of the recording. The
    /// returned channels keep the order of `channels` and carry data-channel
    /// indices.
    ///
    /// # Errors
    ///
    /// * `EdfError::InvalidSignalIndex` - a channel index is out of bounds
    /// * `EdfError::OutOfRange` - see [`SliceReader::plan`]
    /// * `EdfError::Io` - the underlying read failed; the session is unusable afterwards
    /// * `EdfError::SessionUnusable` - a previous read failed
    pub fn read_raw_slice(
        &mut self,
        channels: &[usize],
        t_start: Option<f64>,
        t_stop: Option<f64>,
    ) -> Result<RawSlice> {
        if self.failed {
            return Err(EdfError::SessionUnusable);
        }

        let mut positions = Vec::with_capacity(channels.len());
        for &channel in channels {
            positions.push(*self.header_index.get(channel).ok_or(EdfError::InvalidSignalIndex(channel))?);
        }

        let slicer = SliceReader::new(&self.layout, self.header.record_duration_secs());
        let plan = slicer.plan(&positions, t_start, t_stop, self.options.require_non_empty)?;
        trace!(
            "slice [{}, {}) -> records {:?}, {} channels",
            plan.t_start,
            plan.t_stop,
            plan.records,
            plan.channels.len()
        );

        let mut raw = match slicer.read(&mut self.source, &plan) {
            Ok(raw) => raw,
            Err(e) => {
                self.failed = true;
                return Err(e);
            }
        };

        // 换回对外的通道号
        for (out, &channel) in raw.channels.iter_mut().zip(channels) {
            out.index = channel;

            if self.options.clamp_to_digital_range {
                // 应用数字范围限制
                let signal = &self.signals[channel];
                for v in out.samples.iter_mut() {
                    *v = (*v).clamp(signal.digital_min, signal.digital_max);
                }
            }
        }

        Ok(raw)
    }

    /// Reads physical values of `channels` covering `[t_start, t_stop)`
    ///
    /// Values are `raw * gain + offset` in each channel's physical dimension.
    /// `t_start == t_stop` yields an empty buffer per channel.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use edfslice::EdfReader;
    ///
    /// # edfslice::doctest_utils::create_multi_channel_test_file("multi_channel.edf")?;
    /// let mut reader = EdfReader::open("multi_channel.edf")?;
    /// let all = reader.all_channels();
    ///
    /// let whole = reader.read_slice(&all, None, None)?;
    /// let head = reader.read_slice(&all, None, Some(0.25))?;
    /// let tail = reader.read_slice(&all, Some(0.25), None)?;
    ///
    /// for channel in all {
    ///     assert_eq!(head[&channel].len() + tail[&channel].len(), whole[&channel].len());
    /// }
    /// # drop(reader);
    /// # std::fs::remove_file("multi_channel.edf").ok();
    /// # Ok::<(), edfslice::EdfError>(())
    /// ```
    pub fn read_slice(
        &mut self,
        channels: &[usize],
        t_start: Option<f64>,
        t_stop: Option<f64>,
    ) -> Result<BTreeMap<usize, Vec<f64>>> {
        let raw = self.read_raw_slice(channels, t_start, t_stop)?;
        let decoder = Decoder::new(&self.calibration);

        raw.channels
            .iter()
            .map(|c| Ok((c.index, decoder.decode_channel(c)?)))
            .collect()
    }

    /// Reads physical values batched per the session's [`SignalGroupMode`](crate::SignalGroupMode)
    ///
    /// Each block holds channels of one sampling rate, so its columns have equal length.
    pub fn read_slice_grouped(
        &mut self,
        channels: &[usize],
        t_start: Option<f64>,
        t_stop: Option<f64>,
    ) -> Result<Vec<SignalBlock>> {
        let raw = self.read_raw_slice(channels, t_start, t_stop)?;
        let decoder = Decoder::new(&self.calibration);
        let record_duration = self.header.record_duration_secs();

        let units = partition(self.options.group_mode, &self.groups, channels);
        let mut blocks = Vec::with_capacity(units.len());

        for unit in units {
            let mut data = Vec::with_capacity(unit.len());
            let mut first_sample = None;
            for &channel in &unit {
                if let Some(c) = raw.channels.iter().find(|c| c.index == channel) {
                    if first_sample.is_none() {
                        first_sample = Some(c.first_sample);
                    }
                    data.push(decoder.decode_channel(c)?);
                }
            }

            let sampling_rate = self.signals[unit[0]].sampling_rate(record_duration);
            let t_start = match first_sample {
                Some(s) if !data[0].is_empty() => s as f64 / sampling_rate,
                _ => raw.t_start,
            };

            blocks.push(SignalBlock {
                channels: unit,
                sampling_rate,
                t_start,
                data,
            });
        }

        Ok(blocks)
    }

    /// Releases the underlying file handle.
    pub fn close(self) {
        debug!("closing session");
    }
}
