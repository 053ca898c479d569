//! Fixed-width ASCII header parsing.
//!
//! The header is a 256-byte main block followed by `signal_count` blocks of
//! 256 bytes each. The per-signal block is stored field-major: all labels
//! first, then all transducers, and so on.

use std::io::{self, Read};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Datelike};
use log::debug;

use crate::error::{EdfError, Result};
use crate::types::{FileHeader, FileType, RecordCount, SignalHeader};
use crate::utils::{field_str, parse_edf_time, parse_float_field, parse_int_field};
use crate::{EDFLIB_MAXSIGNALS, HEADER_BLOCK_SIZE};

/// Per-signal field widths in header order. They sum to `HEADER_BLOCK_SIZE`.
const LABEL_WIDTH: usize = 16;
const TRANSDUCER_WIDTH: usize = 80;
const DIMENSION_WIDTH: usize = 8;
const NUMBER_WIDTH: usize = 8;
const PREFILTER_WIDTH: usize = 80;
const RESERVED_WIDTH: usize = 32;

/// Reads and validates the complete header from a source positioned at offset 0.
///
/// Does not touch the data records. The declared record count is returned as-is;
/// an unknown count (`-1`) is resolved later by [`crate::layout::RecordLayout`].
///
/// # Errors
///
/// * `EdfError::MalformedHeader` - a field fails to parse, the declared header
///   size disagrees with the signal count, or a calibration range is empty
/// * `EdfError::UnsupportedFileType` - unknown version or a discontinuous recording
pub fn parse_header<R: Read>(reader: &mut R) -> Result<(FileHeader, Vec<SignalHeader>)> {
    // 读取主头部（256字节）
    let mut main_header = [0u8; HEADER_BLOCK_SIZE];
    read_header_bytes(reader, &mut main_header)?;

    let mut header = parse_main_header(&main_header)?;

    // 读取信号头部信息
    let mut signal_block = vec![0u8; header.signal_count * HEADER_BLOCK_SIZE];
    read_header_bytes(reader, &mut signal_block)?;

    let signals = parse_signal_headers(&signal_block, header.signal_count)?;

    // EDF+ 必须带注释通道，缺失时按普通文件处理
    if header.file_type.is_plus() && !signals.iter().any(|s| s.is_annotation()) {
        debug!("EDF+/BDF+ header without annotation channel, reading as plain file");
        header.file_type = match header.file_type {
            FileType::BdfPlus => FileType::Bdf,
            _ => FileType::Edf,
        };
    }

    Ok((header, signals))
}

fn read_header_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => EdfError::malformed("header is shorter than declared"),
        _ => EdfError::Io(e),
    })
}

/// 解析主头部
fn parse_main_header(main_header: &[u8; HEADER_BLOCK_SIZE]) -> Result<FileHeader> {
    // 验证版本标识
    let mut file_type = detect_version(&main_header[0..8])?;

    // 解析信号数量
    let signal_count = parse_int_field(&main_header[252..256], "number of signals")?;
    if signal_count < 0 || signal_count > EDFLIB_MAXSIGNALS as i64 {
        return Err(EdfError::malformed(format!("invalid number of signals: {}", signal_count)));
    }
    let signal_count = signal_count as usize;

    // 验证头部大小
    let header_size = parse_int_field(&main_header[184..192], "header size")?;
    let expected_header_size = ((signal_count + 1) * HEADER_BLOCK_SIZE) as i64;
    if header_size != expected_header_size {
        return Err(EdfError::malformed(format!(
            "header size is {} but {} signals require {}",
            header_size, signal_count, expected_header_size
        )));
    }

    // 检查EDF+/BDF+标识
    let reserved = field_str(&main_header[192..236]);
    if reserved.starts_with("EDF+D") || reserved.starts_with("BDF+D") {
        return Err(EdfError::UnsupportedFileType(
            "discontinuous recordings are not supported".to_string(),
        ));
    }
    if reserved.starts_with("EDF+C") && file_type == FileType::Edf {
        file_type = FileType::EdfPlus;
    } else if reserved.starts_with("BDF+C") && file_type == FileType::Bdf {
        file_type = FileType::BdfPlus;
    }

    // 解析数据记录信息
    let record_count = match parse_int_field(&main_header[236..244], "number of data records")? {
        -1 => RecordCount::Unresolved,
        n if n < 0 => {
            return Err(EdfError::malformed(format!("invalid number of data records: {}", n)));
        }
        n => RecordCount::Known(n as u64),
    };

    let duration_str = field_str(&main_header[244..252]);
    let record_duration = parse_edf_time(&duration_str)
        .map_err(|_| EdfError::malformed(format!("invalid record duration: {:?}", duration_str)))?;
    if record_duration <= 0 {
        return Err(EdfError::malformed(format!(
            "record duration must be positive, got {:?}",
            duration_str
        )));
    }

    let patient = field_str(&main_header[8..88]);
    let recording = field_str(&main_header[88..168]);

    // 解析日期和时间
    let mut start = parse_datetime(&main_header[168..176], &main_header[176..184])?;

    let (patient_code, sex, birthdate, patient_name, patient_additional) =
        split_patient_field(&patient, file_type.is_plus());
    let (startdate, admin_code, technician, equipment, recording_additional) =
        split_recording_field(&recording, file_type.is_plus());

    // EDF+ 记录字段中的 Startdate 带有四位年份
    if let Some(year) = startdate.as_deref().and_then(parse_startdate_year) {
        if let Some(date) = start.date().with_year(year) {
            start = NaiveDateTime::new(date, start.time());
        }
    }

    Ok(FileHeader {
        file_type,
        start,
        header_size: header_size as u64,
        record_count,
        record_duration,
        signal_count,
        reserved,
        patient,
        recording,
        patient_code,
        sex,
        birthdate,
        patient_name,
        patient_additional,
        admin_code,
        technician,
        equipment,
        recording_additional,
    })
}

fn detect_version(version: &[u8]) -> Result<FileType> {
    if version[0] == 0xFF && &version[1..8] == b"BIOSEMI" {
        return Ok(FileType::Bdf);
    }

    if field_str(version) == "0" {
        return Ok(FileType::Edf);
    }

    Err(EdfError::UnsupportedFileType(format!(
        "unknown version field: {:?}",
        String::from_utf8_lossy(version)
    )))
}

/// 解析信号参数
fn parse_signal_headers(block: &[u8], count: usize) -> Result<Vec<SignalHeader>> {
    let mut signals = Vec::with_capacity(count);

    let field = |column_start: usize, width: usize, i: usize| column(block, count, column_start, width, i);

    let transducer_col = LABEL_WIDTH;
    let dimension_col = transducer_col + TRANSDUCER_WIDTH;
    let phys_min_col = dimension_col + DIMENSION_WIDTH;
    let phys_max_col = phys_min_col + NUMBER_WIDTH;
    let dig_min_col = phys_max_col + NUMBER_WIDTH;
    let dig_max_col = dig_min_col + NUMBER_WIDTH;
    let prefilter_col = dig_max_col + NUMBER_WIDTH;
    let samples_col = prefilter_col + PREFILTER_WIDTH;
    debug_assert_eq!(samples_col + NUMBER_WIDTH + RESERVED_WIDTH, HEADER_BLOCK_SIZE);

    for i in 0..count {
        let label = field_str(field(0, LABEL_WIDTH, i));

        let samples = parse_int_field(field(samples_col, NUMBER_WIDTH, i), "samples per record")?;
        if samples < 0 || samples > u32::MAX as i64 {
            return Err(EdfError::malformed(format!(
                "signal {} ({}) declares {} samples per record",
                i, label, samples
            )));
        }

        let physical_min = parse_float_field(field(phys_min_col, NUMBER_WIDTH, i), "physical minimum")?;
        let physical_max = parse_float_field(field(phys_max_col, NUMBER_WIDTH, i), "physical maximum")?;
        let digital_min = parse_digital(field(dig_min_col, NUMBER_WIDTH, i), "digital minimum")?;
        let digital_max = parse_digital(field(dig_max_col, NUMBER_WIDTH, i), "digital maximum")?;

        let signal = SignalHeader {
            label,
            transducer: field_str(field(transducer_col, TRANSDUCER_WIDTH, i)),
            physical_dimension: field_str(field(dimension_col, DIMENSION_WIDTH, i)),
            physical_min,
            physical_max,
            digital_min,
            digital_max,
            prefilter: field_str(field(prefilter_col, PREFILTER_WIDTH, i)),
            samples_per_record: samples as u32,
        };

        // 注释通道不做标定，跳过范围检查
        if !signal.is_annotation() {
            if signal.physical_max <= signal.physical_min {
                return Err(EdfError::malformed(format!(
                    "signal {} ({}) physical range [{}, {}] is empty",
                    i, signal.label, signal.physical_min, signal.physical_max
                )));
            }
            if signal.digital_max <= signal.digital_min {
                return Err(EdfError::malformed(format!(
                    "signal {} ({}) digital range [{}, {}] is empty",
                    i, signal.label, signal.digital_min, signal.digital_max
                )));
            }
        }

        signals.push(signal);
    }

    Ok(signals)
}

/// 字段按列存储：第 n 个字段的起点是前面所有字段宽度之和乘以信号数
fn column(block: &[u8], count: usize, column_start: usize, width: usize, i: usize) -> &[u8] {
    let start = column_start * count + i * width;
    &block[start..start + width]
}

fn parse_digital(bytes: &[u8], name: &str) -> Result<i32> {
    let value = parse_int_field(bytes, name)?;
    i32::try_from(value).map_err(|_| EdfError::malformed(format!("{} out of range: {}", name, value)))
}

/// 解析日期时间 "dd.mm.yy" / "hh.mm.ss"
fn parse_datetime(date_field: &[u8], time_field: &[u8]) -> Result<NaiveDateTime> {
    let date = parse_dotted(date_field, "start date")?;
    let time = parse_dotted(time_field, "start time")?;

    // 1985 年为分界
    let year = if date[2] >= 85 { 1900 + date[2] } else { 2000 + date[2] };

    let start_date = NaiveDate::from_ymd_opt(year as i32, date[1], date[0])
        .ok_or_else(|| EdfError::malformed(format!("invalid start date: {:?}", field_str(date_field))))?;
    let start_time = NaiveTime::from_hms_opt(time[0], time[1], time[2])
        .ok_or_else(|| EdfError::malformed(format!("invalid start time: {:?}", field_str(time_field))))?;

    Ok(NaiveDateTime::new(start_date, start_time))
}

fn parse_dotted(field: &[u8], name: &str) -> Result<[u32; 3]> {
    let s = field_str(field);
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 3 {
        return Err(EdfError::malformed(format!("{} is not dotted: {:?}", name, s)));
    }

    let mut out = [0u32; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        if part.len() != 2 || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(EdfError::malformed(format!("{} is malformed: {:?}", name, s)));
        }
        *slot = part.parse().map_err(|_| EdfError::malformed(format!("{} is malformed: {:?}", name, s)))?;
    }
    Ok(out)
}

/// 解析EDF+患者字段: "patientcode sex birthdate patientname additional_info"
fn split_patient_field(field: &str, plus: bool) -> (String, String, String, String, String) {
    if !plus {
        return Default::default();
    }

    let parts: Vec<&str> = field.split_whitespace().collect();
    let get = |i: usize| parts.get(i).map(|s| s.to_string()).unwrap_or_default();

    (get(0), get(1), get(2), get(3), parts.get(4..).map(|s| s.join(" ")).unwrap_or_default())
}

/// 解析EDF+记录字段: "Startdate dd-MMM-yyyy admincode technician equipment additional_info"
fn split_recording_field(
    field: &str,
    plus: bool,
) -> (Option<String>, String, String, String, String) {
    if !plus {
        return Default::default();
    }

    let parts: Vec<&str> = field.split_whitespace().collect();
    if parts.first() != Some(&"Startdate") {
        return (None, String::new(), String::new(), String::new(), field.to_string());
    }

    let get = |i: usize| parts.get(i).map(|s| s.to_string()).unwrap_or_default();
    (
        parts.get(1).map(|s| s.to_string()),
        get(2),
        get(3),
        get(4),
        parts.get(5..).map(|s| s.join(" ")).unwrap_or_default(),
    )
}

fn parse_startdate_year(s: &str) -> Option<i32> {
    NaiveDate::parse_from_str(s, "%d-%b-%Y").ok().map(|d| d.year())
}
