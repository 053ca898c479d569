use chrono::NaiveDateTime;

/// Label carried by EDF+ annotation channels.
pub const EDF_ANNOTATIONS_LABEL: &str = "EDF Annotations";
/// Label carried by BDF+ annotation channels.
pub const BDF_ANNOTATIONS_LABEL: &str = "BDF Annotations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Edf,
    EdfPlus,
    Bdf,
    BdfPlus,
}

impl FileType {
    /// Bytes occupied by one sample in a data record.
    pub fn sample_width(&self) -> usize {
        match self {
            FileType::Edf | FileType::EdfPlus => 2,
            FileType::Bdf | FileType::BdfPlus => 3,
        }
    }

    pub fn is_plus(&self) -> bool {
        matches!(self, FileType::EdfPlus | FileType::BdfPlus)
    }
}

/// Number of data records declared in the header.
///
/// `-1` in the header means the writer never patched the count in; it is
/// resolved once from the file size when the record layout is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCount {
    Known(u64),
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalHeader {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefilter: String,
    pub samples_per_record: u32,
}

impl SignalHeader {
    /// 是否是注释信号
    pub fn is_annotation(&self) -> bool {
        self.label == EDF_ANNOTATIONS_LABEL || self.label == BDF_ANNOTATIONS_LABEL
    }

    /// Samples per second given the record duration in seconds.
    pub fn sampling_rate(&self, record_duration: f64) -> f64 {
        self.samples_per_record as f64 / record_duration
    }
}

#[derive(Debug, Clone)]
pub struct FileHeader {
    pub file_type: FileType,
    pub start: NaiveDateTime,
    /// 头部声明的字节数，等于 256 * (信号数 + 1)
    pub header_size: u64,
    pub record_count: RecordCount,
    /// 数据记录持续时间（100纳秒为单位）
    pub record_duration: i64,
    /// 包含注释通道在内的信号总数
    pub signal_count: usize,
    pub reserved: String,

    pub patient: String,
    pub recording: String,

    // EDF+ 特有字段
    pub patient_code: String,
    pub sex: String,
    pub birthdate: String,
    pub patient_name: String,
    pub patient_additional: String,
    pub admin_code: String,
    pub technician: String,
    pub equipment: String,
    pub recording_additional: String,
}

impl FileHeader {
    /// Record duration in seconds.
    pub fn record_duration_secs(&self) -> f64 {
        self.record_duration as f64 / crate::EDFLIB_TIME_DIMENSION as f64
    }
}
