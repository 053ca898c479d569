//! Byte geometry of a data record.

use log::{debug, warn};

use crate::error::{EdfError, Result};
use crate::types::{RecordCount, SignalHeader};

/// Where one channel lives inside every data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLayout {
    /// 信号在数据记录中的字节偏移
    pub byte_offset: usize,
    /// 每个数据记录中的样本数
    pub sample_count: u32,
    /// 每个样本的字节数
    pub sample_width: usize,
}

impl ChannelLayout {
    /// Bytes this channel occupies in one record.
    pub fn span(&self) -> usize {
        self.sample_count as usize * self.sample_width
    }
}

/// Immutable record geometry, indexed by header position (annotation channels included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    header_size: u64,
    record_length: usize,
    record_count: u64,
    channels: Vec<ChannelLayout>,
}

impl RecordLayout {
    /// Builds the layout and resolves the record count against the file size.
    ///
    /// # Errors
    ///
    /// * `EdfError::TruncatedFile` - no samples are declared, the data region is
    ///   not a whole number of records, or it is shorter than the declared count
    /// * `EdfError::MalformedHeader` - a single channel declares zero samples, or
    ///   `sample_width` is neither 2 (EDF) nor 3 (BDF) bytes
    pub fn new(
        signals: &[SignalHeader],
        sample_width: usize,
        header_size: u64,
        declared: RecordCount,
        file_size: u64,
    ) -> Result<Self> {
        if !matches!(sample_width, 2 | 3) {
            return Err(EdfError::malformed(format!(
                "unsupported sample width of {} bytes",
                sample_width
            )));
        }

        let mut channels = Vec::with_capacity(signals.len());
        let mut offset = 0usize;

        for signal in signals {
            let channel = ChannelLayout {
                byte_offset: offset,
                sample_count: signal.samples_per_record,
                sample_width,
            };
            offset += channel.span();
            channels.push(channel);
        }
        let record_length = offset;

        if record_length == 0 {
            return Err(EdfError::TruncatedFile(format!(
                "{} signals declare no samples per record",
                signals.len()
            )));
        }

        // 部分通道为零会破坏偏移严格递增
        if let Some(i) = signals.iter().position(|s| s.samples_per_record == 0) {
            return Err(EdfError::malformed(format!(
                "signal {} ({}) declares zero samples per record",
                i, signals[i].label
            )));
        }

        if file_size < header_size {
            return Err(EdfError::TruncatedFile(format!(
                "file is {} bytes but the header alone is {}",
                file_size, header_size
            )));
        }
        let data_size = file_size - header_size;
        let whole_records = data_size / record_length as u64;
        let remainder = data_size % record_length as u64;

        let record_count = match declared {
            RecordCount::Unresolved => {
                if remainder != 0 {
                    return Err(EdfError::TruncatedFile(format!(
                        "{} data bytes is not a multiple of the {}-byte record",
                        data_size, record_length
                    )));
                }
                debug!("resolved unknown record count to {}", whole_records);
                whole_records
            }
            RecordCount::Known(n) => {
                if n > whole_records {
                    return Err(EdfError::TruncatedFile(format!(
                        "header declares {} records but only {} bytes ({} whole records) follow it",
                        n, data_size, whole_records
                    )));
                }
                if n < whole_records || remainder != 0 {
                    warn!(
                        "{} trailing bytes after {} declared records are ignored",
                        data_size - n * record_length as u64,
                        n
                    );
                }
                n
            }
        };

        debug!(
            "record layout: {} channels, {} bytes per record, {} records",
            channels.len(),
            record_length,
            record_count
        );

        Ok(RecordLayout {
            header_size,
            record_length,
            record_count,
            channels,
        })
    }

    pub fn header_size(&self) -> u64 {
        self.header_size
    }

    pub fn record_length(&self) -> usize {
        self.record_length
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn channels(&self) -> &[ChannelLayout] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelLayout> {
        self.channels.get(index)
    }

    /// Total samples of one channel across all records.
    pub fn samples_in_file(&self, index: usize) -> u64 {
        self.channels
            .get(index)
            .map_or(0, |c| c.sample_count as u64 * self.record_count)
    }

    /// Absolute file offset of the first byte of record `record`.
    pub fn record_offset(&self, record: u64) -> u64 {
        self.header_size + record * self.record_length as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(samples: u32) -> SignalHeader {
        SignalHeader {
            label: "EEG".to_string(),
            transducer: String::new(),
            physical_dimension: "uV".to_string(),
            physical_min: -100.0,
            physical_max: 100.0,
            digital_min: -32768,
            digital_max: 32767,
            prefilter: String::new(),
            samples_per_record: samples,
        }
    }

    #[test]
    fn test_offsets_and_spans() {
        let signals = vec![signal(256), signal(128), signal(15)];
        let layout = RecordLayout::new(&signals, 2, 1024, RecordCount::Known(3), 1024 + 3 * 798).unwrap();

        assert_eq!(layout.record_length(), (256 + 128 + 15) * 2);
        let offsets: Vec<usize> = layout.channels().iter().map(|c| c.byte_offset).collect();
        assert_eq!(offsets, vec![0, 512, 768]);

        let spans: usize = layout.channels().iter().map(|c| c.span()).sum();
        assert_eq!(spans, layout.record_length());
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(layout.samples_in_file(1), 384);
        assert_eq!(layout.record_offset(0), 1024);
        assert_eq!(layout.record_offset(2), 1024 + 2 * 798);
    }

    #[test]
    fn test_resolve_unknown_count() {
        let signals = vec![signal(10), signal(5)];
        let layout = RecordLayout::new(&signals, 3, 768, RecordCount::Unresolved, 768 + 7 * 45).unwrap();
        assert_eq!(layout.record_count(), 7);
    }

    #[test]
    fn test_unresolved_with_remainder() {
        let signals = vec![signal(10)];
        let err = RecordLayout::new(&signals, 2, 512, RecordCount::Unresolved, 512 + 41).unwrap_err();
        assert!(matches!(err, EdfError::TruncatedFile(_)));
    }

    #[test]
    fn test_declared_count_exceeds_file() {
        let signals = vec![signal(10)];
        let err = RecordLayout::new(&signals, 2, 512, RecordCount::Known(5), 512 + 80).unwrap_err();
        assert!(matches!(err, EdfError::TruncatedFile(_)));
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let signals = vec![signal(10)];
        let layout = RecordLayout::new(&signals, 2, 512, RecordCount::Known(2), 512 + 50).unwrap();
        assert_eq!(layout.record_count(), 2);
    }

    #[test]
    fn test_zero_record_length() {
        let err = RecordLayout::new(&[], 2, 256, RecordCount::Known(0), 256).unwrap_err();
        assert!(matches!(err, EdfError::TruncatedFile(_)));

        let err = RecordLayout::new(&[signal(0), signal(0)], 2, 768, RecordCount::Unresolved, 768).unwrap_err();
        assert!(matches!(err, EdfError::TruncatedFile(_)));
    }

    #[test]
    fn test_unsupported_sample_width() {
        let signals = vec![signal(10)];
        for width in [0, 1, 4] {
            let err = RecordLayout::new(&signals, width, 512, RecordCount::Known(1), 512 + 40).unwrap_err();
            assert!(matches!(err, EdfError::MalformedHeader(_)), "width {}: {:?}", width, err);
        }
    }

    #[test]
    fn test_single_empty_channel() {
        let err = RecordLayout::new(&[signal(4), signal(0)], 2, 768, RecordCount::Known(1), 776).unwrap_err();
        assert!(matches!(err, EdfError::MalformedHeader(_)));
    }
}
