//! Calibration of raw slices and grouping of channels by sampling rate.

use std::collections::BTreeMap;

use crate::calibration::{CalibrationParams, CalibrationTable};
use crate::error::{EdfError, Result};
use crate::slice::RawChannel;
use crate::types::SignalHeader;

/// How grouped reads batch channels together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalGroupMode {
    /// One block per distinct sampling rate.
    #[default]
    GroupByRate,
    /// One block per channel.
    SplitAll,
}

/// Channels sharing one effective sampling rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelGroup {
    pub samples_per_record: u32,
    pub sampling_rate: f64,
    pub channels: Vec<usize>,
}

/// Partitions channels into groups of identical sampling rate.
///
/// Every channel shares one record duration, so equal rates are equal
/// samples-per-record counts and the comparison stays exact. Groups are ordered
/// by their first channel.
pub fn group_by_rate(signals: &[SignalHeader], record_duration: f64) -> Vec<ChannelGroup> {
    let mut groups: Vec<ChannelGroup> = Vec::new();

    for (index, signal) in signals.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|g| g.samples_per_record == signal.samples_per_record)
        {
            Some(group) => group.channels.push(index),
            None => groups.push(ChannelGroup {
                samples_per_record: signal.samples_per_record,
                sampling_rate: signal.sampling_rate(record_duration),
                channels: vec![index],
            }),
        }
    }

    groups
}

/// Splits a channel selection into output units, preserving the selection's order
/// inside each unit.
pub fn partition(
    mode: SignalGroupMode,
    groups: &[ChannelGroup],
    selection: &[usize],
) -> Vec<Vec<usize>> {
    match mode {
        SignalGroupMode::SplitAll => selection.iter().map(|&c| vec![c]).collect(),
        SignalGroupMode::GroupByRate => {
            // 组号 -> 该组内被选中的通道
            let mut units: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for &channel in selection {
                if let Some(g) = groups.iter().position(|g| g.channels.contains(&channel)) {
                    units.entry(g).or_default().push(channel);
                }
            }
            units.into_values().collect()
        }
    }
}

/// Applies `physical = raw * gain + offset` to raw channels.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    table: &'a CalibrationTable,
}

impl<'a> Decoder<'a> {
    pub fn new(table: &'a CalibrationTable) -> Self {
        Decoder { table }
    }

    /// Decodes one raw channel. `raw.index` is the header position.
    ///
    /// # Errors
    ///
    /// * `EdfError::InvalidSignalIndex` - the table has no entry for `raw.index`
    pub fn decode_channel(&self, raw: &RawChannel) -> Result<Vec<f64>> {
        let params = self
            .table
            .get(raw.index)
            .ok_or(EdfError::InvalidSignalIndex(raw.index))?;
        Ok(decode(&raw.samples, params))
    }
}

/// 将数字值转换为物理值
pub fn decode(samples: &[i32], params: &CalibrationParams) -> Vec<f64> {
    samples.iter().map(|&d| params.to_physical(d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(samples: u32) -> SignalHeader {
        SignalHeader {
            label: format!("S{}", samples),
            transducer: String::new(),
            physical_dimension: "mV".to_string(),
            physical_min: -500.0,
            physical_max: 500.0,
            digital_min: -2048,
            digital_max: 2047,
            prefilter: String::new(),
            samples_per_record: samples,
        }
    }

    #[test]
    fn test_group_by_rate() {
        let signals = vec![signal(256), signal(128), signal(256), signal(1), signal(128)];
        let groups = group_by_rate(&signals, 2.0);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].channels, vec![0, 2]);
        assert_eq!(groups[0].sampling_rate, 128.0);
        assert_eq!(groups[1].channels, vec![1, 4]);
        assert_eq!(groups[2].channels, vec![3]);
        assert_eq!(groups[2].sampling_rate, 0.5);
    }

    #[test]
    fn test_partition_modes() {
        let signals = vec![signal(256), signal(128), signal(256)];
        let groups = group_by_rate(&signals, 1.0);

        let grouped = partition(SignalGroupMode::GroupByRate, &groups, &[2, 1, 0]);
        assert_eq!(grouped, vec![vec![2, 0], vec![1]]);

        let split = partition(SignalGroupMode::SplitAll, &groups, &[2, 1, 0]);
        assert_eq!(split, vec![vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn test_decode_reference_values() {
        let table = CalibrationTable::new(&[signal(256)]);
        let decoder = Decoder::new(&table);
        let raw = RawChannel {
            index: 0,
            first_sample: 0,
            samples: vec![-2048, 0, 2047],
        };

        let values = decoder.decode_channel(&raw).unwrap();
        assert!((values[0] + 500.0).abs() < 1e-6);
        assert!((values[1] - 0.1221).abs() < 1e-3);
        assert!((values[2] - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_unknown_channel() {
        let table = CalibrationTable::new(&[signal(256)]);
        let raw = RawChannel {
            index: 3,
            first_sample: 0,
            samples: vec![1, 2, 3],
        };
        let err = Decoder::new(&table).decode_channel(&raw).unwrap_err();
        assert!(matches!(err, EdfError::InvalidSignalIndex(3)));
    }
}
