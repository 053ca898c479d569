//! Time-range to sample-range planning and the record I/O behind it.
//!
//! A channel with `spr` samples per record and record duration `d` puts time
//! `t` at global sample `round(t * spr / d)`. Both ends of a slice go through
//! that same function, so two abutting slices always concatenate into the
//! slice that covers both of them.

use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::error::{EdfError, Result};
use crate::layout::RecordLayout;

/// Sample range of one channel selected by a slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlan {
    /// Header position of the channel.
    pub index: usize,
    /// First global sample (inclusive).
    pub start: u64,
    /// Last global sample (exclusive).
    pub stop: u64,
}

impl ChannelPlan {
    pub fn len(&self) -> usize {
        (self.stop - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }
}

/// Resolved slice: clamped bounds, the records to touch and per-channel sample ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePlan {
    pub t_start: f64,
    pub t_stop: f64,
    pub records: Range<u64>,
    pub channels: Vec<ChannelPlan>,
}

/// Digital samples of one channel, trimmed to the requested time range.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChannel {
    pub index: usize,
    /// Global index of `samples[0]` within the channel.
    pub first_sample: u64,
    pub samples: Vec<i32>,
}

/// Output of [`SliceReader::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawSlice {
    pub t_start: f64,
    pub t_stop: f64,
    pub records: Range<u64>,
    pub channels: Vec<RawChannel>,
}

/// Plans and executes time-bounded reads against a fixed record layout.
#[derive(Debug, Clone, Copy)]
pub struct SliceReader<'a> {
    layout: &'a RecordLayout,
    record_duration: f64,
}

impl<'a> SliceReader<'a> {
    pub fn new(layout: &'a RecordLayout, record_duration: f64) -> Self {
        SliceReader { layout, record_duration }
    }

    /// Recording length in seconds.
    pub fn duration(&self) -> f64 {
        self.layout.record_count() as f64 * self.record_duration
    }

    /// Converts a time range into records and per-channel sample ranges.
    ///
    /// `None` bounds mean the start or end of the recording. Bounds outside the
    /// recording are clamped to it.
    ///
    /// # Errors
    ///
    /// * `EdfError::OutOfRange` - a bound is not finite, `t_start > t_stop`, or
    ///   `require_non_empty` is set and nothing of the recording lies in the range
    /// * `EdfError::InvalidSignalIndex` - a channel is not part of the layout
    pub fn plan(
        &self,
        channels: &[usize],
        t_start: Option<f64>,
        t_stop: Option<f64>,
        require_non_empty: bool,
    ) -> Result<SlicePlan> {
        let duration = self.duration();
        let start = t_start.unwrap_or(0.0);
        let stop = t_stop.unwrap_or(duration);

        if !start.is_finite() || !stop.is_finite() {
            return Err(EdfError::OutOfRange(format!(
                "bounds must be finite, got [{}, {})",
                start, stop
            )));
        }
        if start > stop {
            return Err(EdfError::OutOfRange(format!(
                "t_start {} is after t_stop {}",
                start, stop
            )));
        }

        let requested_empty = start == stop;
        let clamped_start = start.max(0.0);
        let clamped_stop = stop.min(duration).max(clamped_start);

        let record_count = self.layout.record_count();
        let first = ((clamped_start / self.record_duration).floor() as u64).min(record_count);
        let end = ((clamped_stop / self.record_duration).ceil() as u64).min(record_count);
        let records = if requested_empty || first >= end { first..first } else { first..end };

        if records.is_empty() && !requested_empty && require_non_empty {
            return Err(EdfError::OutOfRange(format!(
                "[{}, {}) does not overlap the recording [0, {})",
                start, stop, duration
            )));
        }

        let mut plans = Vec::with_capacity(channels.len());
        for &index in channels {
            let channel = self
                .layout
                .channel(index)
                .ok_or(EdfError::InvalidSignalIndex(index))?;
            let spr = channel.sample_count as u64;

            // 先按时间换算，再收紧到记录范围内
            let lo = records.start * spr;
            let hi = records.end * spr;
            let sample_start = self.sample_index(clamped_start, spr).clamp(lo, hi);
            let sample_stop = self.sample_index(clamped_stop, spr).clamp(sample_start, hi);

            plans.push(ChannelPlan {
                index,
                start: sample_start,
                stop: if requested_empty { sample_start } else { sample_stop },
            });
        }

        Ok(SlicePlan {
            t_start: clamped_start,
            t_stop: clamped_stop,
            records,
            channels: plans,
        })
    }

    fn sample_index(&self, t: f64, samples_per_record: u64) -> u64 {
        let rate = samples_per_record as f64 / self.record_duration;
        let total = samples_per_record * self.layout.record_count();
        ((t * rate).round().max(0.0) as u64).min(total)
    }

    /// Reads the planned samples, one covering read per record.
    ///
    /// Records are visited in order, so every channel's samples come out in
    /// time order. A short read surfaces as `EdfError::Io`.
    pub fn read<R: Read + Seek>(&self, source: &mut R, plan: &SlicePlan) -> Result<RawSlice> {
        let mut channels: Vec<RawChannel> = plan
            .channels
            .iter()
            .map(|c| RawChannel {
                index: c.index,
                first_sample: c.start,
                samples: Vec::with_capacity(c.len()),
            })
            .collect();

        let mut buf = Vec::new();

        for record in plan.records.clone() {
            // 每个通道在本记录内需要的样本区间
            let spans: Vec<Option<(u32, u32)>> = plan
                .channels
                .iter()
                .map(|c| self.span_in_record(c, record))
                .collect();

            let mut byte_lo = usize::MAX;
            let mut byte_hi = 0usize;
            for (plan_channel, span) in plan.channels.iter().zip(&spans) {
                if let Some((lo, hi)) = span {
                    let layout = &self.layout.channels()[plan_channel.index];
                    byte_lo = byte_lo.min(layout.byte_offset + *lo as usize * layout.sample_width);
                    byte_hi = byte_hi.max(layout.byte_offset + *hi as usize * layout.sample_width);
                }
            }
            if byte_lo >= byte_hi {
                continue;
            }

            let offset = self.layout.record_offset(record) + byte_lo as u64;
            trace!("record {}: reading {} bytes at {}", record, byte_hi - byte_lo, offset);

            buf.resize(byte_hi - byte_lo, 0);
            source.seek(SeekFrom::Start(offset))?;
            source.read_exact(&mut buf)?;

            for ((plan_channel, span), out) in plan.channels.iter().zip(&spans).zip(channels.iter_mut()) {
                if let Some((lo, hi)) = span {
                    let layout = &self.layout.channels()[plan_channel.index];
                    let width = layout.sample_width;
                    let begin = layout.byte_offset + *lo as usize * width - byte_lo;
                    let end = layout.byte_offset + *hi as usize * width - byte_lo;
                    decode_samples(&buf[begin..end], width, &mut out.samples);
                }
            }
        }

        Ok(RawSlice {
            t_start: plan.t_start,
            t_stop: plan.t_stop,
            records: plan.records.clone(),
            channels,
        })
    }

    /// Part of `[plan.start, plan.stop)` inside `record`, in record-local sample indices.
    fn span_in_record(&self, plan: &ChannelPlan, record: u64) -> Option<(u32, u32)> {
        let spr = self.layout.channels()[plan.index].sample_count as u64;
        let record_start = record * spr;
        let lo = plan.start.max(record_start);
        let hi = plan.stop.min(record_start + spr);
        if lo >= hi {
            return None;
        }
        Some(((lo - record_start) as u32, (hi - record_start) as u32))
    }
}

/// 小端有符号整数，EDF 为 16 位，BDF 为 24 位
fn decode_samples(bytes: &[u8], width: usize, out: &mut Vec<i32>) {
    match width {
        2 => out.extend(bytes.chunks_exact(2).map(|b| LittleEndian::read_i16(b) as i32)),
        3 => out.extend(bytes.chunks_exact(3).map(LittleEndian::read_i24)),
        // RecordLayout::new 只接受 2 或 3
        _ => unreachable!("sample width is always 2 or 3 bytes"),
    }
}
