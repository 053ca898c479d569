//! # edfslice
//!
//! A pure Rust reader for EDF, EDF+ and BDF recordings that serves arbitrary
//! time ranges without loading the whole file.
//!
//! Opening a file parses the header once, derives the byte layout of a data
//! record and the per-channel calibration, and keeps the file handle. Every
//! slice request then reads only the bytes that cover it.
//!
//! ## Quick Start
//!
//! ```rust
//! use edfslice::{EdfReader, Result};
//!
//! fn main() -> Result<()> {
//!     # edfslice::doctest_utils::create_simple_test_file("test_data.edf")?;
//!     let mut reader = EdfReader::open("test_data.edf")?;
//!
//!     println!("Number of signals: {}", reader.channel_count());
//!     println!("File duration: {:.2} seconds", reader.duration());
//!
//!     // Physical values of channel 0 between 0.5 s and 0.8 s
//!     let slice = reader.read_slice(&[0], Some(0.5), Some(0.8))?;
//!     println!("Read {} samples", slice[&0].len());
//!
//!     reader.close();
//!     # std::fs::remove_file("test_data.edf").ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Physical vs Digital Values
//!
//! Samples are stored as little-endian integers (16-bit for EDF, 24-bit for
//! BDF). Each channel declares a digital range and the physical range it maps
//! onto, which fixes a linear transform:
//!
//! ```rust
//! use edfslice::{CalibrationParams, SignalHeader};
//!
//! let signal = SignalHeader {
//!     label: "ECG".to_string(),
//!     transducer: String::new(),
//!     physical_dimension: "mV".to_string(),
//!     physical_min: -500.0,
//!     physical_max: 500.0,
//!     digital_min: -2048,
//!     digital_max: 2047,
//!     prefilter: String::new(),
//!     samples_per_record: 256,
//! };
//!
//! let cal = CalibrationParams::from_signal(&signal);
//! assert!((cal.to_physical(2047) - 500.0).abs() < 1e-6);
//! assert!((cal.to_physical(0) - 0.122).abs() < 1e-3);
//! ```
//!
//! ## Grouped reads
//!
//! Channels with the same sampling rate can be read as one rectangular block
//! with [`EdfReader::read_slice_grouped`]; [`SignalGroupMode::SplitAll`] returns
//! one block per channel instead.

pub mod calibration;
pub mod config;
pub mod decoder;
pub mod error;
pub mod header;
pub mod layout;
pub mod reader;
pub mod slice;
pub mod types;
pub mod utils;

#[doc(hidden)]
pub mod doctest_utils; // For tests and doctests

// Re-export main types for convenience
pub use calibration::{CalibrationParams, CalibrationTable};
pub use config::ReaderOptions;
pub use decoder::{ChannelGroup, SignalGroupMode};
pub use error::{EdfError, Result};
pub use layout::{ChannelLayout, RecordLayout};
pub use reader::{EdfReader, SignalBlock};
pub use slice::{RawChannel, RawSlice};
pub use types::{FileHeader, FileType, RecordCount, SignalHeader};

// Important constants
pub const EDFLIB_TIME_DIMENSION: i64 = 10_000_000; // 100 nanoseconds unit
pub const EDFLIB_MAXSIGNALS: usize = 4096;
/// Size of the main header and of each per-signal header block.
pub const HEADER_BLOCK_SIZE: usize = 256;

/// Library version
///
/// ```rust
/// let version = edfslice::version();
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
