//! # Logging Setup
//!
//! fern-based process logging: one formatted stream to stdout and one to a
//! timestamped file under the configured log directory. Only the newest file
//! per application is kept between runs.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Logger installation and log file housekeeping.
pub mod logger;

pub use logger::{parse_level, setup_logging};
