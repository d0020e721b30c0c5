//! # Data Ingestors Module
//!
//! The ingestors are the "front door" for upstream data. PollCast has one:
//! a self-driving poll loop for REST sources that have no streaming interface.
//!
//! ## Contained Modules:
//! - **`poll_loop`**: Fixed-interval fetch → detect → cache → broadcast cycle,
//!   with skip-on-overlap ticks and per-outcome counters.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The fixed-interval polling ingestor.
pub mod poll_loop;

// --- Public API Re-exports ---
pub use poll_loop::{PollCounters, PollOutcome, PollState, PollStats, PollingIngestor};
