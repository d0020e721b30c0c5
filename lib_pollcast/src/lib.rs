//! # lib_pollcast
//!
//! The shared engine behind the PollCast servers. An upstream JSON document is
//! polled on a fixed interval, compared against the cached copy by its
//! `last_updated` marker, and every accepted change is pushed to all live
//! WebSocket clients. New clients get the cached document as soon as they
//! connect.
//!
//! Each folder is gated behind a cargo feature of the same name; `full`
//! enables all of them.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "core")]
pub mod core;
#[cfg(feature = "gateway")]
pub mod gateway;
#[cfg(feature = "ingestors")]
pub mod ingestors;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;
