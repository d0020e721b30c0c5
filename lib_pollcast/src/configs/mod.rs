//! # Configuration Modules
//!
//! Layered runtime configuration for the PollCast servers: built-in defaults,
//! then an optional JSON file, then environment variables and CLI flags.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The relay's layered configuration.
pub mod feed_config;

pub use feed_config::{load_config, load_config_from, load_with, ConfigError, ConfigSource, FeedConfig, ResolvedConfig};
