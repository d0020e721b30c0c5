//! # Data Retrieval Module
//!
//! Fetches the upstream document. The poll loop only depends on the `Fetcher`
//! trait, so tests can drive it with scripted results while the servers use
//! the real HTTP implementation.
//!
//! ## Contained Modules:
//!
//! - **`fetcher`**: The `Fetcher` trait and the `FetchError` taxonomy.
//! - **`http_fetcher`**: A single-shot `reqwest` GET with a bounded timeout.
//!   It never retries; the poll interval is the retry cadence.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// The fetch contract and its error type.
pub mod fetcher;
/// `reqwest`-based fetcher for the upstream HTTP endpoint.
pub mod http_fetcher;

pub use fetcher::{FetchError, Fetcher};
pub use http_fetcher::HttpFetcher;
