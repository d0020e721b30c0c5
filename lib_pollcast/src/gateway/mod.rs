//! # WebSocket Gateway
//!
//! The client-facing surface: an Axum router exposing `GET /ws` for live
//! `data_update` pushes and `GET /health` for liveness checks, wrapped in a
//! permissive CORS layer.
//!
//! ## Contained Modules:
//! - **`model`**: Wire frames (`ServerEvent`) and the health report body.
//! - **`downstream`**: Router construction, serving with graceful shutdown,
//!   and the per-connection session task.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Per-connection WebSocket sessions and the HTTP router.
pub mod downstream;
/// Server-to-client frames.
pub mod model;

pub use downstream::{build_router, serve, AppState};
pub use model::{HealthReport, ServerEvent, DATA_UPDATE};
