//! Closed-model HTTP load runner.
//!
//! A fixed pool of virtual users hammers one GET endpoint for a fixed
//! duration, gated by a shared requests-per-second cap, and every response
//! is checked against an expected status code. The binary exposes this as a
//! one-shot `run` command and as a WebSocket worker (`serve`) that accepts
//! run configurations from a controller.
pub mod client;
pub mod error;
pub mod executor;
pub mod models;
pub mod report;
pub mod utils;
pub mod ws;

pub use error::LoadError;
pub use executor::{run_load_test, run_load_test_until};
pub use models::dsl_model::RunConfig;
pub use models::metrics::Metrics;
