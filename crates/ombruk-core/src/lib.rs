//! Shared building blocks for the reuse-station scheduling workspace.
//!
//! Holds the crate-independent error type, the layered configuration loader
//! and the tracing bootstrap used by binaries and tests.

pub mod config;
pub mod error;
pub mod logging;
