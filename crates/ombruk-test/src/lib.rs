//! Ombruk scheduling - cross-crate test support.
//!
//! Re-exports the workspace crates and provides fixtures shared by the
//! scenario tests under `tests/`.

pub use ombruk_core as core;
pub use ombruk_db as db;
pub use ombruk_recurrence as recurrence;
pub use ombruk_service as service;

pub mod fixtures;
