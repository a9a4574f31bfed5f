//! Persistence for recurrence rules and their materialized occurrences.
//!
//! [`db::store::OccurrenceStore`] is the port the scheduling service talks to.
//! [`db::pg_store::PgStore`] implements it on `PostgreSQL` through
//! `diesel-async`; [`db::memory::MemoryStore`] keeps everything in process for
//! tests and tooling.

pub mod db;
pub mod error;
pub mod model;
