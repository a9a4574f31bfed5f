//! Scheduling of recurring reuse-station pickups.
//!
//! [`schedule::SchedulingService`] expands a template occurrence with its
//! recurrence rule, persists the resulting series through an
//! [`ombruk_db::db::store::OccurrenceStore`], and answers range queries and
//! deletes over what has been stored.

pub mod error;
pub mod schedule;
