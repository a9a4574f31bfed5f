#![allow(clippy::expect_used)]
//! Fixture builders for scenario tests.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use ombruk_core::config::SchedulingConfig;
use ombruk_db::db::memory::MemoryStore;
use ombruk_db::model::occurrence::PickupPayload;
use ombruk_service::schedule::{PickupTemplate, SchedulingService};
use uuid::Uuid;

/// Builds a timestamp, panicking on an invalid fixture date.
#[must_use]
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid fixture date")
}

/// Monday 2020-07-13 15:00, the anchor used by most scenarios.
#[must_use]
pub fn monday_anchor() -> NaiveDateTime {
    at(2020, 7, 13, 15)
}

/// Sunday 2020-07-12 15:00.
#[must_use]
pub fn sunday_anchor() -> NaiveDateTime {
    at(2020, 7, 12, 15)
}

/// A one-hour pickup at a fresh location starting at `start`.
#[must_use]
pub fn pickup(start: NaiveDateTime) -> PickupTemplate {
    PickupTemplate::new(
        start,
        start + TimeDelta::hours(1),
        PickupPayload {
            location_id: Uuid::now_v7(),
            actor_id: None,
            note: None,
        },
    )
}

/// A pickup assigned to `actor_id`.
#[must_use]
pub fn assigned_pickup(start: NaiveDateTime, actor_id: Uuid) -> PickupTemplate {
    let mut template = pickup(start);
    template.payload.actor_id = Some(actor_id);
    template
}

/// A service over an empty in-memory store with default limits.
#[must_use]
pub fn memory_service() -> SchedulingService<MemoryStore> {
    SchedulingService::new(MemoryStore::new(), SchedulingConfig::default())
}
