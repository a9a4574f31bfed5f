//! Models for materialized pickup occurrences.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use ombruk_recurrence::GeneratedOccurrence;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schema::occurrence;

/// Fields copied from a template into every occurrence of its series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupPayload {
    /// Reuse station the pickup happens at.
    pub location_id: Uuid,
    /// Partner collecting, if assigned.
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
}

/// A persisted occurrence.
#[derive(
    Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize, Deserialize,
)]
#[diesel(table_name = occurrence)]
#[diesel(check_for_backend(Pg))]
pub struct Occurrence {
    /// UUID v7 primary key.
    pub id: Uuid,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub location_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    /// Owning rule; `None` for a one-off occurrence.
    pub recurrence_rule_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New occurrence for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = occurrence)]
pub struct NewOccurrence {
    pub id: Uuid,
    pub start_at: NaiveDateTime,
    pub end_at: NaiveDateTime,
    pub location_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub recurrence_rule_id: Option<Uuid>,
}

impl NewOccurrence {
    /// ## Summary
    /// Builds an insert row from one expanded occurrence, assigning a fresh id.
    #[must_use]
    pub fn from_generated(
        generated: GeneratedOccurrence<PickupPayload>,
        recurrence_rule_id: Option<Uuid>,
    ) -> Self {
        let GeneratedOccurrence {
            start,
            end,
            payload,
        } = generated;

        Self {
            id: Uuid::now_v7(),
            start_at: start,
            end_at: end,
            location_id: payload.location_id,
            actor_id: payload.actor_id,
            note: payload.note,
            recurrence_rule_id,
        }
    }
}

/// Caller-facing edit of a single occurrence. Unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceChanges {
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
    pub note: Option<String>,
}

impl OccurrenceChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start_at.is_none() && self.end_at.is_none() && self.note.is_none()
    }

    /// Start and end the occurrence would have after applying these changes.
    #[must_use]
    pub fn resolved_span(&self, current: &Occurrence) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.start_at.unwrap_or(current.start_at),
            self.end_at.unwrap_or(current.end_at),
        )
    }
}

/// Update set for `occurrence`; `None` columns are left untouched.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = occurrence)]
pub struct OccurrenceChangeset<'a> {
    pub start_at: Option<NaiveDateTime>,
    pub end_at: Option<NaiveDateTime>,
    pub note: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> OccurrenceChangeset<'a> {
    #[must_use]
    pub fn new(changes: &'a OccurrenceChanges, updated_at: DateTime<Utc>) -> Self {
        Self {
            start_at: changes.start_at,
            end_at: changes.end_at,
            note: changes.note.as_deref(),
            updated_at,
        }
    }
}
