//! Models for stored recurrence rules.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use ombruk_recurrence::RecurrenceRule;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::schema::recurrence_rule;

/// Row shape of `recurrence_rule`.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = recurrence_rule)]
#[diesel(check_for_backend(Pg))]
pub struct RecurrenceRuleRow {
    pub id: Uuid,
    pub interval: i32,
    pub count: Option<i32>,
    pub until: Option<NaiveDateTime>,
    /// Weekdays as numbers from Monday, 1 through 7.
    pub days: Vec<i16>,
    pub created_at: DateTime<Utc>,
}

/// Insert struct for `recurrence_rule`.
#[derive(Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = recurrence_rule)]
pub struct NewRecurrenceRuleRow {
    pub id: Uuid,
    pub interval: i32,
    pub count: Option<i32>,
    pub until: Option<NaiveDateTime>,
    pub days: Vec<i16>,
}

/// A rule together with the identity its series is tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRule {
    pub id: Uuid,
    pub rule: RecurrenceRule,
    pub created_at: DateTime<Utc>,
}
