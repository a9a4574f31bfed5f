use chrono::Weekday;
use ombruk_recurrence::{DaySet, RecurrenceRule};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::model::recurrence_rule::{NewRecurrenceRuleRow, RecurrenceRuleRow, StoredRule};

fn weekday_to_db(day: Weekday) -> i16 {
    // number_from_monday is always within 1..=7
    i16::try_from(day.number_from_monday()).unwrap_or_default()
}

fn weekday_from_db(value: i16) -> DbResult<Weekday> {
    u8::try_from(value)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|n| Weekday::try_from(n).ok())
        .ok_or_else(|| DbError::InvalidRow(format!("weekday out of range: {value}")))
}

fn to_db_int(value: u32, field: &str) -> DbResult<i32> {
    i32::try_from(value).map_err(|_err| DbError::InvalidRow(format!("{field} too large: {value}")))
}

fn from_db_int(value: i32, field: &str) -> DbResult<u32> {
    u32::try_from(value).map_err(|_err| DbError::InvalidRow(format!("negative {field}: {value}")))
}

/// ## Summary
/// Builds the insert row for a rule under the given id.
///
/// ## Errors
/// Returns `DbError::InvalidRow` if `interval` or `count` exceed the column range.
pub fn new_rule_row(id: Uuid, rule: &RecurrenceRule) -> DbResult<NewRecurrenceRuleRow> {
    Ok(NewRecurrenceRuleRow {
        id,
        interval: to_db_int(rule.interval, "interval")?,
        count: rule
            .count
            .map(|count| to_db_int(count, "count"))
            .transpose()?,
        until: rule.until,
        days: rule.days.iter().map(weekday_to_db).collect(),
    })
}

impl TryFrom<RecurrenceRuleRow> for StoredRule {
    type Error = DbError;

    fn try_from(row: RecurrenceRuleRow) -> DbResult<Self> {
        let days = row
            .days
            .iter()
            .map(|value| weekday_from_db(*value))
            .collect::<DbResult<DaySet>>()?;

        Ok(Self {
            id: row.id,
            rule: RecurrenceRule {
                interval: from_db_int(row.interval, "interval")?,
                count: row
                    .count
                    .map(|count| from_db_int(count, "count"))
                    .transpose()?,
                until: row.until,
                days,
            },
            created_at: row.created_at,
        })
    }
}
