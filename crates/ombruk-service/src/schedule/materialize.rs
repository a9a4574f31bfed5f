//! Turns an expanded series into stored occurrences.

use ombruk_db::db::store::{OccurrenceStore, StoredSeries};
use ombruk_db::model::occurrence::{NewOccurrence, Occurrence};
use ombruk_db::model::recurrence_rule::StoredRule;
use ombruk_recurrence::{RecurrenceRule, expand};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::schedule::PickupTemplate;

/// Outcome of scheduling a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledSeries {
    /// Stored rule; `None` for a one-off pickup.
    pub rule: Option<StoredRule>,
    /// Stored occurrences in generation order.
    pub occurrences: Vec<Occurrence>,
}

impl ScheduledSeries {
    #[must_use]
    pub fn rule_id(&self) -> Option<Uuid> {
        self.rule.as_ref().map(|rule| rule.id)
    }
}

/// ## Summary
/// Expands `template` with `rule` and persists the series.
///
/// The rule and its occurrences are written as one unit, so a failure
/// leaves neither behind.
///
/// ## Side Effects
/// - Inserts one `recurrence_rule` row when `rule` is set
/// - Inserts one `occurrence` row per generated occurrence
///
/// ## Errors
/// Returns `InvalidRule` or `InvalidTemplate` before touching the store when
/// validation fails or the series exceeds `limit`, and `PersistenceFailure`
/// when the store rejects the series.
#[tracing::instrument(skip(store, template, rule), fields(
    start = %template.start,
    location_id = %template.payload.location_id,
    recurring = rule.is_some(),
))]
pub async fn materialize<S>(
    store: &S,
    limit: usize,
    template: &PickupTemplate,
    rule: Option<&RecurrenceRule>,
) -> ServiceResult<ScheduledSeries>
where
    S: OccurrenceStore + ?Sized,
{
    let generated = expand(template, rule)?.collect_within(limit)?;
    tracing::debug!(count = generated.len(), "Series expanded");

    let rows: Vec<NewOccurrence> = generated
        .into_iter()
        .map(|occurrence| NewOccurrence::from_generated(occurrence, None))
        .collect();

    let StoredSeries { rule, occurrences } = store
        .insert_series(rule, rows)
        .await
        .map_err(ServiceError::persistence(format!(
            "storing series for template starting {}",
            template.start
        )))?;

    tracing::info!(
        rule_id = ?rule.as_ref().map(|stored| stored.id),
        count = occurrences.len(),
        "Series scheduled"
    );
    Ok(ScheduledSeries { rule, occurrences })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, Weekday};
    use ombruk_db::db::memory::MemoryStore;
    use ombruk_db::db::store::OccurrenceFilter;
    use ombruk_db::model::occurrence::PickupPayload;
    use ombruk_recurrence::{DaySet, RuleError};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 7, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid fixture date")
    }

    fn template() -> PickupTemplate {
        PickupTemplate::new(
            at(13, 15),
            at(13, 16),
            PickupPayload {
                location_id: Uuid::now_v7(),
                actor_id: None,
                note: Some("back entrance".to_string()),
            },
        )
    }

    #[test_log::test(tokio::test)]
    async fn test_one_off_has_no_rule() {
        let store = MemoryStore::new();

        let series = materialize(&store, 100, &template(), None)
            .await
            .expect("scheduling succeeds");

        assert_eq!(series.rule_id(), None);
        assert_eq!(series.occurrences.len(), 1);
        assert_eq!(series.occurrences[0].start_at, at(13, 15));
        assert_eq!(store.rule_count().await, 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_every_occurrence_is_tagged_with_rule() {
        let store = MemoryStore::new();
        let rule = RecurrenceRule::weekly(2).with_days(
            DaySet::new().with(Weekday::Mon).with(Weekday::Wed),
        );

        let series = materialize(&store, 100, &template(), Some(&rule))
            .await
            .expect("scheduling succeeds");

        let rule_id = series.rule_id().expect("recurring series has a rule");
        assert_eq!(series.occurrences.len(), 4);
        assert!(
            series
                .occurrences
                .iter()
                .all(|o| o.recurrence_rule_id == Some(rule_id))
        );
        assert!(
            series
                .occurrences
                .iter()
                .all(|o| o.note.as_deref() == Some("back entrance"))
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_batch_leaves_no_orphan_rule() {
        let store = MemoryStore::new();
        store.fail_next_batch();

        let result = materialize(&store, 100, &template(), Some(&RecurrenceRule::weekly(3))).await;

        assert!(matches!(
            result,
            Err(ServiceError::PersistenceFailure { .. })
        ));
        assert_eq!(store.rule_count().await, 0);
        assert_eq!(store.occurrence_count().await, 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_batch_needs_no_rule_cleanup() {
        let store = MemoryStore::new();
        store.fail_next_batch();
        store.fail_next_delete();

        let result = materialize(&store, 100, &template(), Some(&RecurrenceRule::weekly(3))).await;

        assert!(matches!(
            result,
            Err(ServiceError::PersistenceFailure { .. })
        ));
        assert_eq!(store.rule_count().await, 0);
        assert_eq!(store.occurrence_count().await, 0);

        let series = materialize(&store, 100, &template(), Some(&RecurrenceRule::weekly(3)))
            .await
            .expect("store recovers after the failed batch");
        assert_eq!(series.occurrences.len(), 3);
        assert_eq!(store.rule_count().await, 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_rule_touches_nothing() {
        let store = MemoryStore::new();

        let result = materialize(&store, 100, &template(), Some(&RecurrenceRule::weekly(0))).await;

        assert!(matches!(
            result,
            Err(ServiceError::InvalidRule(RuleError::ZeroCount))
        ));
        assert_eq!(store.rule_count().await, 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_series_over_limit_is_rejected() {
        let store = MemoryStore::new();
        let rule = RecurrenceRule::weekly(10).with_days(DaySet::all());

        let result = materialize(&store, 69, &template(), Some(&rule)).await;

        assert!(matches!(
            result,
            Err(ServiceError::InvalidRule(RuleError::TooManyOccurrences { limit: 69 }))
        ));
        assert!(
            store
                .select_occurrences(&OccurrenceFilter::new())
                .await
                .expect("select succeeds")
                .is_empty()
        );
    }
}
