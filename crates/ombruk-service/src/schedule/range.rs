//! Range selection and deletion over stored occurrences.

use ombruk_db::db::store::{OccurrenceFilter, OccurrenceStore};
use ombruk_db::model::occurrence::Occurrence;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// Outcome of a range delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedSeries {
    /// Occurrences that were removed.
    pub occurrences: Vec<Occurrence>,
    /// Id of the rule removed along with them, for unscoped series deletes.
    pub rule_removed: Option<Uuid>,
}

/// ## Summary
/// Loads the occurrences matching `filter`, ordered by start.
///
/// ## Errors
/// Returns `PersistenceFailure` if the store query fails.
#[tracing::instrument(skip(store))]
pub async fn find<S>(store: &S, filter: &OccurrenceFilter) -> ServiceResult<Vec<Occurrence>>
where
    S: OccurrenceStore + ?Sized,
{
    let found = store
        .select_occurrences(filter)
        .await
        .map_err(ServiceError::persistence("selecting occurrences"))?;

    tracing::debug!(count = found.len(), "Occurrences selected");
    Ok(found)
}

/// ## Summary
/// Deletes the occurrences matching `filter`.
///
/// A filter holding only a rule id addresses the whole series, and the rule
/// is deleted with its occurrences in one unit. Any other constraint makes
/// the delete scoped: matching occurrences go, the rule stays even if none
/// of its occurrences remain.
///
/// ## Errors
/// Returns `EmptyDeleteTarget` when neither an occurrence nor a rule was
/// removed, and `PersistenceFailure` if the store fails.
#[tracing::instrument(skip(store))]
pub async fn delete<S>(store: &S, filter: &OccurrenceFilter) -> ServiceResult<DeletedSeries>
where
    S: OccurrenceStore + ?Sized,
{
    if filter.is_unconstrained() {
        tracing::warn!("Deleting every stored occurrence");
    }

    let (occurrences, rule_removed) = match filter.unscoped_rule() {
        Some(rule_id) => {
            let removed = store
                .delete_series(rule_id)
                .await
                .map_err(ServiceError::persistence(format!("deleting series of rule {rule_id}")))?;
            (removed.occurrences, removed.rule_removed.then_some(rule_id))
        }
        None => {
            let occurrences = store
                .delete_occurrences(filter)
                .await
                .map_err(ServiceError::persistence("deleting occurrences"))?;
            (occurrences, None)
        }
    };

    if occurrences.is_empty() && rule_removed.is_none() {
        tracing::debug!("Delete matched nothing");
        return Err(ServiceError::EmptyDeleteTarget(filter.clone()));
    }

    tracing::info!(
        deleted = occurrences.len(),
        rule_removed = ?rule_removed,
        "Occurrences deleted"
    );
    Ok(DeletedSeries {
        occurrences,
        rule_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use ombruk_db::db::memory::MemoryStore;
    use ombruk_db::model::occurrence::PickupPayload;
    use ombruk_recurrence::RecurrenceRule;

    use crate::schedule::PickupTemplate;
    use crate::schedule::materialize::materialize;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 7, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid fixture date")
    }

    async fn seeded(store: &MemoryStore, weeks: u32) -> Uuid {
        let template = PickupTemplate::new(
            at(13, 15),
            at(13, 16),
            PickupPayload {
                location_id: Uuid::now_v7(),
                actor_id: None,
                note: None,
            },
        );
        materialize(store, 100, &template, Some(&RecurrenceRule::weekly(weeks)))
            .await
            .expect("scheduling succeeds")
            .rule_id()
            .expect("recurring series has a rule")
    }

    #[test_log::test(tokio::test)]
    async fn test_unscoped_delete_removes_series_and_rule() {
        let store = MemoryStore::new();
        let rule_id = seeded(&store, 3).await;

        let deleted = delete(&store, &OccurrenceFilter::for_rule(rule_id))
            .await
            .expect("delete succeeds");

        assert_eq!(deleted.occurrences.len(), 3);
        assert_eq!(deleted.rule_removed, Some(rule_id));
        assert_eq!(store.occurrence_count().await, 0);
        assert_eq!(store.rule_count().await, 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_series_delete_keeps_occurrences_and_rule() {
        let store = MemoryStore::new();
        let rule_id = seeded(&store, 3).await;
        store.fail_next_delete();

        let result = delete(&store, &OccurrenceFilter::for_rule(rule_id)).await;

        assert!(matches!(
            result,
            Err(ServiceError::PersistenceFailure { .. })
        ));
        assert_eq!(store.occurrence_count().await, 3);
        assert_eq!(store.rule_count().await, 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_scoped_delete_keeps_rule() {
        let store = MemoryStore::new();
        let rule_id = seeded(&store, 3).await;

        let filter = OccurrenceFilter::for_rule(rule_id).starting_from(at(20, 0));
        let deleted = delete(&store, &filter).await.expect("delete succeeds");

        assert_eq!(deleted.occurrences.len(), 2);
        assert_eq!(deleted.rule_removed, None);
        assert_eq!(store.rule_count().await, 1);

        let remaining = find(&store, &OccurrenceFilter::for_rule(rule_id))
            .await
            .expect("select succeeds");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].start_at, at(13, 15));
    }

    #[test_log::test(tokio::test)]
    async fn test_scoped_delete_of_every_occurrence_keeps_rule() {
        let store = MemoryStore::new();
        let rule_id = seeded(&store, 2).await;

        let filter = OccurrenceFilter::for_rule(rule_id)
            .starting_from(at(1, 0))
            .starting_until(at(31, 0));
        delete(&store, &filter).await.expect("delete succeeds");

        assert_eq!(store.occurrence_count().await, 0);
        assert_eq!(store.rule_count().await, 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_rule_with_no_occurrences_left_is_still_removed() {
        let store = MemoryStore::new();
        let rule_id = seeded(&store, 1).await;
        delete(&store, &OccurrenceFilter::for_rule(rule_id).starting_from(at(13, 0)))
            .await
            .expect("scoped delete succeeds");

        let deleted = delete(&store, &OccurrenceFilter::for_rule(rule_id))
            .await
            .expect("rule delete succeeds");

        assert!(deleted.occurrences.is_empty());
        assert_eq!(deleted.rule_removed, Some(rule_id));
    }

    #[test_log::test(tokio::test)]
    async fn test_delete_matching_nothing_is_an_error() {
        let store = MemoryStore::new();
        seeded(&store, 2).await;

        let filter = OccurrenceFilter::new().starting_from(at(28, 0));
        let result = delete(&store, &filter).await;

        assert!(matches!(result, Err(ServiceError::EmptyDeleteTarget(f)) if f == filter));
        assert_eq!(store.occurrence_count().await, 2);
    }
}
