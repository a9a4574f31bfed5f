//! Persistence port for rules and occurrences.

use chrono::NaiveDateTime;
use futures::future::BoxFuture;
use ombruk_recurrence::RecurrenceRule;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DbResult;
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceChanges};
use crate::model::recurrence_rule::StoredRule;

pub type StoreFuture<'a, T> = BoxFuture<'a, DbResult<T>>;

/// ## Summary
/// Storage operations the scheduling service depends on.
///
/// Implementations must make `insert_batch`, `insert_series` and
/// `delete_series` atomic: either every change is applied or none is.
pub trait OccurrenceStore: Send + Sync {
    /// Stores a rule under a freshly generated id.
    fn insert_rule<'a>(&'a self, rule: &'a RecurrenceRule) -> StoreFuture<'a, StoredRule>;

    /// Stores all rows or none of them.
    fn insert_batch(&self, rows: Vec<NewOccurrence>) -> StoreFuture<'_, Vec<Occurrence>>;

    /// Stores an optional rule and its occurrences as one unit.
    ///
    /// When `rule` is set every row is tagged with the new rule id.
    fn insert_series<'a>(
        &'a self,
        rule: Option<&'a RecurrenceRule>,
        rows: Vec<NewOccurrence>,
    ) -> StoreFuture<'a, StoredSeries>;

    /// Deletes every occurrence of a rule and the rule itself as one unit.
    fn delete_series(&self, rule_id: Uuid) -> StoreFuture<'_, RemovedSeries>;

    /// Occurrences matching every set filter, ordered by start.
    fn select_occurrences<'a>(
        &'a self,
        filter: &'a OccurrenceFilter,
    ) -> StoreFuture<'a, Vec<Occurrence>>;

    /// Deletes the matching occurrences and returns them.
    fn delete_occurrences<'a>(
        &'a self,
        filter: &'a OccurrenceFilter,
    ) -> StoreFuture<'a, Vec<Occurrence>>;

    /// Deletes a rule together with any occurrences still tagged with it.
    /// Returns `false` when no such rule exists.
    fn delete_rule(&self, id: Uuid) -> StoreFuture<'_, bool>;

    fn exists(&self, id: Uuid) -> StoreFuture<'_, bool>;

    fn get_rule(&self, id: Uuid) -> StoreFuture<'_, Option<StoredRule>>;

    fn get_occurrence(&self, id: Uuid) -> StoreFuture<'_, Option<Occurrence>>;

    /// Applies `changes` to one occurrence. Returns `None` when it does not exist.
    fn update_occurrence<'a>(
        &'a self,
        id: Uuid,
        changes: &'a OccurrenceChanges,
    ) -> StoreFuture<'a, Option<Occurrence>>;
}

/// Rule and occurrences written by `insert_series`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSeries {
    pub rule: Option<StoredRule>,
    pub occurrences: Vec<Occurrence>,
}

/// Rows removed by `delete_series`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedSeries {
    pub occurrences: Vec<Occurrence>,
    /// `false` when the rule did not exist.
    pub rule_removed: bool,
}

/// ## Summary
/// Conjunction of optional constraints on stored occurrences.
///
/// `from` and `to` bound the occurrence start and are both inclusive. An
/// empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceFilter {
    pub rule_id: Option<Uuid>,
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub location_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
}

impl OccurrenceFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_rule(rule_id: Uuid) -> Self {
        Self {
            rule_id: Some(rule_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn starting_from(mut self, from: NaiveDateTime) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub const fn starting_until(mut self, to: NaiveDateTime) -> Self {
        self.to = Some(to);
        self
    }

    #[must_use]
    pub const fn at_location(mut self, location_id: Uuid) -> Self {
        self.location_id = Some(location_id);
        self
    }

    #[must_use]
    pub const fn by_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    #[must_use]
    pub const fn is_unconstrained(&self) -> bool {
        self.rule_id.is_none()
            && self.from.is_none()
            && self.to.is_none()
            && self.location_id.is_none()
            && self.actor_id.is_none()
    }

    /// ## Summary
    /// The rule id when it is the only constraint.
    ///
    /// Such a filter addresses a whole series, so deleting with it removes
    /// the rule as well.
    #[must_use]
    pub const fn unscoped_rule(&self) -> Option<Uuid> {
        match self {
            Self {
                rule_id: Some(rule_id),
                from: None,
                to: None,
                location_id: None,
                actor_id: None,
            } => Some(*rule_id),
            _ => None,
        }
    }

    /// Evaluates the filter against an already loaded occurrence.
    #[must_use]
    pub fn matches(&self, occurrence: &Occurrence) -> bool {
        self.rule_id
            .is_none_or(|id| occurrence.recurrence_rule_id == Some(id))
            && self.from.is_none_or(|from| occurrence.start_at >= from)
            && self.to.is_none_or(|to| occurrence.start_at <= to)
            && self
                .location_id
                .is_none_or(|id| occurrence.location_id == id)
            && self.actor_id.is_none_or(|id| occurrence.actor_id == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 7, day)
            .and_then(|d| d.and_hms_opt(15, 0, 0))
            .expect("valid fixture date")
    }

    fn occurrence(day: u32, rule_id: Option<Uuid>) -> Occurrence {
        let now = Utc::now();
        Occurrence {
            id: Uuid::now_v7(),
            start_at: at(day),
            end_at: at(day),
            location_id: Uuid::nil(),
            actor_id: None,
            note: None,
            recurrence_rule_id: rule_id,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = OccurrenceFilter::new();

        assert!(filter.is_unconstrained());
        assert_eq!(filter.unscoped_rule(), None);
        assert!(filter.matches(&occurrence(13, None)));
    }

    #[test]
    fn test_rule_only_filter_is_unscoped() {
        let rule_id = Uuid::now_v7();

        assert_eq!(
            OccurrenceFilter::for_rule(rule_id).unscoped_rule(),
            Some(rule_id)
        );
        assert_eq!(
            OccurrenceFilter::for_rule(rule_id).starting_from(at(13)).unscoped_rule(),
            None
        );
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let filter = OccurrenceFilter::new().starting_from(at(14)).starting_until(at(16));

        assert!(!filter.matches(&occurrence(13, None)));
        assert!(filter.matches(&occurrence(14, None)));
        assert!(filter.matches(&occurrence(16, None)));
        assert!(!filter.matches(&occurrence(17, None)));
    }

    #[test]
    fn test_rule_filter_excludes_one_off_occurrences() {
        let rule_id = Uuid::now_v7();
        let filter = OccurrenceFilter::for_rule(rule_id);

        assert!(filter.matches(&occurrence(13, Some(rule_id))));
        assert!(!filter.matches(&occurrence(13, None)));
        assert!(!filter.matches(&occurrence(13, Some(Uuid::now_v7()))));
    }

    #[test]
    fn test_actor_filter_requires_assigned_actor() {
        let actor = Uuid::now_v7();
        let mut assigned = occurrence(13, None);
        assigned.actor_id = Some(actor);

        let filter = OccurrenceFilter::new().by_actor(actor);
        assert!(filter.matches(&assigned));
        assert!(!filter.matches(&occurrence(13, None)));
    }
}
