//! Entry point tying expansion, materialization and range operations to a store.

use ombruk_core::config::SchedulingConfig;
use ombruk_db::db::store::{OccurrenceFilter, OccurrenceStore};
use ombruk_db::model::occurrence::{Occurrence, OccurrenceChanges, PickupPayload};
use ombruk_db::model::recurrence_rule::StoredRule;
use ombruk_recurrence::{Expansion, RecurrenceRule, RuleError};
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::schedule::materialize::{ScheduledSeries, materialize};
use crate::schedule::range::{self, DeletedSeries};
use crate::schedule::PickupTemplate;

/// ## Summary
/// Schedules pickup series against an injected store.
///
/// The store is the only shared state; the service itself holds just its
/// configuration and can be shared across tasks behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SchedulingService<S> {
    store: S,
    config: SchedulingConfig,
}

impl<S: OccurrenceStore> SchedulingService<S> {
    #[must_use]
    pub const fn new(store: S, config: SchedulingConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    /// ## Summary
    /// Validates `template` and `rule` and returns the series they describe
    /// without storing anything.
    ///
    /// ## Errors
    /// Returns `InvalidRule` or `InvalidTemplate` when validation fails.
    pub fn expand<'a>(
        &self,
        template: &'a PickupTemplate,
        rule: Option<&RecurrenceRule>,
    ) -> ServiceResult<Expansion<'a, PickupPayload>> {
        Ok(ombruk_recurrence::expand(template, rule)?)
    }

    /// ## Summary
    /// Expands and persists a series.
    ///
    /// ## Errors
    /// Returns `InvalidRule` (including a series larger than
    /// `scheduling.max_occurrences`), `InvalidTemplate`, or
    /// `PersistenceFailure`.
    pub async fn schedule_series(
        &self,
        template: &PickupTemplate,
        rule: Option<&RecurrenceRule>,
    ) -> ServiceResult<ScheduledSeries> {
        materialize(&self.store, self.config.max_occurrences, template, rule).await
    }

    /// ## Summary
    /// Deletes the occurrences matching `filter`, and the rule too when the
    /// filter names nothing but a rule id.
    ///
    /// ## Errors
    /// Returns `EmptyDeleteTarget` when nothing was removed, or
    /// `PersistenceFailure`.
    pub async fn delete_series(&self, filter: &OccurrenceFilter) -> ServiceResult<DeletedSeries> {
        range::delete(&self.store, filter).await
    }

    /// ## Summary
    /// Returns the stored occurrences matching `filter`, ordered by start.
    ///
    /// ## Errors
    /// Returns `PersistenceFailure` if the store fails.
    pub async fn find_occurrences(
        &self,
        filter: &OccurrenceFilter,
    ) -> ServiceResult<Vec<Occurrence>> {
        range::find(&self.store, filter).await
    }

    /// ## Errors
    /// Returns `NotFound` for an unknown id, or `PersistenceFailure`.
    #[tracing::instrument(skip(self))]
    pub async fn get_occurrence(&self, id: Uuid) -> ServiceResult<Occurrence> {
        self.store
            .get_occurrence(id)
            .await
            .map_err(ServiceError::persistence(format!("loading occurrence {id}")))?
            .ok_or_else(|| ServiceError::NotFound(format!("occurrence {id}")))
    }

    /// ## Errors
    /// Returns `PersistenceFailure` if the store fails.
    pub async fn occurrence_exists(&self, id: Uuid) -> ServiceResult<bool> {
        self.store
            .exists(id)
            .await
            .map_err(ServiceError::persistence(format!("checking occurrence {id}")))
    }

    /// ## Errors
    /// Returns `NotFound` for an unknown id, or `PersistenceFailure`.
    #[tracing::instrument(skip(self))]
    pub async fn get_rule(&self, id: Uuid) -> ServiceResult<StoredRule> {
        self.store
            .get_rule(id)
            .await
            .map_err(ServiceError::persistence(format!("loading rule {id}")))?
            .ok_or_else(|| ServiceError::NotFound(format!("recurrence rule {id}")))
    }

    /// ## Summary
    /// Edits a single occurrence. Other occurrences of its series and the
    /// rule are left as they are.
    ///
    /// ## Errors
    /// Returns `NotFound` for an unknown id, `InvalidTemplate` when the edit
    /// would make the occurrence end before it starts, or
    /// `PersistenceFailure`.
    #[tracing::instrument(skip(self, changes), fields(
        moves = changes.start_at.is_some() || changes.end_at.is_some(),
        has_note = changes.note.is_some(),
    ))]
    pub async fn update_occurrence(
        &self,
        id: Uuid,
        changes: &OccurrenceChanges,
    ) -> ServiceResult<Occurrence> {
        let current = self.get_occurrence(id).await?;
        if changes.is_empty() {
            return Ok(current);
        }

        let (start, end) = changes.resolved_span(&current);
        if end < start {
            return Err(RuleError::EndBeforeStart { start, end }.into());
        }

        let updated = self
            .store
            .update_occurrence(id, changes)
            .await
            .map_err(ServiceError::persistence(format!("updating occurrence {id}")))?
            .ok_or_else(|| ServiceError::NotFound(format!("occurrence {id}")))?;

        tracing::debug!("Occurrence updated");
        Ok(updated)
    }
}
