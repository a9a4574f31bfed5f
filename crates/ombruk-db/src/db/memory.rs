//! In-process occurrence store.
//!
//! Mirrors the `PostgreSQL` schema closely enough for the service layer to
//! be exercised without a database: foreign keys are checked, rule deletes
//! cascade, and `end_at >= start_at` is enforced.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use ombruk_recurrence::RecurrenceRule;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use crate::db::store::{
    OccurrenceFilter, OccurrenceStore, RemovedSeries, StoreFuture, StoredSeries,
};
use crate::error::{DbError, DbResult};
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceChanges};
use crate::model::recurrence_rule::StoredRule;

#[derive(Debug, Default)]
struct State {
    rules: HashMap<Uuid, StoredRule>,
    /// Keyed by id; UUID v7 keeps this in insertion order.
    occurrences: BTreeMap<Uuid, Occurrence>,
}

impl State {
    /// Rejects the whole batch if any row breaks a constraint.
    ///
    /// `pending_rule` is a rule written in the same unit, not yet in `rules`.
    fn check_rows(&self, rows: &[NewOccurrence], pending_rule: Option<Uuid>) -> DbResult<()> {
        let mut seen = HashSet::with_capacity(rows.len());

        for row in rows {
            check_span(row)?;
            if self.occurrences.contains_key(&row.id) || !seen.insert(row.id) {
                return Err(constraint_violation(
                    DatabaseErrorKind::UniqueViolation,
                    format!("duplicate occurrence id {}", row.id),
                ));
            }
            if let Some(rule_id) = row.recurrence_rule_id
                && pending_rule != Some(rule_id)
                && !self.rules.contains_key(&rule_id)
            {
                return Err(constraint_violation(
                    DatabaseErrorKind::ForeignKeyViolation,
                    format!("unknown recurrence rule {rule_id}"),
                ));
            }
        }
        Ok(())
    }

    fn store_rows(&mut self, rows: Vec<NewOccurrence>) -> Vec<Occurrence> {
        let now = Utc::now();
        rows.into_iter()
            .map(|row| {
                let occurrence = Occurrence {
                    id: row.id,
                    start_at: row.start_at,
                    end_at: row.end_at,
                    location_id: row.location_id,
                    actor_id: row.actor_id,
                    note: row.note,
                    recurrence_rule_id: row.recurrence_rule_id,
                    created_at: now,
                    updated_at: now,
                };
                self.occurrences.insert(occurrence.id, occurrence.clone());
                occurrence
            })
            .collect()
    }

    fn remove_matching(&mut self, filter: &OccurrenceFilter) -> Vec<Occurrence> {
        let ids: Vec<Uuid> = self
            .occurrences
            .values()
            .filter(|occurrence| filter.matches(occurrence))
            .map(|occurrence| occurrence.id)
            .collect();

        ids.iter()
            .filter_map(|id| self.occurrences.remove(id))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_next_batch: AtomicBool,
    fail_next_delete: AtomicBool,
}

fn constraint_violation(kind: DatabaseErrorKind, message: String) -> DbError {
    DbError::DatabaseError(DieselError::DatabaseError(kind, Box::new(message)))
}

fn check_span(row: &NewOccurrence) -> DbResult<()> {
    if row.end_at < row.start_at {
        return Err(constraint_violation(
            DatabaseErrorKind::CheckViolation,
            format!("occurrence {} ends before it starts", row.id),
        ));
    }
    Ok(())
}

fn injected(flag: &AtomicBool, operation: &str) -> DbResult<()> {
    if flag.swap(false, Ordering::SeqCst) {
        tracing::debug!(operation, "Injected store failure");
        return Err(DbError::DatabaseError(DieselError::RollbackTransaction));
    }
    Ok(())
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `insert_batch` or `insert_series` fail without storing
    /// anything.
    pub fn fail_next_batch(&self) {
        self.fail_next_batch.store(true, Ordering::SeqCst);
    }

    /// Makes the next `delete_rule` or `delete_series` fail without removing
    /// anything.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    pub async fn rule_count(&self) -> usize {
        self.state.read().await.rules.len()
    }

    pub async fn occurrence_count(&self) -> usize {
        self.state.read().await.occurrences.len()
    }
}

impl OccurrenceStore for MemoryStore {
    fn insert_rule<'a>(&'a self, rule: &'a RecurrenceRule) -> StoreFuture<'a, StoredRule> {
        Box::pin(async move {
            let stored = StoredRule {
                id: Uuid::now_v7(),
                rule: rule.clone(),
                created_at: Utc::now(),
            };
            self.state
                .write()
                .await
                .rules
                .insert(stored.id, stored.clone());
            Ok(stored)
        })
    }

    #[tracing::instrument(skip(self, rows), fields(row_count = rows.len()))]
    fn insert_batch(&self, rows: Vec<NewOccurrence>) -> StoreFuture<'_, Vec<Occurrence>> {
        Box::pin(
            async move {
                injected(&self.fail_next_batch, "insert_batch")?;

                let mut state = self.state.write().await;
                state.check_rows(&rows, None)?;
                Ok(state.store_rows(rows))
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self, rule, rows), fields(
        recurring = rule.is_some(),
        row_count = rows.len(),
    ))]
    fn insert_series<'a>(
        &'a self,
        rule: Option<&'a RecurrenceRule>,
        mut rows: Vec<NewOccurrence>,
    ) -> StoreFuture<'a, StoredSeries> {
        Box::pin(
            async move {
                injected(&self.fail_next_batch, "insert_series")?;

                let stored_rule = rule.map(|rule| StoredRule {
                    id: Uuid::now_v7(),
                    rule: rule.clone(),
                    created_at: Utc::now(),
                });
                let rule_id = stored_rule.as_ref().map(|stored| stored.id);
                if rule_id.is_some() {
                    for row in &mut rows {
                        row.recurrence_rule_id = rule_id;
                    }
                }

                let mut state = self.state.write().await;
                state.check_rows(&rows, rule_id)?;
                if let Some(stored) = &stored_rule {
                    state.rules.insert(stored.id, stored.clone());
                }
                let occurrences = state.store_rows(rows);

                Ok(StoredSeries {
                    rule: stored_rule,
                    occurrences,
                })
            }
            .instrument(tracing::Span::current()),
        )
    }

    fn select_occurrences<'a>(
        &'a self,
        filter: &'a OccurrenceFilter,
    ) -> StoreFuture<'a, Vec<Occurrence>> {
        Box::pin(async move {
            let state = self.state.read().await;
            let mut matching: Vec<Occurrence> = state
                .occurrences
                .values()
                .filter(|occurrence| filter.matches(occurrence))
                .cloned()
                .collect();
            matching.sort_by_key(|occurrence| (occurrence.start_at, occurrence.id));
            Ok(matching)
        })
    }

    fn delete_occurrences<'a>(
        &'a self,
        filter: &'a OccurrenceFilter,
    ) -> StoreFuture<'a, Vec<Occurrence>> {
        Box::pin(async move { Ok(self.state.write().await.remove_matching(filter)) })
    }

    fn delete_rule(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            injected(&self.fail_next_delete, "delete_rule")?;

            let mut state = self.state.write().await;
            if state.rules.remove(&id).is_none() {
                return Ok(false);
            }
            state
                .occurrences
                .retain(|_, occurrence| occurrence.recurrence_rule_id != Some(id));
            Ok(true)
        })
    }

    fn delete_series(&self, rule_id: Uuid) -> StoreFuture<'_, RemovedSeries> {
        Box::pin(async move {
            injected(&self.fail_next_delete, "delete_series")?;

            let mut state = self.state.write().await;
            let occurrences = state.remove_matching(&OccurrenceFilter::for_rule(rule_id));
            let rule_removed = state.rules.remove(&rule_id).is_some();
            Ok(RemovedSeries {
                occurrences,
                rule_removed,
            })
        })
    }

    fn exists(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move { Ok(self.state.read().await.occurrences.contains_key(&id)) })
    }

    fn get_rule(&self, id: Uuid) -> StoreFuture<'_, Option<StoredRule>> {
        Box::pin(async move { Ok(self.state.read().await.rules.get(&id).cloned()) })
    }

    fn get_occurrence(&self, id: Uuid) -> StoreFuture<'_, Option<Occurrence>> {
        Box::pin(async move { Ok(self.state.read().await.occurrences.get(&id).cloned()) })
    }

    fn update_occurrence<'a>(
        &'a self,
        id: Uuid,
        changes: &'a OccurrenceChanges,
    ) -> StoreFuture<'a, Option<Occurrence>> {
        Box::pin(async move {
            let mut state = self.state.write().await;
            let Some(occurrence) = state.occurrences.get_mut(&id) else {
                return Ok(None);
            };

            let (start_at, end_at) = changes.resolved_span(occurrence);
            if end_at < start_at {
                return Err(constraint_violation(
                    DatabaseErrorKind::CheckViolation,
                    format!("occurrence {id} ends before it starts"),
                ));
            }

            occurrence.start_at = start_at;
            occurrence.end_at = end_at;
            if let Some(note) = &changes.note {
                occurrence.note = Some(note.clone());
            }
            occurrence.updated_at = Utc::now();

            Ok(Some(occurrence.clone()))
        })
    }
}
