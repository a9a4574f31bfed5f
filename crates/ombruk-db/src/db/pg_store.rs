//! `PostgreSQL` implementation of the occurrence store.

use anyhow::Context;
use chrono::Utc;
use diesel_async::scoped_futures::ScopedFutureExt;
use ombruk_core::config::DatabaseConfig;
use ombruk_recurrence::RecurrenceRule;
use tracing::Instrument;
use uuid::Uuid;

use crate::db::DbProvider;
use crate::db::connection::{self, DbPool};
use crate::db::map::rule::new_rule_row;
use crate::db::migrate::run_migrations;
use crate::db::query;
use crate::db::store::{
    OccurrenceFilter, OccurrenceStore, RemovedSeries, StoreFuture, StoredSeries,
};
use crate::db::transaction::with_transaction;
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceChanges, OccurrenceChangeset};
use crate::model::recurrence_rule::StoredRule;

/// Store backed by a pooled `diesel-async` connection.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// ## Summary
    /// Applies pending migrations, then opens a pool for `config`.
    ///
    /// ## Errors
    /// Returns an error if migrating or building the pool fails.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        run_migrations(&config.url)
            .await
            .context("failed to run database migrations")?;
        let pool = connection::create_pool(config)
            .await
            .context("failed to create database pool")?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub const fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl OccurrenceStore for PgStore {
    #[tracing::instrument(skip(self, rule), fields(interval = rule.interval))]
    fn insert_rule<'a>(&'a self, rule: &'a RecurrenceRule) -> StoreFuture<'a, StoredRule> {
        Box::pin(
            async move {
                let row = new_rule_row(Uuid::now_v7(), rule)?;
                let mut conn = self.pool.get_connection().await?;
                let stored = query::recurrence_rule::insert(&mut conn, &row).await?;
                StoredRule::try_from(stored)
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self, rows), fields(row_count = rows.len()))]
    fn insert_batch(&self, rows: Vec<NewOccurrence>) -> StoreFuture<'_, Vec<Occurrence>> {
        Box::pin(
            async move {
                if rows.is_empty() {
                    return Ok(Vec::new());
                }

                let mut conn = self.pool.get_connection().await?;
                let rows = &rows;
                let stored = with_transaction(&mut conn, |tx| {
                    async move { Ok(query::occurrence::insert_batch(tx, rows).await?) }
                        .scope_boxed()
                })
                .await?;

                tracing::debug!(inserted = stored.len(), "Occurrence batch committed");
                Ok(stored)
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
                let rule_row = rule
                    .map(|rule| new_rule_row(Uuid::now_v7(), rule))
                    .transpose()?;
                if let Some(rule_row) = &rule_row {
                    for row in &mut rows {
                        row.recurrence_rule_id = Some(rule_row.id);
                    }
                }

                let mut conn = self.pool.get_connection().await?;
                let (rule_row, rows) = (&rule_row, &rows);
                let series = with_transaction(&mut conn, |tx| {
                    async move {
                        let rule = match rule_row {
                            Some(row) => Some(StoredRule::try_from(
                                query::recurrence_rule::insert(tx, row).await?,
                            )?),
                            None => None,
                        };
                        let occurrences = query::occurrence::insert_batch(tx, rows).await?;
                        Ok(StoredSeries { rule, occurrences })
                    }
                    .scope_boxed()
                })
                .await?;

                tracing::debug!(
                    inserted = series.occurrences.len(),
                    "Occurrence series committed"
                );
                Ok(series)
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self))]
    fn delete_series(&self, rule_id: Uuid) -> StoreFuture<'_, RemovedSeries> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                with_transaction(&mut conn, |tx| {
                    async move {
                        let filter = OccurrenceFilter::for_rule(rule_id);
                        let occurrences = query::occurrence::delete_by_filter(tx, &filter).await?;
                        let rule_removed = query::recurrence_rule::delete(tx, rule_id).await? > 0;
                        Ok(RemovedSeries {
                            occurrences,
                            rule_removed,
                        })
                    }
                    .scope_boxed()
                })
                .await
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self))]
    fn select_occurrences<'a>(
        &'a self,
        filter: &'a OccurrenceFilter,
    ) -> StoreFuture<'a, Vec<Occurrence>> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                Ok(query::occurrence::select_by_filter(&mut conn, filter).await?)
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self))]
    fn delete_occurrences<'a>(
        &'a self,
        filter: &'a OccurrenceFilter,
    ) -> StoreFuture<'a, Vec<Occurrence>> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                with_transaction(&mut conn, |tx| {
                    async move { Ok(query::occurrence::delete_by_filter(tx, filter).await?) }
                        .scope_boxed()
                })
                .await
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self))]
    fn delete_rule(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                let deleted = query::recurrence_rule::delete(&mut conn, id).await?;
                Ok(deleted > 0)
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self))]
    fn exists(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                Ok(query::occurrence::exists(&mut conn, id).await?)
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self))]
    fn get_rule(&self, id: Uuid) -> StoreFuture<'_, Option<StoredRule>> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                query::recurrence_rule::find(&mut conn, id)
                    .await?
                    .map(StoredRule::try_from)
                    .transpose()
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self))]
    fn get_occurrence(&self, id: Uuid) -> StoreFuture<'_, Option<Occurrence>> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                Ok(query::occurrence::find(&mut conn, id).await?)
            }
            .instrument(tracing::Span::current()),
        )
    }

    #[tracing::instrument(skip(self, changes))]
    fn update_occurrence<'a>(
        &'a self,
        id: Uuid,
        changes: &'a OccurrenceChanges,
    ) -> StoreFuture<'a, Option<Occurrence>> {
        Box::pin(
            async move {
                let mut conn = self.pool.get_connection().await?;
                let changeset = OccurrenceChangeset::new(changes, Utc::now());
                Ok(query::occurrence::update(&mut conn, id, &changeset).await?)
            }
            .instrument(tracing::Span::current()),
        )
    }
}
