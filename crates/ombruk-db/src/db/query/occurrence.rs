//! Query composition for `occurrence` table operations.

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::occurrence;
use crate::db::store::OccurrenceFilter;
use crate::model::occurrence::{NewOccurrence, Occurrence, OccurrenceChangeset};

/// Rows per `INSERT` statement, keeping bind parameters well below the
/// `PostgreSQL` limit of 65535.
pub const INSERT_CHUNK_SIZE: usize = 1000;

/// ## Summary
/// Returns a query for all occurrences (unfiltered).
#[must_use]
pub fn all() -> occurrence::BoxedQuery<'static, Pg> {
    occurrence::table.into_boxed()
}

/// ## Summary
/// Returns a query for one occurrence by ID.
#[must_use]
pub fn by_id(id: Uuid) -> occurrence::BoxedQuery<'static, Pg> {
    all().filter(occurrence::id.eq(id))
}

/// ## Summary
/// Returns a query for occurrences matching every constraint in `filter`.
///
/// Date bounds apply to `start_at` and are inclusive.
#[must_use]
pub fn by_filter(filter: &OccurrenceFilter) -> occurrence::BoxedQuery<'static, Pg> {
    let mut query = all();

    if let Some(rule_id) = filter.rule_id {
        query = query.filter(occurrence::recurrence_rule_id.eq(rule_id));
    }
    if let Some(from) = filter.from {
        query = query.filter(occurrence::start_at.ge(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(occurrence::start_at.le(to));
    }
    if let Some(location_id) = filter.location_id {
        query = query.filter(occurrence::location_id.eq(location_id));
    }
    if let Some(actor_id) = filter.actor_id {
        query = query.filter(occurrence::actor_id.eq(actor_id));
    }

    query
}

/// ## Summary
/// Returns the IDs of occurrences matching `filter`.
#[must_use]
pub fn ids_by_filter(
    filter: &OccurrenceFilter,
) -> occurrence::BoxedQuery<'static, Pg, diesel::sql_types::Uuid> {
    by_filter(filter).select(occurrence::id)
}

/// ## Summary
/// Inserts occurrences and returns the stored rows.
///
/// Large batches are split into several statements; run this inside a
/// transaction when the batch must be atomic.
///
/// ## Errors
/// Returns a database error if any insert fails.
pub async fn insert_batch(
    conn: &mut DbConnection<'_>,
    rows: &[NewOccurrence],
) -> QueryResult<Vec<Occurrence>> {
    let mut inserted = Vec::with_capacity(rows.len());

    for chunk in rows.chunks(INSERT_CHUNK_SIZE) {
        let stored = diesel::insert_into(occurrence::table)
            .values(chunk)
            .returning(Occurrence::as_returning())
            .get_results(conn)
            .await?;
        inserted.extend(stored);
    }

    Ok(inserted)
}

/// ## Summary
/// Loads the occurrences matching `filter`, ordered by start.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn select_by_filter(
    conn: &mut DbConnection<'_>,
    filter: &OccurrenceFilter,
) -> QueryResult<Vec<Occurrence>> {
    by_filter(filter)
        .order((occurrence::start_at.asc(), occurrence::id.asc()))
        .select(Occurrence::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Hard deletes the occurrences matching `filter` and returns them.
///
/// Matching IDs are resolved before the delete, so call this inside a
/// transaction.
///
/// ## Errors
/// Returns a database error if the lookup or the delete fails.
pub async fn delete_by_filter(
    conn: &mut DbConnection<'_>,
    filter: &OccurrenceFilter,
) -> QueryResult<Vec<Occurrence>> {
    let ids: Vec<Uuid> = ids_by_filter(filter).load(conn).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    delete_by_ids(conn, &ids).await
}

/// ## Summary
/// Hard deletes occurrences by ID and returns the deleted rows.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete_by_ids(
    conn: &mut DbConnection<'_>,
    ids: &[Uuid],
) -> QueryResult<Vec<Occurrence>> {
    diesel::delete(occurrence::table.filter(occurrence::id.eq_any(ids)))
        .returning(Occurrence::as_returning())
        .get_results(conn)
        .await
}

/// ## Summary
/// Loads one occurrence.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<Option<Occurrence>> {
    by_id(id)
        .select(Occurrence::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Checks whether an occurrence with `id` is stored.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn exists(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        occurrence::table.filter(occurrence::id.eq(id)),
    ))
    .get_result(conn)
    .await
}

/// ## Summary
/// Applies a changeset to one occurrence and bumps `updated_at`.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn update(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    changeset: &OccurrenceChangeset<'_>,
) -> QueryResult<Option<Occurrence>> {
    diesel::update(occurrence::table.filter(occurrence::id.eq(id)))
        .set(changeset)
        .returning(Occurrence::as_returning())
        .get_result(conn)
        .await
        .optional()
}

#[cfg(test)]
#[path = "occurrence_tests.rs"]
mod tests;
