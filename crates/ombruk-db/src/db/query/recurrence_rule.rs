//! Query composition for `recurrence_rule` table operations.

use diesel::pg::Pg;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::recurrence_rule;
use crate::model::recurrence_rule::{NewRecurrenceRuleRow, RecurrenceRuleRow};

/// ## Summary
/// Returns a query to select all rules.
#[must_use]
pub fn all() -> recurrence_rule::BoxedQuery<'static, Pg> {
    recurrence_rule::table.into_boxed()
}

/// ## Summary
/// Returns a query to find a rule by ID.
#[must_use]
pub fn by_id(id: Uuid) -> recurrence_rule::BoxedQuery<'static, Pg> {
    all().filter(recurrence_rule::id.eq(id))
}

/// ## Summary
/// Inserts a rule and returns the stored row.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert(
    conn: &mut DbConnection<'_>,
    row: &NewRecurrenceRuleRow,
) -> QueryResult<RecurrenceRuleRow> {
    diesel::insert_into(recurrence_rule::table)
        .values(row)
        .returning(RecurrenceRuleRow::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Loads one rule.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<Option<RecurrenceRuleRow>> {
    by_id(id)
        .select(RecurrenceRuleRow::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Deletes a rule. Occurrences referencing it go with it through the
/// foreign key cascade.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<usize> {
    diesel::delete(recurrence_rule::table.filter(recurrence_rule::id.eq(id)))
        .execute(conn)
        .await
}
