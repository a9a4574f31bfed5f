//! Conversions between recurrence domain types and table rows.

pub mod rule;
