pub mod occurrence;
pub mod recurrence_rule;
