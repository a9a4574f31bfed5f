use chrono::NaiveDateTime;
use thiserror::Error;

/// Rejections raised before any expansion takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Invalid rule: interval must be at least 1 week")]
    ZeroInterval,

    #[error("Invalid rule: count must be at least 1")]
    ZeroCount,

    #[error("Invalid rule: until {until} precedes template start {start}")]
    UntilBeforeStart {
        until: NaiveDateTime,
        start: NaiveDateTime,
    },

    #[error("Invalid rule: series exceeds {limit} occurrences")]
    TooManyOccurrences { limit: usize },

    #[error("Invalid template: end {end} precedes start {start}")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

impl RuleError {
    /// Returns true when the template, not the rule, is malformed.
    #[must_use]
    pub const fn is_template_error(&self) -> bool {
        matches!(self, Self::EndBeforeStart { .. })
    }
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
