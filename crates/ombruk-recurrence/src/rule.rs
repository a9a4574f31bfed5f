//! Recurrence rule model and validation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::days::DaySet;
use crate::error::{RuleError, RuleResult};

/// ## Summary
/// Describes how a template repeats on a weekly cadence.
///
/// A cycle spans the seven days starting on the template date; cycles are
/// `interval` weeks apart. Expansion ends after `count` cycles or once an
/// occurrence would start after `until`, whichever comes first. With neither
/// bound set exactly one cycle is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Weeks between cycles.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Number of cycles to generate.
    #[serde(default)]
    pub count: Option<u32>,
    /// Inclusive upper bound on occurrence start.
    #[serde(default)]
    pub until: Option<NaiveDateTime>,
    /// Weekdays to repeat on; empty means the template's own weekday.
    #[serde(default)]
    pub days: DaySet,
}

const fn default_interval() -> u32 {
    1
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            count: None,
            until: None,
            days: DaySet::new(),
        }
    }
}

impl RecurrenceRule {
    /// A weekly rule repeating for `count` cycles.
    #[must_use]
    pub fn weekly(count: u32) -> Self {
        Self {
            count: Some(count),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_until(mut self, until: NaiveDateTime) -> Self {
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn with_days(mut self, days: DaySet) -> Self {
        self.days = days;
        self
    }

    /// ## Summary
    /// Cycle cap used during expansion.
    ///
    /// Returns the explicit count, or a single cycle when neither `count` nor
    /// `until` bounds the rule. `None` means only `until` terminates.
    #[must_use]
    pub fn cycle_limit(&self) -> Option<u32> {
        match (self.count, self.until) {
            (Some(count), _) => Some(count),
            (None, None) => Some(1),
            (None, Some(_)) => None,
        }
    }

    /// ## Summary
    /// Checks the rule against the start of the template it will expand.
    ///
    /// ## Errors
    /// Returns `ZeroInterval` or `ZeroCount` for non-positive values, and
    /// `UntilBeforeStart` when `until` precedes `anchor`.
    pub fn validate(&self, anchor: NaiveDateTime) -> RuleResult<()> {
        if self.interval == 0 {
            return Err(RuleError::ZeroInterval);
        }
        if self.count.is_some_and(|count| count == 0) {
            return Err(RuleError::ZeroCount);
        }
        if let Some(until) = self.until
            && until < anchor
        {
            return Err(RuleError::UntilBeforeStart {
                until,
                start: anchor,
            });
        }
        Ok(())
    }
}
