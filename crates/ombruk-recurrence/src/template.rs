use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};

/// Caller-submitted event that anchors a series.
///
/// `payload` is copied verbatim into every generated occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceTemplate<P> {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub payload: P,
}

impl<P> OccurrenceTemplate<P> {
    #[must_use]
    pub const fn new(start: NaiveDateTime, end: NaiveDateTime, payload: P) -> Self {
        Self {
            start,
            end,
            payload,
        }
    }

    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// ## Summary
    /// Rejects a template whose end precedes its start.
    ///
    /// ## Errors
    /// Returns `RuleError::EndBeforeStart`.
    pub fn validate(&self) -> RuleResult<()> {
        if self.end < self.start {
            return Err(RuleError::EndBeforeStart {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// One dated member of an expanded series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedOccurrence<P> {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub payload: P,
}
