//! Weekly recurrence expansion.
//!
//! Each cycle is the seven-day window that starts on the template date,
//! shifted by `cycle * interval` weeks. Inside a window the candidate weekdays
//! are visited by their day offset from the template's own weekday, so the
//! sequence is strictly increasing in start time and the `until` bound can end
//! expansion at the first candidate past it.

use std::iter::FusedIterator;

use chrono::{Datelike, NaiveDateTime, TimeDelta, Weekday};

use crate::error::{RuleError, RuleResult};
use crate::rule::RecurrenceRule;
use crate::template::{GeneratedOccurrence, OccurrenceTemplate};

/// Days in one cycle window.
const DAYS_PER_WEEK: u32 = 7;

/// Immutable expansion parameters shared by every cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Plan {
    /// Day offsets from the template date, ascending, each in `0..7`.
    offsets: Vec<u32>,
    interval_weeks: u32,
    cycle_limit: Option<u32>,
    until: Option<NaiveDateTime>,
}

impl Plan {
    fn single() -> Self {
        Self {
            offsets: vec![0],
            interval_weeks: 1,
            cycle_limit: Some(1),
            until: None,
        }
    }

    fn for_rule(anchor: Weekday, rule: &RecurrenceRule) -> Self {
        let mut offsets: Vec<u32> = if rule.days.is_empty() {
            vec![0]
        } else {
            rule.days
                .iter()
                .map(|day| day_offset(anchor, day))
                .collect()
        };
        offsets.sort_unstable();

        Self {
            offsets,
            interval_weeks: rule.interval,
            cycle_limit: rule.cycle_limit(),
            until: rule.until,
        }
    }

    /// Shift from the template start for a day offset within `cycle`.
    ///
    /// `None` when the shift leaves the representable date range.
    fn shift(&self, cycle: u32, offset: u32) -> Option<TimeDelta> {
        let weeks = i64::from(cycle).checked_mul(i64::from(self.interval_weeks))?;
        TimeDelta::try_weeks(weeks)?.checked_add(&TimeDelta::try_days(i64::from(offset))?)
    }
}

/// Days from `anchor` forward to `day`, in `0..7`.
fn day_offset(anchor: Weekday, day: Weekday) -> u32 {
    (day.num_days_from_monday() + DAYS_PER_WEEK - anchor.num_days_from_monday()) % DAYS_PER_WEEK
}

/// ## Summary
/// Validates a template and optional rule and prepares their expansion.
///
/// The returned [`Expansion`] is a restartable, finite sequence: every call to
/// [`Expansion::iter`] starts a fresh cursor and yields the same occurrences.
/// Without a rule the sequence holds exactly the template.
///
/// ## Errors
/// Returns a [`RuleError`] when the template ends before it starts or when the
/// rule fails [`RecurrenceRule::validate`]. No occurrence is produced in that
/// case.
#[tracing::instrument(skip_all, fields(start = %template.start, recurring = rule.is_some()))]
pub fn expand<'a, P: Clone>(
    template: &'a OccurrenceTemplate<P>,
    rule: Option<&RecurrenceRule>,
) -> RuleResult<Expansion<'a, P>> {
    template.validate()?;

    let plan = match rule {
        Some(rule) => {
            rule.validate(template.start)?;
            Plan::for_rule(template.start.weekday(), rule)
        }
        None => Plan::single(),
    };

    tracing::trace!(
        offsets = ?plan.offsets,
        interval = plan.interval_weeks,
        cycle_limit = ?plan.cycle_limit,
        until = ?plan.until,
        "Prepared expansion plan"
    );

    Ok(Expansion { template, plan })
}

/// A validated (template, rule) pair ready to be iterated.
#[derive(Debug, Clone)]
pub struct Expansion<'a, P> {
    template: &'a OccurrenceTemplate<P>,
    plan: Plan,
}

impl<'a, P: Clone> Expansion<'a, P> {
    /// Starts a new cursor at the beginning of the series.
    #[must_use]
    pub fn iter(&self) -> ExpansionIter<'_, P> {
        ExpansionIter {
            template: self.template,
            plan: &self.plan,
            cycle: 0,
            slot: 0,
            finished: false,
        }
    }

    /// The template this expansion is anchored on.
    #[must_use]
    pub const fn template(&self) -> &'a OccurrenceTemplate<P> {
        self.template
    }

    /// ## Summary
    /// Collects the whole series, refusing series longer than `limit`.
    ///
    /// ## Errors
    /// Returns `RuleError::TooManyOccurrences` when more than `limit`
    /// occurrences would be produced.
    pub fn collect_within(&self, limit: usize) -> RuleResult<Vec<GeneratedOccurrence<P>>> {
        let occurrences: Vec<_> = self.iter().take(limit.saturating_add(1)).collect();
        if occurrences.len() > limit {
            return Err(RuleError::TooManyOccurrences { limit });
        }
        Ok(occurrences)
    }
}

impl<'e, P: Clone> IntoIterator for &'e Expansion<'_, P> {
    type Item = GeneratedOccurrence<P>;
    type IntoIter = ExpansionIter<'e, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cursor over one pass of an [`Expansion`].
#[derive(Debug, Clone)]
pub struct ExpansionIter<'e, P> {
    template: &'e OccurrenceTemplate<P>,
    plan: &'e Plan,
    cycle: u32,
    slot: usize,
    finished: bool,
}

impl<P> ExpansionIter<'_, P> {
    fn finish(&mut self) {
        self.finished = true;
    }
}

impl<P: Clone> Iterator for ExpansionIter<'_, P> {
    type Item = GeneratedOccurrence<P>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            // Count is checked before until.
            if self
                .plan
                .cycle_limit
                .is_some_and(|limit| self.cycle >= limit)
            {
                self.finish();
                return None;
            }

            let Some(&offset) = self.plan.offsets.get(self.slot) else {
                if self.plan.offsets.is_empty() {
                    self.finish();
                    return None;
                }
                self.slot = 0;
                self.cycle = self.cycle.saturating_add(1);
                continue;
            };
            self.slot += 1;

            let Some(shift) = self.plan.shift(self.cycle, offset) else {
                tracing::debug!(cycle = self.cycle, "Expansion left the representable date range");
                self.finish();
                return None;
            };
            let (Some(start), Some(end)) = (
                self.template.start.checked_add_signed(shift),
                self.template.end.checked_add_signed(shift),
            ) else {
                tracing::debug!(cycle = self.cycle, "Expansion left the representable date range");
                self.finish();
                return None;
            };

            if start < self.template.start {
                continue;
            }

            if let Some(until) = self.plan.until
                && start > until
            {
                tracing::trace!(%start, %until, "Candidate past until, stopping");
                self.finish();
                return None;
            }

            return Some(GeneratedOccurrence {
                start,
                end,
                payload: self.template.payload.clone(),
            });
        }
    }
}

impl<P: Clone> FusedIterator for ExpansionIter<'_, P> {}
