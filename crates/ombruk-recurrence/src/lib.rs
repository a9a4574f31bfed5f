//! Weekly recurrence rules for pickup schedules.
//!
//! A [`RecurrenceRule`] attached to an [`OccurrenceTemplate`] is expanded into
//! an ordered, finite series of [`GeneratedOccurrence`]s by [`expand`]. The
//! expansion is pure: it performs no I/O and can be iterated any number of
//! times with identical results.

pub mod days;
pub mod error;
pub mod expand;
pub mod rule;
pub mod template;

pub use days::DaySet;
pub use error::{RuleError, RuleResult};
pub use expand::{Expansion, ExpansionIter, expand};
pub use rule::RecurrenceRule;
pub use template::{GeneratedOccurrence, OccurrenceTemplate};
