//! Series scheduling: expansion, materialization and range operations.

pub mod materialize;
pub mod range;
pub mod service;

use ombruk_db::model::occurrence::PickupPayload;
use ombruk_recurrence::OccurrenceTemplate;

pub use materialize::ScheduledSeries;
pub use range::DeletedSeries;
pub use service::SchedulingService;

/// A pickup submitted as the first occurrence of a series.
pub type PickupTemplate = OccurrenceTemplate<PickupPayload>;
