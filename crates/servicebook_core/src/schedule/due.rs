//! Miles and days remaining before a task is next due.
//!
//! # Invariants
//! - The reference point is the most recent log by date; without logs the
//!   clock starts at the manufacture date with zero miles.
//! - Both figures are floored at zero.

use crate::model::maintenance::{LogEntry, Recurrence};
use chrono::NaiveDate;
use serde::Serialize;

/// Point from which a task's intervals are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferencePoint {
    pub date: NaiveDate,
    pub mileage: u32,
}

impl ReferencePoint {
    /// Picks the latest log, or the manufacture date at zero miles.
    pub fn resolve<'a>(
        logs: impl IntoIterator<Item = &'a LogEntry>,
        built_on: NaiveDate,
    ) -> Self {
        logs.into_iter()
            .max_by_key(|log| log.performed_on)
            .map_or(
                Self {
                    date: built_on,
                    mileage: 0,
                },
                |log| Self {
                    date: log.performed_on,
                    mileage: log.mileage,
                },
            )
    }
}

/// Remaining interval for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DueFigures {
    pub miles_due: u32,
    pub days_due: u32,
}

impl DueFigures {
    pub fn compute(
        recurrence: Recurrence,
        reference: ReferencePoint,
        estimated_mileage: u32,
        today: NaiveDate,
    ) -> Self {
        Self {
            miles_due: miles_until_due(recurrence, reference, estimated_mileage),
            days_due: days_until_due(recurrence, reference, today),
        }
    }
}

/// `freq_miles - (estimated - reference)`, floored at zero.
pub fn miles_until_due(
    recurrence: Recurrence,
    reference: ReferencePoint,
    estimated_mileage: u32,
) -> u32 {
    let driven = i64::from(estimated_mileage) - i64::from(reference.mileage);
    let remaining = i64::from(recurrence.miles) - driven;
    u32::try_from(remaining.max(0)).unwrap_or(u32::MAX)
}

/// `freq_days - (today - reference)`, floored at zero and truncated.
pub fn days_until_due(recurrence: Recurrence, reference: ReferencePoint, today: NaiveDate) -> u32 {
    let elapsed = (today - reference.date).num_days() as f64;
    let remaining = recurrence.days() - elapsed;
    if remaining <= 0.0 {
        0
    } else {
        remaining.trunc().min(f64::from(u32::MAX)) as u32
    }
}
