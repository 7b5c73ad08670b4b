//! Synthetic history for tasks added to vehicles that already aged.
//!
//! A task created on an old vehicle would otherwise measure from the
//! manufacture date and come out overdue at once. When the vehicle is past
//! one interval, the plan assumes the schedule was kept and places the last
//! service at the most recent interval boundary.

use crate::model::maintenance::Recurrence;
use chrono::{Duration, NaiveDate};

/// Notes written on every backfilled log entry.
pub const BACKFILL_NOTES: &str =
    "Estimated entry: assumes the recommended schedule was kept before this task was tracked.";

/// Log entry the backfill step wants written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillPlan {
    pub performed_on: NaiveDate,
    pub mileage: u32,
    pub notes: &'static str,
}

/// Plans a backfilled log, or `None` when the task is not yet due once.
///
/// Triggers when `freq_miles < last_odometer` or `freq_days < age_in_days`.
/// `last_odometer` is the latest reading by date (zero when none exists).
pub fn plan_backfill(
    recurrence: Recurrence,
    last_odometer: u32,
    built_on: NaiveDate,
    today: NaiveDate,
) -> Option<BackfillPlan> {
    let age_in_days = (today - built_on).num_days();
    let freq_days = recurrence.days();
    let age = age_in_days as f64;

    if !(recurrence.miles < last_odometer || freq_days < age) {
        return None;
    }

    // Whole days only; the fractional remainder is dropped.
    let offset_days = if age > 0.0 { (age % freq_days).trunc() as i64 } else { 0 };
    let performed_on = today - Duration::days(offset_days);
    let mileage = last_odometer - last_odometer.checked_rem(recurrence.miles).unwrap_or(0);

    Some(BackfillPlan {
        performed_on,
        mileage,
        notes: BACKFILL_NOTES,
    })
}
