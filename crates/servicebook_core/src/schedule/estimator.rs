//! Current-mileage estimation from odometer history.
//!
//! The estimate extrapolates the rate between the two most recent readings.
//! With a single reading the manufacture date at zero miles acts as the
//! earlier point, so a lone reading still extrapolates once time passes.

use crate::model::vehicle::OdometerReading;
use chrono::NaiveDate;
use log::debug;

/// How an estimate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateBasis {
    /// No readings recorded; the estimate is zero.
    NoReadings,
    /// Linear extrapolation from two points.
    Extrapolated,
    /// The two most recent points share a date, so no rate exists and the
    /// latest reading is returned unchanged.
    SameDayFallback,
}

/// Mileage estimate plus the path that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MileageEstimate {
    pub mileage: u32,
    pub basis: EstimateBasis,
}

#[derive(Debug, Clone, Copy)]
struct Point {
    date: NaiveDate,
    mileage: u32,
}

/// Estimates mileage on `today` from `readings`.
///
/// `readings` may arrive in any order; only the two latest by date are used.
/// The result is truncated toward zero and never negative.
pub fn estimate_mileage(
    readings: &[OdometerReading],
    built_on: NaiveDate,
    today: NaiveDate,
) -> MileageEstimate {
    let mut points: Vec<Point> = readings
        .iter()
        .map(|reading| Point {
            date: reading.reading_date,
            mileage: reading.mileage,
        })
        .collect();
    points.sort_by_key(|point| point.date);

    let Some(latest) = points.last().copied() else {
        return MileageEstimate {
            mileage: 0,
            basis: EstimateBasis::NoReadings,
        };
    };
    let previous = if points.len() >= 2 {
        points[points.len() - 2]
    } else {
        Point {
            date: built_on,
            mileage: 0,
        }
    };

    let span_days = (latest.date - previous.date).num_days();
    if span_days == 0 {
        debug!(
            "event=estimate_mileage module=schedule status=fallback reason=same_day date={} mileage={}",
            latest.date, latest.mileage
        );
        return MileageEstimate {
            mileage: latest.mileage,
            basis: EstimateBasis::SameDayFallback,
        };
    }

    let rate = (f64::from(latest.mileage) - f64::from(previous.mileage)) / span_days as f64;
    let elapsed = (today - latest.date).num_days() as f64;
    let estimate = f64::from(latest.mileage) + rate * elapsed;

    MileageEstimate {
        mileage: clamp_to_mileage(estimate.trunc()),
        basis: EstimateBasis::Extrapolated,
    }
}

fn clamp_to_mileage(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}
