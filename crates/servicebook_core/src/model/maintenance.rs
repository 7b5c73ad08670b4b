//! Recurring maintenance tasks and their performance logs.
//!
//! # Responsibility
//! - Define task definitions with a dual mileage/time recurrence.
//! - Define log entries recording when a task was performed.
//!
//! # Invariants
//! - Both recurrence intervals are strictly positive.
//! - A task is due at whichever interval elapses first.

use crate::model::validation::ValidationError;
use crate::model::vehicle::VehicleId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a maintenance task.
pub type TaskId = Uuid;
/// Stable identifier of a maintenance log entry.
pub type LogId = Uuid;

/// Mean Gregorian year length used to turn month intervals into days.
pub const DAYS_PER_YEAR: f64 = 365.2524;

/// Recurrence interval of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub miles: u32,
    pub months: u32,
}

impl Recurrence {
    /// Builds a recurrence, rejecting zero intervals.
    pub fn new(miles: u32, months: u32) -> Result<Self, ValidationError> {
        let recurrence = Self { miles, months };
        recurrence.validate()?;
        Ok(recurrence)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.miles == 0 {
            return Err(ValidationError::NonPositiveFrequency("freq_miles"));
        }
        if self.months == 0 {
            return Err(ValidationError::NonPositiveFrequency("freq_months"));
        }
        Ok(())
    }

    /// Time interval in fractional days.
    ///
    /// Uses the mean year length, not calendar-month arithmetic, so a
    /// 12-month interval is 365.2524 days regardless of the start date.
    pub fn days(&self) -> f64 {
        (f64::from(self.months) / 12.0) * DAYS_PER_YEAR
    }
}

/// Task definition attached to one vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceTask {
    pub uuid: TaskId,
    pub vehicle_uuid: VehicleId,
    pub name: String,
    pub description: Option<String>,
    pub recurrence: Recurrence,
}

impl MaintenanceTask {
    pub fn new(
        vehicle_uuid: VehicleId,
        name: impl Into<String>,
        description: Option<String>,
        recurrence: Recurrence,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            vehicle_uuid,
            name: name.into(),
            description,
            recurrence,
        }
    }

    /// Checks persisted-shape invariants before writes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName("task"));
        }
        self.recurrence.validate()
    }
}

/// Record of a task being performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub uuid: LogId,
    pub task_uuid: TaskId,
    pub performed_on: NaiveDate,
    /// Odometer value at service time; mirrored into the ledger.
    pub mileage: u32,
    pub notes: String,
}

impl LogEntry {
    pub fn new(
        task_uuid: TaskId,
        performed_on: NaiveDate,
        mileage: u32,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            task_uuid,
            performed_on,
            mileage,
            notes: notes.into(),
        }
    }
}
