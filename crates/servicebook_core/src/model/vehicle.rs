//! Account, vehicle and odometer records.
//!
//! # Responsibility
//! - Define the owner/vehicle hierarchy the notification sweep walks.
//! - Define odometer readings, the ledger the mileage estimator reads.
//!
//! # Invariants
//! - At most one reading exists per `(vehicle, reading_date)`.
//! - `last_notification_at` is written only by the notification sweep.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an account (vehicle owner).
pub type AccountId = Uuid;
/// Stable identifier of a vehicle.
pub type VehicleId = Uuid;
/// Stable identifier of one odometer reading.
pub type ReadingId = Uuid;

/// Owner of vehicles and recipient of reminders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub uuid: AccountId,
    /// Reminder recipient address.
    pub email: String,
    pub display_name: String,
}

impl Account {
    /// Creates an account record with a generated stable ID.
    pub fn new(email: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            email: email.into(),
            display_name: display_name.into(),
        }
    }
}

/// A tracked vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub uuid: VehicleId,
    pub account_uuid: AccountId,
    pub display_name: String,
    /// Manufacture date. Task clocks start here when no log exists.
    pub built_on: NaiveDate,
    /// When the last reminder for this vehicle was confirmed sent.
    pub last_notification_at: Option<DateTime<Utc>>,
    /// Compare-and-swap token guarding the reminder claim.
    pub notification_version: i64,
}

impl Vehicle {
    /// Creates a vehicle that has never been notified.
    pub fn new(
        account_uuid: AccountId,
        display_name: impl Into<String>,
        built_on: NaiveDate,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            account_uuid,
            display_name: display_name.into(),
            built_on,
            last_notification_at: None,
            notification_version: 0,
        }
    }

    /// Days elapsed since manufacture. Negative if `today` precedes it.
    pub fn age_in_days(&self, today: NaiveDate) -> i64 {
        (today - self.built_on).num_days()
    }
}

/// One odometer observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdometerReading {
    pub uuid: ReadingId,
    pub vehicle_uuid: VehicleId,
    pub mileage: u32,
    pub reading_date: NaiveDate,
}

impl OdometerReading {
    pub fn new(vehicle_uuid: VehicleId, mileage: u32, reading_date: NaiveDate) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            vehicle_uuid,
            mileage,
            reading_date,
        }
    }
}
