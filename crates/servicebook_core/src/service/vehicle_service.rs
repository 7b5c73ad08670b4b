//! Account, vehicle and odometer use-case service.
//!
//! # Responsibility
//! - Validate owner/vehicle input and forward writes to the repository.
//! - Keep new odometer readings consistent with their neighbours.
//! - Expose the current mileage estimate of a vehicle.
//!
//! # Invariants
//! - Dates are never later than the caller's `today` nor before 1900.
//! - A new reading lies between the readings dated before and after it.

use crate::model::validation::{check_date, check_mileage_order, normalize_email, normalize_name};
use crate::model::vehicle::{Account, AccountId, OdometerReading, ReadingId, Vehicle, VehicleId};
use crate::repo::odometer_repo::OdometerRepository;
use crate::repo::vehicle_repo::VehicleRepository;
use crate::schedule::estimator::{estimate_mileage, MileageEstimate};
use crate::service::error::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::info;

/// Vehicle service facade over repository implementations.
pub struct VehicleService<S> {
    store: S,
}

impl<S: VehicleRepository + OdometerRepository> VehicleService<S> {
    /// Creates a service using the provided repository implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn create_account(&self, email: &str, display_name: &str) -> ServiceResult<Account> {
        let account = Account::new(
            normalize_email(email)?,
            normalize_name("account", display_name)?,
        );
        self.store.create_account(&account)?;
        info!(
            "event=account_create module=service status=ok account_uuid={}",
            account.uuid
        );
        Ok(account)
    }

    pub fn get_account(&self, id: AccountId) -> ServiceResult<Account> {
        self.store
            .get_account(id)?
            .ok_or(ServiceError::not_found("account", id))
    }

    pub fn list_accounts(&self) -> ServiceResult<Vec<Account>> {
        Ok(self.store.list_accounts()?)
    }

    /// Deletes an account with all of its vehicles and their history.
    pub fn delete_account(&self, id: AccountId) -> ServiceResult<()> {
        self.store.delete_account(id)?;
        info!("event=account_delete module=service status=ok account_uuid={id}");
        Ok(())
    }

    /// Registers a vehicle, optionally seeding the ledger with the current
    /// odometer value dated `today`. Both rows commit together.
    pub fn create_vehicle(
        &self,
        account: AccountId,
        display_name: &str,
        built_on: NaiveDate,
        current_mileage: Option<u32>,
        today: NaiveDate,
    ) -> ServiceResult<Vehicle> {
        check_date(built_on, today)?;
        let vehicle = Vehicle::new(account, normalize_name("vehicle", display_name)?, built_on);
        let seed = current_mileage.map(|mileage| OdometerReading::new(vehicle.uuid, mileage, today));
        self.store.create_vehicle(&vehicle, seed.as_ref())?;
        info!(
            "event=vehicle_create module=service status=ok vehicle_uuid={} seeded_reading={}",
            vehicle.uuid,
            current_mileage.is_some()
        );
        Ok(vehicle)
    }

    pub fn get_vehicle(&self, id: VehicleId) -> ServiceResult<Vehicle> {
        self.store
            .get_vehicle(id)?
            .ok_or(ServiceError::not_found("vehicle", id))
    }

    pub fn list_vehicles(&self, account: AccountId) -> ServiceResult<Vec<Vehicle>> {
        if self.store.get_account(account)?.is_none() {
            return Err(ServiceError::not_found("account", account));
        }
        Ok(self.store.list_vehicles(account)?)
    }

    pub fn list_all_vehicles(&self) -> ServiceResult<Vec<Vehicle>> {
        Ok(self.store.list_all_vehicles()?)
    }

    /// Renames a vehicle and/or corrects its manufacture date.
    pub fn update_vehicle(
        &self,
        id: VehicleId,
        display_name: &str,
        built_on: NaiveDate,
        today: NaiveDate,
    ) -> ServiceResult<Vehicle> {
        check_date(built_on, today)?;
        let mut vehicle = self.get_vehicle(id)?;
        vehicle.display_name = normalize_name("vehicle", display_name)?;
        vehicle.built_on = built_on;
        self.store.update_vehicle(&vehicle)?;
        Ok(vehicle)
    }

    /// Deletes a vehicle with its readings, tasks and logs.
    pub fn delete_vehicle(&self, id: VehicleId) -> ServiceResult<()> {
        self.store.delete_vehicle(id)?;
        info!("event=vehicle_delete module=service status=ok vehicle_uuid={id}");
        Ok(())
    }

    /// Records an odometer value; a second reading on the same date replaces
    /// the first.
    pub fn add_odometer_reading(
        &self,
        vehicle: VehicleId,
        mileage: u32,
        reading_date: NaiveDate,
        today: NaiveDate,
    ) -> ServiceResult<OdometerReading> {
        check_date(reading_date, today)?;
        if self.store.get_vehicle(vehicle)?.is_none() {
            return Err(ServiceError::not_found("vehicle", vehicle));
        }
        let neighbors = self.store.readings_around(vehicle, reading_date)?;
        check_mileage_order(
            mileage,
            neighbors.before.map(|reading| reading.mileage),
            neighbors.after.map(|reading| reading.mileage),
        )?;

        let reading = OdometerReading::new(vehicle, mileage, reading_date);
        self.store.upsert_reading(&reading)?;
        Ok(reading)
    }

    /// Readings of a vehicle, oldest first.
    pub fn list_readings(&self, vehicle: VehicleId) -> ServiceResult<Vec<OdometerReading>> {
        if self.store.get_vehicle(vehicle)?.is_none() {
            return Err(ServiceError::not_found("vehicle", vehicle));
        }
        Ok(self.store.list_readings(vehicle)?)
    }

    /// Deletes a reading unless it is the vehicle's only one.
    pub fn delete_odometer_reading(&self, id: ReadingId) -> ServiceResult<()> {
        Ok(self.store.delete_reading(id)?)
    }

    pub fn estimated_mileage(
        &self,
        vehicle: VehicleId,
        today: NaiveDate,
    ) -> ServiceResult<MileageEstimate> {
        let loaded = self.get_vehicle(vehicle)?;
        let readings = self.store.list_readings(vehicle)?;
        Ok(estimate_mileage(&readings, loaded.built_on, today))
    }
}
