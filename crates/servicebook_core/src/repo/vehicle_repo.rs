//! Account/vehicle repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `accounts` and `vehicles`.
//! - Own the compare-and-swap reminder claim used by the sweep.
//!
//! # Invariants
//! - Deleting an account or vehicle cascades through foreign keys.
//! - `last_notification_at` only advances through `complete_notification`,
//!   and only for the caller whose claim token still holds the lease.
//! - A claim succeeds for at most one caller per `notify_version`.
//! - Every write that can change a vehicle's schedule bumps
//!   `notify_version` in the same transaction.

use crate::model::vehicle::{Account, AccountId, OdometerReading, Vehicle, VehicleId};
use crate::repo::odometer_repo::upsert_reading_in;
use crate::repo::store::{
    date_to_db, parse_date, parse_millis, parse_uuid, RepoError, RepoResult, SqliteStore,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

pub(crate) const VEHICLE_SELECT_SQL: &str = "SELECT
    uuid,
    account_uuid,
    display_name,
    built_on,
    last_notification_at,
    notify_version
FROM vehicles";

/// Arguments of one reminder claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationClaim {
    pub vehicle_uuid: VehicleId,
    /// Version observed when the vehicle was evaluated.
    pub expected_version: i64,
    pub now: DateTime<Utc>,
    /// Reminders sent after this instant are still cooling down.
    pub cooldown_cutoff: DateTime<Utc>,
    /// Claim expiry; a crashed sweep stops blocking others after this.
    pub lease_until: DateTime<Utc>,
    /// Identifies the lease holder to `complete_notification`.
    pub claim_token: Uuid,
}

/// Repository interface for accounts and vehicles.
pub trait VehicleRepository {
    fn create_account(&self, account: &Account) -> RepoResult<AccountId>;
    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>>;
    /// Lists accounts ordered by email.
    fn list_accounts(&self) -> RepoResult<Vec<Account>>;
    fn delete_account(&self, id: AccountId) -> RepoResult<()>;

    /// Inserts a vehicle and, when given, its first odometer reading in one
    /// transaction.
    fn create_vehicle(
        &self,
        vehicle: &Vehicle,
        seed_reading: Option<&OdometerReading>,
    ) -> RepoResult<VehicleId>;
    fn get_vehicle(&self, id: VehicleId) -> RepoResult<Option<Vehicle>>;
    /// Lists one account's vehicles ordered by creation.
    fn list_vehicles(&self, account: AccountId) -> RepoResult<Vec<Vehicle>>;
    /// Lists every vehicle ordered by creation.
    fn list_all_vehicles(&self) -> RepoResult<Vec<Vehicle>>;
    /// Replaces display name and manufacture date.
    fn update_vehicle(&self, vehicle: &Vehicle) -> RepoResult<()>;
    fn delete_vehicle(&self, id: VehicleId) -> RepoResult<()>;

    /// Atomically reserves the right to send one reminder.
    ///
    /// Returns `false` when the version moved, a live lease exists, or a
    /// reminder was sent after `cooldown_cutoff`.
    fn try_claim_notification(&self, claim: &NotificationClaim) -> RepoResult<bool>;
    /// Records a confirmed send, clears the lease and bumps the version.
    ///
    /// Returns `false` without touching the row when `claim_token` no longer
    /// holds the lease (it expired and another sweep claimed the vehicle).
    fn complete_notification(
        &self,
        id: VehicleId,
        claim_token: Uuid,
        sent_at: DateTime<Utc>,
    ) -> RepoResult<bool>;
    /// Drops the lease after a failed send; the timestamp is untouched.
    fn release_notification(&self, id: VehicleId, claim_token: Uuid) -> RepoResult<()>;
}

impl VehicleRepository for SqliteStore<'_> {
    fn create_account(&self, account: &Account) -> RepoResult<AccountId> {
        self.conn.execute(
            "INSERT INTO accounts (uuid, email, display_name) VALUES (?1, ?2, ?3);",
            params![
                account.uuid.to_string(),
                account.email.as_str(),
                account.display_name.as_str(),
            ],
        )?;
        Ok(account.uuid)
    }

    fn get_account(&self, id: AccountId) -> RepoResult<Option<Account>> {
        let mut stmt = self
            .conn
            .prepare("SELECT uuid, email, display_name FROM accounts WHERE uuid = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_account_row(row)?));
        }
        Ok(None)
    }

    fn list_accounts(&self) -> RepoResult<Vec<Account>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, email, display_name FROM accounts ORDER BY email COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut accounts = Vec::new();
        while let Some(row) = rows.next()? {
            accounts.push(parse_account_row(row)?);
        }
        Ok(accounts)
    }

    fn delete_account(&self, id: AccountId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM accounts WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("account", id));
        }
        Ok(())
    }

    fn create_vehicle(
        &self,
        vehicle: &Vehicle,
        seed_reading: Option<&OdometerReading>,
    ) -> RepoResult<VehicleId> {
        if let Some(reading) = seed_reading {
            if reading.vehicle_uuid != vehicle.uuid {
                return Err(RepoError::InvalidData(format!(
                    "seed reading {} belongs to vehicle {}, not {}",
                    reading.uuid, reading.vehicle_uuid, vehicle.uuid
                )));
            }
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let account_exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE uuid = ?1);",
            [vehicle.account_uuid.to_string()],
            |row| row.get(0),
        )?;
        if account_exists != 1 {
            return Err(RepoError::not_found("account", vehicle.account_uuid));
        }
        tx.execute(
            "INSERT INTO vehicles (
                uuid,
                account_uuid,
                display_name,
                built_on,
                last_notification_at,
                notify_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                vehicle.uuid.to_string(),
                vehicle.account_uuid.to_string(),
                vehicle.display_name.as_str(),
                date_to_db(vehicle.built_on),
                vehicle.last_notification_at.map(|at| at.timestamp_millis()),
                vehicle.notification_version,
            ],
        )?;
        if let Some(reading) = seed_reading {
            upsert_reading_in(&tx, reading)?;
        }
        tx.commit()?;
        Ok(vehicle.uuid)
    }

    fn get_vehicle(&self, id: VehicleId) -> RepoResult<Option<Vehicle>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{VEHICLE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_vehicle_row(row)?));
        }
        Ok(None)
    }

    fn list_vehicles(&self, account: AccountId) -> RepoResult<Vec<Vehicle>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VEHICLE_SELECT_SQL}
             WHERE account_uuid = ?1
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([account.to_string()])?;
        let mut vehicles = Vec::new();
        while let Some(row) = rows.next()? {
            vehicles.push(parse_vehicle_row(row)?);
        }
        Ok(vehicles)
    }

    fn list_all_vehicles(&self) -> RepoResult<Vec<Vehicle>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VEHICLE_SELECT_SQL}
             ORDER BY created_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut vehicles = Vec::new();
        while let Some(row) = rows.next()? {
            vehicles.push(parse_vehicle_row(row)?);
        }
        Ok(vehicles)
    }

    fn update_vehicle(&self, vehicle: &Vehicle) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE vehicles
             SET
                display_name = ?2,
                built_on = ?3,
                notify_version = notify_version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                vehicle.uuid.to_string(),
                vehicle.display_name.as_str(),
                date_to_db(vehicle.built_on),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("vehicle", vehicle.uuid));
        }
        Ok(())
    }

    fn delete_vehicle(&self, id: VehicleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM vehicles WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("vehicle", id));
        }
        Ok(())
    }

    fn try_claim_notification(&self, claim: &NotificationClaim) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE vehicles
             SET notify_lease_until = ?3, notify_claim = ?6
             WHERE uuid = ?1
               AND notify_version = ?2
               AND (notify_lease_until IS NULL OR notify_lease_until <= ?4)
               AND (last_notification_at IS NULL OR last_notification_at <= ?5);",
            params![
                claim.vehicle_uuid.to_string(),
                claim.expected_version,
                claim.lease_until.timestamp_millis(),
                claim.now.timestamp_millis(),
                claim.cooldown_cutoff.timestamp_millis(),
                claim.claim_token.to_string(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn complete_notification(
        &self,
        id: VehicleId,
        claim_token: Uuid,
        sent_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE vehicles
             SET
                last_notification_at = ?3,
                notify_lease_until = NULL,
                notify_claim = NULL,
                notify_version = notify_version + 1
             WHERE uuid = ?1 AND notify_claim = ?2;",
            params![
                id.to_string(),
                claim_token.to_string(),
                sent_at.timestamp_millis()
            ],
        )?;
        Ok(changed == 1)
    }

    fn release_notification(&self, id: VehicleId, claim_token: Uuid) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE vehicles
             SET notify_lease_until = NULL, notify_claim = NULL
             WHERE uuid = ?1 AND notify_claim = ?2;",
            params![id.to_string(), claim_token.to_string()],
        )?;
        Ok(())
    }
}

/// Invalidates outstanding reminder claims for a vehicle whose schedule
/// inputs changed. Caller owns the transaction.
pub(crate) fn bump_schedule_version(conn: &Connection, vehicle: VehicleId) -> RepoResult<()> {
    conn.execute(
        "UPDATE vehicles SET notify_version = notify_version + 1 WHERE uuid = ?1;",
        [vehicle.to_string()],
    )?;
    Ok(())
}

fn parse_account_row(row: &Row<'_>) -> RepoResult<Account> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Account {
        uuid: parse_uuid(&uuid_text, "accounts.uuid")?,
        email: row.get("email")?,
        display_name: row.get("display_name")?,
    })
}

pub(crate) fn parse_vehicle_row(row: &Row<'_>) -> RepoResult<Vehicle> {
    let uuid_text: String = row.get("uuid")?;
    let account_text: String = row.get("account_uuid")?;
    let built_text: String = row.get("built_on")?;
    let last_notification_at = match row.get::<_, Option<i64>>("last_notification_at")? {
        Some(millis) => Some(parse_millis(millis, "vehicles.last_notification_at")?),
        None => None,
    };

    Ok(Vehicle {
        uuid: parse_uuid(&uuid_text, "vehicles.uuid")?,
        account_uuid: parse_uuid(&account_text, "vehicles.account_uuid")?,
        display_name: row.get("display_name")?,
        built_on: parse_date(&built_text, "vehicles.built_on")?,
        last_notification_at,
        notification_version: row.get("notify_version")?,
    })
}
