//! Odometer ledger repository.
//!
//! # Responsibility
//! - Store mileage readings per vehicle keyed by calendar date.
//! - Answer date-ordered queries the estimator and validators need.
//!
//! # Invariants
//! - At most one reading per `(vehicle, date)`; a write on an occupied date
//!   deletes the old reading and inserts the new one in one transaction.
//! - Monotonic mileage is not enforced for user readings; that belongs to
//!   input checks. Estimated readings are only recorded when they fit.
//! - An estimated reading never replaces a reading already in the ledger
//!   and never becomes the newest one.
//! - The only remaining reading of a vehicle cannot be deleted.
//! - Ledger writes bump the vehicle's `notify_version`.

use crate::model::validation::check_mileage_order;
use crate::model::vehicle::{OdometerReading, ReadingId, VehicleId};
use crate::repo::store::{
    date_to_db, parse_date, parse_uuid, RepoError, RepoResult, SqliteStore,
};
use crate::repo::vehicle_repo::bump_schedule_version;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const READING_SELECT_SQL: &str = "SELECT
    uuid,
    vehicle_uuid,
    mileage,
    reading_date
FROM odometer_readings";

/// Nearest readings strictly before and after a date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingNeighbors {
    pub before: Option<OdometerReading>,
    pub after: Option<OdometerReading>,
}

/// Repository interface for the odometer ledger.
pub trait OdometerRepository {
    /// Inserts a reading, replacing any reading on the same date.
    fn upsert_reading(&self, reading: &OdometerReading) -> RepoResult<()>;
    fn get_reading(&self, id: ReadingId) -> RepoResult<Option<OdometerReading>>;
    /// All readings of a vehicle, oldest first.
    fn list_readings(&self, vehicle: VehicleId) -> RepoResult<Vec<OdometerReading>>;
    /// Latest reading by date.
    fn latest_reading(&self, vehicle: VehicleId) -> RepoResult<Option<OdometerReading>>;
    /// Nearest readings on either side of `date`, excluding `date` itself.
    fn readings_around(&self, vehicle: VehicleId, date: NaiveDate)
        -> RepoResult<ReadingNeighbors>;
    fn delete_reading(&self, id: ReadingId) -> RepoResult<()>;
}

impl OdometerRepository for SqliteStore<'_> {
    fn upsert_reading(&self, reading: &OdometerReading) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_vehicle_exists(&tx, reading.vehicle_uuid)?;
        upsert_reading_in(&tx, reading)?;
        tx.commit()?;
        Ok(())
    }

    fn get_reading(&self, id: ReadingId) -> RepoResult<Option<OdometerReading>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{READING_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reading_row(row)?));
        }
        Ok(None)
    }

    fn list_readings(&self, vehicle: VehicleId) -> RepoResult<Vec<OdometerReading>> {
        list_readings_in(self.conn, vehicle)
    }

    fn latest_reading(&self, vehicle: VehicleId) -> RepoResult<Option<OdometerReading>> {
        let mut stmt = self.conn.prepare(&format!(
            "{READING_SELECT_SQL}
             WHERE vehicle_uuid = ?1
             ORDER BY reading_date DESC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query([vehicle.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reading_row(row)?));
        }
        Ok(None)
    }

    fn readings_around(
        &self,
        vehicle: VehicleId,
        date: NaiveDate,
    ) -> RepoResult<ReadingNeighbors> {
        readings_around_in(self.conn, vehicle, date)
    }

    fn delete_reading(&self, id: ReadingId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let vehicle_text: Option<String> = tx
            .query_row(
                "SELECT vehicle_uuid FROM odometer_readings WHERE uuid = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(vehicle_text) = vehicle_text else {
            return Err(RepoError::not_found("odometer reading", id));
        };

        let remaining: i64 = tx.query_row(
            "SELECT COUNT(*) FROM odometer_readings WHERE vehicle_uuid = ?1;",
            [vehicle_text.as_str()],
            |row| row.get(0),
        )?;
        let vehicle = parse_uuid(&vehicle_text, "odometer_readings.vehicle_uuid")?;
        if remaining <= 1 {
            return Err(RepoError::LastReading(vehicle));
        }

        tx.execute(
            "DELETE FROM odometer_readings WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        bump_schedule_version(&tx, vehicle)?;
        tx.commit()?;
        Ok(())
    }
}

/// Delete-then-insert on `(vehicle, date)`. Caller owns the transaction.
pub(crate) fn upsert_reading_in(conn: &Connection, reading: &OdometerReading) -> RepoResult<()> {
    let date_text = date_to_db(reading.reading_date);
    conn.execute(
        "DELETE FROM odometer_readings
         WHERE vehicle_uuid = ?1 AND reading_date = ?2;",
        params![reading.vehicle_uuid.to_string(), date_text],
    )?;
    conn.execute(
        "INSERT INTO odometer_readings (uuid, vehicle_uuid, mileage, reading_date)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            reading.uuid.to_string(),
            reading.vehicle_uuid.to_string(),
            reading.mileage,
            date_text,
        ],
    )?;
    bump_schedule_version(conn, reading.vehicle_uuid)
}

/// Records a reading derived from an estimated service date.
///
/// Only fills a gap inside the observed history: skipped (returns `false`)
/// when the date already has a reading, when no later reading exists, or
/// when the mileage would break the order of its neighbours. Caller owns
/// the transaction.
pub(crate) fn record_estimated_reading(
    conn: &Connection,
    reading: &OdometerReading,
) -> RepoResult<bool> {
    let occupied: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM odometer_readings
            WHERE vehicle_uuid = ?1 AND reading_date = ?2
        );",
        params![
            reading.vehicle_uuid.to_string(),
            date_to_db(reading.reading_date)
        ],
        |row| row.get(0),
    )?;
    if occupied == 1 {
        return Ok(false);
    }

    let neighbors = readings_around_in(conn, reading.vehicle_uuid, reading.reading_date)?;
    if neighbors.after.is_none() {
        return Ok(false);
    }
    let fits = check_mileage_order(
        reading.mileage,
        neighbors.before.as_ref().map(|r| r.mileage),
        neighbors.after.as_ref().map(|r| r.mileage),
    );
    if fits.is_err() {
        return Ok(false);
    }

    upsert_reading_in(conn, reading)?;
    Ok(true)
}

pub(crate) fn readings_around_in(
    conn: &Connection,
    vehicle: VehicleId,
    date: NaiveDate,
) -> RepoResult<ReadingNeighbors> {
    let vehicle_text = vehicle.to_string();
    let date_text = date_to_db(date);

    let mut before_stmt = conn.prepare(&format!(
        "{READING_SELECT_SQL}
         WHERE vehicle_uuid = ?1 AND reading_date < ?2
         ORDER BY reading_date DESC
         LIMIT 1;"
    ))?;
    let mut rows = before_stmt.query(params![vehicle_text, date_text])?;
    let before = match rows.next()? {
        Some(row) => Some(parse_reading_row(row)?),
        None => None,
    };

    let mut after_stmt = conn.prepare(&format!(
        "{READING_SELECT_SQL}
         WHERE vehicle_uuid = ?1 AND reading_date > ?2
         ORDER BY reading_date ASC
         LIMIT 1;"
    ))?;
    let mut rows = after_stmt.query(params![vehicle_text, date_text])?;
    let after = match rows.next()? {
        Some(row) => Some(parse_reading_row(row)?),
        None => None,
    };

    Ok(ReadingNeighbors { before, after })
}

pub(crate) fn list_readings_in(
    conn: &Connection,
    vehicle: VehicleId,
) -> RepoResult<Vec<OdometerReading>> {
    let mut stmt = conn.prepare(&format!(
        "{READING_SELECT_SQL}
         WHERE vehicle_uuid = ?1
         ORDER BY reading_date ASC;"
    ))?;
    let mut rows = stmt.query([vehicle.to_string()])?;
    let mut readings = Vec::new();
    while let Some(row) = rows.next()? {
        readings.push(parse_reading_row(row)?);
    }
    Ok(readings)
}

pub(crate) fn ensure_vehicle_exists(conn: &Connection, vehicle: VehicleId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM vehicles WHERE uuid = ?1);",
        [vehicle.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::not_found("vehicle", vehicle));
    }
    Ok(())
}

fn parse_reading_row(row: &Row<'_>) -> RepoResult<OdometerReading> {
    let uuid_text: String = row.get("uuid")?;
    let vehicle_text: String = row.get("vehicle_uuid")?;
    let date_text: String = row.get("reading_date")?;
    Ok(OdometerReading {
        uuid: parse_uuid(&uuid_text, "odometer_readings.uuid")?,
        vehicle_uuid: parse_uuid(&vehicle_text, "odometer_readings.vehicle_uuid")?,
        mileage: row.get("mileage")?,
        reading_date: parse_date(&date_text, "odometer_readings.reading_date")?,
    })
}
