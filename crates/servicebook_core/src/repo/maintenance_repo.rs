//! Maintenance task/log repository.
//!
//! # Responsibility
//! - Provide CRUD over `maintenance_tasks` and `maintenance_logs`.
//! - Keep logs and the odometer ledger consistent: a log write records the
//!   reading for its date in the same transaction.
//! - Load a consistent schedule snapshot for status evaluation.
//!
//! # Invariants
//! - Task writes validate the task before SQL mutations.
//! - A batch of tasks is inserted all together or not at all.
//! - Task and log writes bump the owning vehicle's `notify_version`.
//! - Log lists are ordered by performed date, oldest first.

use crate::model::maintenance::{LogEntry, LogId, MaintenanceTask, Recurrence, TaskId};
use crate::model::vehicle::{OdometerReading, VehicleId};
use crate::repo::odometer_repo::{
    ensure_vehicle_exists, list_readings_in, record_estimated_reading, upsert_reading_in,
};
use crate::repo::store::{
    date_to_db, parse_date, parse_uuid, RepoError, RepoResult, SqliteStore,
};
use crate::repo::vehicle_repo::{bump_schedule_version, parse_vehicle_row, VEHICLE_SELECT_SQL};
use crate::schedule::evaluation::{ScheduleSnapshot, TaskHistory};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const TASK_SELECT_SQL: &str = "SELECT
    uuid,
    vehicle_uuid,
    name,
    description,
    freq_miles,
    freq_months
FROM maintenance_tasks";

const LOG_SELECT_SQL: &str = "SELECT
    uuid,
    task_uuid,
    performed_on,
    mileage,
    notes
FROM maintenance_logs";

/// How a log's mileage reaches the odometer ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    /// Read off the odometer; replaces any reading on the same date.
    Observed,
    /// Backfilled estimate; recorded only when it fills a free date before
    /// the newest reading and its mileage fits between its neighbours.
    Estimated,
}

/// First log written together with a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialLog {
    pub entry: LogEntry,
    pub ledger: LedgerWrite,
}

/// One task of a batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub task: MaintenanceTask,
    pub first_log: Option<InitialLog>,
}

/// Repository interface for maintenance tasks and logs.
pub trait MaintenanceRepository {
    /// Creates a task, optionally with its first log, in one transaction.
    fn create_task(&self, task: &MaintenanceTask, first_log: Option<&InitialLog>)
        -> RepoResult<()>;
    /// Creates every draft in one transaction; any failure writes nothing.
    fn create_tasks(&self, drafts: &[TaskDraft]) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<MaintenanceTask>>;
    /// Tasks of a vehicle in creation order.
    fn list_tasks(&self, vehicle: VehicleId) -> RepoResult<Vec<MaintenanceTask>>;
    /// Replaces name, description and recurrence.
    fn update_task(&self, task: &MaintenanceTask) -> RepoResult<()>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;

    /// Writes a log and the matching odometer reading atomically.
    fn add_log(&self, log: &LogEntry) -> RepoResult<()>;
    fn get_log(&self, id: LogId) -> RepoResult<Option<LogEntry>>;
    fn list_logs(&self, task: TaskId) -> RepoResult<Vec<LogEntry>>;
    fn latest_log(&self, task: TaskId) -> RepoResult<Option<LogEntry>>;
    fn delete_log(&self, id: LogId) -> RepoResult<()>;

    /// Vehicle, readings and every task with its latest log, read in one
    /// transaction. `None` when the vehicle does not exist.
    fn load_snapshot(&self, vehicle: VehicleId) -> RepoResult<Option<ScheduleSnapshot>>;
}

impl MaintenanceRepository for SqliteStore<'_> {
    fn create_task(
        &self,
        task: &MaintenanceTask,
        first_log: Option<&InitialLog>,
    ) -> RepoResult<()> {
        task.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_task_in(&tx, task, first_log)?;
        tx.commit()?;
        Ok(())
    }

    fn create_tasks(&self, drafts: &[TaskDraft]) -> RepoResult<()> {
        for draft in drafts {
            draft.task.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for draft in drafts {
            insert_task_in(&tx, &draft.task, draft.first_log.as_ref())?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<MaintenanceTask>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn list_tasks(&self, vehicle: VehicleId) -> RepoResult<Vec<MaintenanceTask>> {
        list_tasks_in(self.conn, vehicle)
    }

    fn update_task(&self, task: &MaintenanceTask) -> RepoResult<()> {
        task.validate()?;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE maintenance_tasks
             SET
                name = ?2,
                description = ?3,
                freq_miles = ?4,
                freq_months = ?5
             WHERE uuid = ?1;",
            params![
                task.uuid.to_string(),
                task.name.as_str(),
                task.description.as_deref(),
                task.recurrence.miles,
                task.recurrence.months,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("maintenance task", task.uuid));
        }
        bump_version_for_task(&tx, task.uuid)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        bump_version_for_task(&tx, id)?;
        let changed = tx.execute(
            "DELETE FROM maintenance_tasks WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("maintenance task", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn add_log(&self, log: &LogEntry) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let vehicle_text: Option<String> = tx
            .query_row(
                "SELECT vehicle_uuid FROM maintenance_tasks WHERE uuid = ?1;",
                [log.task_uuid.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(vehicle_text) = vehicle_text else {
            return Err(RepoError::not_found("maintenance task", log.task_uuid));
        };
        let vehicle = parse_uuid(&vehicle_text, "maintenance_tasks.vehicle_uuid")?;

        insert_log_in(&tx, log, vehicle, LedgerWrite::Observed)?;
        tx.commit()?;
        Ok(())
    }

    fn get_log(&self, id: LogId) -> RepoResult<Option<LogEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LOG_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_log_row(row)?));
        }
        Ok(None)
    }

    fn list_logs(&self, task: TaskId) -> RepoResult<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LOG_SELECT_SQL}
             WHERE task_uuid = ?1
             ORDER BY performed_on ASC, created_at ASC;"
        ))?;
        let mut rows = stmt.query([task.to_string()])?;
        let mut logs = Vec::new();
        while let Some(row) = rows.next()? {
            logs.push(parse_log_row(row)?);
        }
        Ok(logs)
    }

    fn latest_log(&self, task: TaskId) -> RepoResult<Option<LogEntry>> {
        latest_log_in(self.conn, task)
    }

    fn delete_log(&self, id: LogId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE vehicles
             SET notify_version = notify_version + 1
             WHERE uuid = (
                SELECT tasks.vehicle_uuid
                FROM maintenance_logs logs
                JOIN maintenance_tasks tasks ON tasks.uuid = logs.task_uuid
                WHERE logs.uuid = ?1
             );",
            [id.to_string()],
        )?;
        let changed = tx.execute(
            "DELETE FROM maintenance_logs WHERE uuid = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("maintenance log", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn load_snapshot(&self, vehicle: VehicleId) -> RepoResult<Option<ScheduleSnapshot>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;

        let mut stmt = tx.prepare(&format!("{VEHICLE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([vehicle.to_string()])?;
        let loaded = match rows.next()? {
            Some(row) => Some(parse_vehicle_row(row)?),
            None => None,
        };
        drop(rows);
        drop(stmt);
        let Some(loaded) = loaded else {
            return Ok(None);
        };

        let readings = list_readings_in(&tx, vehicle)?;
        let mut tasks = Vec::new();
        for task in list_tasks_in(&tx, vehicle)? {
            let latest_log = latest_log_in(&tx, task.uuid)?;
            tasks.push(TaskHistory { task, latest_log });
        }
        tx.commit()?;

        Ok(Some(ScheduleSnapshot {
            vehicle: loaded,
            readings,
            tasks,
        }))
    }
}

fn insert_task_in(
    conn: &Connection,
    task: &MaintenanceTask,
    first_log: Option<&InitialLog>,
) -> RepoResult<()> {
    ensure_vehicle_exists(conn, task.vehicle_uuid)?;
    conn.execute(
        "INSERT INTO maintenance_tasks (
            uuid,
            vehicle_uuid,
            name,
            description,
            freq_miles,
            freq_months
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            task.uuid.to_string(),
            task.vehicle_uuid.to_string(),
            task.name.as_str(),
            task.description.as_deref(),
            task.recurrence.miles,
            task.recurrence.months,
        ],
    )?;
    match first_log {
        Some(first) => {
            if first.entry.task_uuid != task.uuid {
                return Err(RepoError::InvalidData(format!(
                    "first log {} belongs to task {}, not {}",
                    first.entry.uuid, first.entry.task_uuid, task.uuid
                )));
            }
            insert_log_in(conn, &first.entry, task.vehicle_uuid, first.ledger)
        }
        None => bump_schedule_version(conn, task.vehicle_uuid),
    }
}

fn insert_log_in(
    conn: &Connection,
    log: &LogEntry,
    vehicle: VehicleId,
    ledger: LedgerWrite,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO maintenance_logs (uuid, task_uuid, performed_on, mileage, notes)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            log.uuid.to_string(),
            log.task_uuid.to_string(),
            date_to_db(log.performed_on),
            log.mileage,
            log.notes.as_str(),
        ],
    )?;
    let reading = OdometerReading::new(vehicle, log.mileage, log.performed_on);
    match ledger {
        LedgerWrite::Observed => upsert_reading_in(conn, &reading),
        LedgerWrite::Estimated => {
            if !record_estimated_reading(conn, &reading)? {
                bump_schedule_version(conn, vehicle)?;
            }
            Ok(())
        }
    }
}

fn bump_version_for_task(conn: &Connection, task: TaskId) -> RepoResult<()> {
    conn.execute(
        "UPDATE vehicles
         SET notify_version = notify_version + 1
         WHERE uuid = (SELECT vehicle_uuid FROM maintenance_tasks WHERE uuid = ?1);",
        [task.to_string()],
    )?;
    Ok(())
}

fn list_tasks_in(conn: &Connection, vehicle: VehicleId) -> RepoResult<Vec<MaintenanceTask>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE vehicle_uuid = ?1
         ORDER BY created_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([vehicle.to_string()])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

fn latest_log_in(conn: &Connection, task: TaskId) -> RepoResult<Option<LogEntry>> {
    let mut stmt = conn.prepare(&format!(
        "{LOG_SELECT_SQL}
         WHERE task_uuid = ?1
         ORDER BY performed_on DESC, created_at DESC, rowid DESC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query([task.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_log_row(row)?));
    }
    Ok(None)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<MaintenanceTask> {
    let uuid_text: String = row.get("uuid")?;
    let vehicle_text: String = row.get("vehicle_uuid")?;
    let task = MaintenanceTask {
        uuid: parse_uuid(&uuid_text, "maintenance_tasks.uuid")?,
        vehicle_uuid: parse_uuid(&vehicle_text, "maintenance_tasks.vehicle_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        recurrence: Recurrence {
            miles: row.get("freq_miles")?,
            months: row.get("freq_months")?,
        },
    };
    task.validate()?;
    Ok(task)
}

fn parse_log_row(row: &Row<'_>) -> RepoResult<LogEntry> {
    let uuid_text: String = row.get("uuid")?;
    let task_text: String = row.get("task_uuid")?;
    let date_text: String = row.get("performed_on")?;
    Ok(LogEntry {
        uuid: parse_uuid(&uuid_text, "maintenance_logs.uuid")?,
        task_uuid: parse_uuid(&task_text, "maintenance_logs.task_uuid")?,
        performed_on: parse_date(&date_text, "maintenance_logs.performed_on")?,
        mileage: row.get("mileage")?,
        notes: row.get("notes")?,
    })
}
