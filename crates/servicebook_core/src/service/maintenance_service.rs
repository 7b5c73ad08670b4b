//! Maintenance task, log and status use-case service.
//!
//! # Responsibility
//! - Create tasks, seeding history through a first log or a backfill.
//! - Record performed maintenance with ledger-consistent mileage.
//! - Answer per-task and per-vehicle status queries.
//!
//! # Invariants
//! - A task is created together with its first log or backfilled log in
//!   one transaction, never half-written. The standard schedule is one
//!   transaction for all of its tasks.
//! - Backfill never overrides the odometer ledger: an estimated reading is
//!   only recorded when its date is free and its mileage fits.
//! - Status queries evaluate one consistent snapshot of the vehicle.

use crate::model::maintenance::{LogEntry, LogId, MaintenanceTask, Recurrence, TaskId};
use crate::model::status::MaintenanceStatus;
use crate::model::validation::{check_date, check_mileage_order, normalize_name};
use crate::model::vehicle::{Vehicle, VehicleId};
use crate::repo::maintenance_repo::{InitialLog, LedgerWrite, MaintenanceRepository, TaskDraft};
use crate::repo::odometer_repo::OdometerRepository;
use crate::repo::vehicle_repo::VehicleRepository;
use crate::schedule::backfill::plan_backfill;
use crate::schedule::classifier::StatusThresholds;
use crate::schedule::due::DueFigures;
use crate::schedule::evaluation::{
    evaluate_task, evaluate_vehicle, ScheduleSnapshot, TaskReport, VehicleReport,
};
use crate::schedule::standard::STANDARD_SCHEDULE;
use crate::service::error::{ServiceError, ServiceResult};
use chrono::NaiveDate;
use log::info;

/// A performed service supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLog {
    pub performed_on: NaiveDate,
    pub mileage: u32,
    pub notes: String,
}

/// Task creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub name: String,
    pub description: Option<String>,
    pub recurrence: Recurrence,
    /// When present, written as the first log and backfill is skipped.
    pub first_log: Option<NewLog>,
}

impl NewTask {
    pub fn new(name: impl Into<String>, recurrence: Recurrence) -> Self {
        Self {
            name: name.into(),
            description: None,
            recurrence,
            first_log: None,
        }
    }
}

/// Result of a task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub task: MaintenanceTask,
    /// First log (caller-supplied or backfilled), if any was written.
    pub initial_log: Option<LogEntry>,
    pub backfilled: bool,
}

impl From<TaskDraft> for CreatedTask {
    fn from(draft: TaskDraft) -> Self {
        let backfilled = draft
            .first_log
            .as_ref()
            .is_some_and(|first| first.ledger == LedgerWrite::Estimated);
        Self {
            task: draft.task,
            initial_log: draft.first_log.map(|first| first.entry),
            backfilled,
        }
    }
}

/// Maintenance service facade over repository implementations.
pub struct MaintenanceService<S> {
    store: S,
    thresholds: StatusThresholds,
}

impl<S> MaintenanceService<S>
where
    S: VehicleRepository + OdometerRepository + MaintenanceRepository,
{
    pub fn new(store: S, thresholds: StatusThresholds) -> Self {
        Self { store, thresholds }
    }

    /// Adds a task to a vehicle.
    ///
    /// Without a caller-supplied first log, a vehicle already past one
    /// interval gets a backfilled log at the latest interval boundary.
    pub fn add_maintenance_task(
        &self,
        vehicle: VehicleId,
        request: NewTask,
        today: NaiveDate,
    ) -> ServiceResult<CreatedTask> {
        let loaded = self.load_vehicle(vehicle)?;
        let last_odometer = self.last_odometer(vehicle)?;
        let draft = self.draft_task(&loaded, request, last_odometer, today)?;

        self.store.create_task(&draft.task, draft.first_log.as_ref())?;
        let created = CreatedTask::from(draft);
        info!(
            "event=task_create module=service status=ok task_uuid={} vehicle_uuid={} backfilled={}",
            created.task.uuid, vehicle, created.backfilled
        );
        Ok(created)
    }

    /// Adds every entry of the default schedule to a vehicle.
    ///
    /// All entries are planned against the same ledger state and written in
    /// one transaction, so a failure leaves the vehicle without any of them.
    pub fn apply_standard_schedule(
        &self,
        vehicle: VehicleId,
        today: NaiveDate,
    ) -> ServiceResult<Vec<CreatedTask>> {
        let loaded = self.load_vehicle(vehicle)?;
        let last_odometer = self.last_odometer(vehicle)?;

        let mut drafts = Vec::with_capacity(STANDARD_SCHEDULE.len());
        for entry in STANDARD_SCHEDULE {
            let mut request = NewTask::new(entry.name, entry.recurrence());
            request.description = Some(entry.description.to_string());
            drafts.push(self.draft_task(&loaded, request, last_odometer, today)?);
        }

        self.store.create_tasks(&drafts)?;
        let created: Vec<CreatedTask> = drafts.into_iter().map(CreatedTask::from).collect();
        info!(
            "event=schedule_apply module=service status=ok vehicle_uuid={} tasks={} backfilled={}",
            vehicle,
            created.len(),
            created.iter().filter(|task| task.backfilled).count()
        );
        Ok(created)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<MaintenanceTask> {
        self.store
            .get_task(id)?
            .ok_or(ServiceError::not_found("maintenance task", id))
    }

    pub fn list_tasks(&self, vehicle: VehicleId) -> ServiceResult<Vec<MaintenanceTask>> {
        if self.store.get_vehicle(vehicle)?.is_none() {
            return Err(ServiceError::not_found("vehicle", vehicle));
        }
        Ok(self.store.list_tasks(vehicle)?)
    }

    /// Replaces a task's name, description and recurrence.
    pub fn update_task(
        &self,
        id: TaskId,
        name: &str,
        description: Option<String>,
        recurrence: Recurrence,
    ) -> ServiceResult<MaintenanceTask> {
        let mut task = self.get_task(id)?;
        task.name = normalize_name("task", name)?;
        task.description = description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        recurrence.validate()?;
        task.recurrence = recurrence;
        self.store.update_task(&task)?;
        Ok(task)
    }

    /// Deletes a task and its logs. Ledger readings are kept.
    pub fn delete_task(&self, id: TaskId) -> ServiceResult<()> {
        self.store.delete_task(id)?;
        info!("event=task_delete module=service status=ok task_uuid={id}");
        Ok(())
    }

    /// Records that a task was performed; also writes the odometer reading
    /// for that date.
    pub fn add_log(&self, task: TaskId, input: NewLog, today: NaiveDate) -> ServiceResult<LogEntry> {
        let owner = self.get_task(task)?;
        self.check_log_input(owner.vehicle_uuid, &input, today)?;
        let log = LogEntry::new(task, input.performed_on, input.mileage, input.notes);
        self.store.add_log(&log)?;
        Ok(log)
    }

    pub fn get_log(&self, id: LogId) -> ServiceResult<LogEntry> {
        self.store
            .get_log(id)?
            .ok_or(ServiceError::not_found("maintenance log", id))
    }

    /// Logs of a task, oldest first.
    pub fn list_logs(&self, task: TaskId) -> ServiceResult<Vec<LogEntry>> {
        self.get_task(task)?;
        Ok(self.store.list_logs(task)?)
    }

    /// Most recent log of a task, if it was ever performed.
    pub fn latest_log(&self, task: TaskId) -> ServiceResult<Option<LogEntry>> {
        self.get_task(task)?;
        Ok(self.store.latest_log(task)?)
    }

    /// Deletes a log. The reading it wrote stays in the ledger.
    pub fn delete_log(&self, id: LogId) -> ServiceResult<()> {
        Ok(self.store.delete_log(id)?)
    }

    /// Miles and days remaining for one task.
    pub fn task_due(&self, task: TaskId, today: NaiveDate) -> ServiceResult<DueFigures> {
        Ok(self.task_report(task, today)?.due)
    }

    pub fn task_status(&self, task: TaskId, today: NaiveDate) -> ServiceResult<MaintenanceStatus> {
        Ok(self.task_report(task, today)?.status)
    }

    /// Worst status across a vehicle's tasks; `Good` without tasks.
    pub fn vehicle_status(
        &self,
        vehicle: VehicleId,
        today: NaiveDate,
    ) -> ServiceResult<MaintenanceStatus> {
        Ok(self.vehicle_report(vehicle, today)?.status)
    }

    /// Estimate, per-task figures and aggregate status of one vehicle.
    pub fn vehicle_report(&self, vehicle: VehicleId, today: NaiveDate) -> ServiceResult<VehicleReport> {
        let snapshot = self.snapshot(vehicle)?;
        Ok(evaluate_vehicle(&snapshot, today, self.thresholds))
    }

    fn task_report(&self, task: TaskId, today: NaiveDate) -> ServiceResult<TaskReport> {
        let owner = self.get_task(task)?;
        let snapshot = self.snapshot(owner.vehicle_uuid)?;
        let history = snapshot
            .tasks
            .iter()
            .find(|history| history.task.uuid == task)
            .ok_or(ServiceError::not_found("maintenance task", task))?;
        let estimate = snapshot.estimate(today);
        Ok(evaluate_task(
            history,
            snapshot.vehicle.built_on,
            estimate.mileage,
            today,
            self.thresholds,
        ))
    }

    fn load_vehicle(&self, vehicle: VehicleId) -> ServiceResult<Vehicle> {
        self.store
            .get_vehicle(vehicle)?
            .ok_or(ServiceError::not_found("vehicle", vehicle))
    }

    /// Mileage of the latest real reading, 0 without readings.
    fn last_odometer(&self, vehicle: VehicleId) -> ServiceResult<u32> {
        Ok(self
            .store
            .latest_reading(vehicle)?
            .map_or(0, |reading| reading.mileage))
    }

    /// Validates a request and plans its first log without writing anything.
    fn draft_task(
        &self,
        vehicle: &Vehicle,
        request: NewTask,
        last_odometer: u32,
        today: NaiveDate,
    ) -> ServiceResult<TaskDraft> {
        let name = normalize_name("task", &request.name)?;
        request.recurrence.validate()?;
        let description = request
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let task = MaintenanceTask::new(vehicle.uuid, name, description, request.recurrence);

        let first_log = match request.first_log {
            Some(first) => {
                self.check_log_input(vehicle.uuid, &first, today)?;
                Some(InitialLog {
                    entry: LogEntry::new(task.uuid, first.performed_on, first.mileage, first.notes),
                    ledger: LedgerWrite::Observed,
                })
            }
            None => plan_backfill(task.recurrence, last_odometer, vehicle.built_on, today).map(
                |plan| InitialLog {
                    entry: LogEntry::new(task.uuid, plan.performed_on, plan.mileage, plan.notes),
                    ledger: LedgerWrite::Estimated,
                },
            ),
        };
        Ok(TaskDraft { task, first_log })
    }

    fn snapshot(&self, vehicle: VehicleId) -> ServiceResult<ScheduleSnapshot> {
        self.store
            .load_snapshot(vehicle)?
            .ok_or(ServiceError::not_found("vehicle", vehicle))
    }

    fn check_log_input(
        &self,
        vehicle: VehicleId,
        input: &NewLog,
        today: NaiveDate,
    ) -> ServiceResult<()> {
        check_date(input.performed_on, today)?;
        let neighbors = self.store.readings_around(vehicle, input.performed_on)?;
        check_mileage_order(
            input.mileage,
            neighbors.before.map(|reading| reading.mileage),
            neighbors.after.map(|reading| reading.mileage),
        )?;
        Ok(())
    }
}
