//! Whole-vehicle evaluation: ledger -> estimate -> due figures -> status.

use crate::model::maintenance::{LogEntry, MaintenanceTask, TaskId};
use crate::model::status::MaintenanceStatus;
use crate::model::vehicle::{OdometerReading, Vehicle, VehicleId};
use crate::schedule::classifier::{aggregate, classify, StatusThresholds};
use crate::schedule::due::{DueFigures, ReferencePoint};
use crate::schedule::estimator::{estimate_mileage, MileageEstimate};
use chrono::NaiveDate;
use serde::Serialize;

/// Task definition plus the log it is measured from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHistory {
    pub task: MaintenanceTask,
    pub latest_log: Option<LogEntry>,
}

/// Everything needed to evaluate one vehicle, read in one consistent pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub vehicle: Vehicle,
    pub readings: Vec<OdometerReading>,
    pub tasks: Vec<TaskHistory>,
}

impl ScheduleSnapshot {
    pub fn estimate(&self, today: NaiveDate) -> MileageEstimate {
        estimate_mileage(&self.readings, self.vehicle.built_on, today)
    }

    /// Latest odometer value by date, zero without readings.
    pub fn last_odometer(&self) -> u32 {
        self.readings
            .iter()
            .max_by_key(|reading| reading.reading_date)
            .map_or(0, |reading| reading.mileage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub task_uuid: TaskId,
    pub name: String,
    #[serde(flatten)]
    pub due: DueFigures,
    pub status: MaintenanceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleReport {
    pub vehicle_uuid: VehicleId,
    pub display_name: String,
    pub estimated_mileage: u32,
    pub status: MaintenanceStatus,
    pub tasks: Vec<TaskReport>,
}

impl VehicleReport {
    /// Tasks that are Soon or Overdue, worst first.
    pub fn attention_tasks(&self) -> Vec<&TaskReport> {
        let mut due: Vec<&TaskReport> = self
            .tasks
            .iter()
            .filter(|task| task.status.needs_attention())
            .collect();
        due.sort_by(|a, b| b.status.cmp(&a.status));
        due
    }
}

/// Evaluates one task against an already computed mileage estimate.
pub fn evaluate_task(
    history: &TaskHistory,
    built_on: NaiveDate,
    estimated_mileage: u32,
    today: NaiveDate,
    thresholds: StatusThresholds,
) -> TaskReport {
    let reference = ReferencePoint::resolve(history.latest_log.as_ref(), built_on);
    let due = DueFigures::compute(
        history.task.recurrence,
        reference,
        estimated_mileage,
        today,
    );
    TaskReport {
        task_uuid: history.task.uuid,
        name: history.task.name.clone(),
        due,
        status: classify(due, thresholds),
    }
}

/// Evaluates every task of a vehicle and aggregates the status.
pub fn evaluate_vehicle(
    snapshot: &ScheduleSnapshot,
    today: NaiveDate,
    thresholds: StatusThresholds,
) -> VehicleReport {
    let estimate = snapshot.estimate(today);
    let tasks: Vec<TaskReport> = snapshot
        .tasks
        .iter()
        .map(|history| {
            evaluate_task(
                history,
                snapshot.vehicle.built_on,
                estimate.mileage,
                today,
                thresholds,
            )
        })
        .collect();

    VehicleReport {
        vehicle_uuid: snapshot.vehicle.uuid,
        display_name: snapshot.vehicle.display_name.clone(),
        estimated_mileage: estimate.mileage,
        status: aggregate(tasks.iter().map(|task| task.status)),
        tasks,
    }
}
