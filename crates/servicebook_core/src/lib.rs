//! Core domain logic for the servicebook maintenance tracker.
//! This crate is the single source of truth for scheduling invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;

pub use config::{ConfigError, ScheduleConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::maintenance::{LogEntry, LogId, MaintenanceTask, Recurrence, TaskId};
pub use model::status::MaintenanceStatus;
pub use model::validation::ValidationError;
pub use model::vehicle::{Account, AccountId, OdometerReading, ReadingId, Vehicle, VehicleId};
pub use repo::maintenance_repo::{InitialLog, LedgerWrite, MaintenanceRepository, TaskDraft};
pub use repo::odometer_repo::OdometerRepository;
pub use repo::store::{RepoError, RepoResult, SqliteStore};
pub use repo::vehicle_repo::VehicleRepository;
pub use schedule::evaluation::{TaskReport, VehicleReport};
pub use service::error::{ServiceError, ServiceResult};
pub use service::maintenance_service::{CreatedTask, MaintenanceService, NewLog, NewTask};
pub use service::notification_service::{
    DeliveryError, LogReminderSender, NotificationSweep, Reminder, ReminderSender, SweepSummary,
};
pub use service::vehicle_service::VehicleService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
