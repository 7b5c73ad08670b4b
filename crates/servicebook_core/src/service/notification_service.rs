//! Periodic reminder sweep.
//!
//! # Responsibility
//! - Walk every vehicle, evaluate its status and send at most one reminder
//!   per cooldown window when something needs attention.
//! - Hand rendered reminders to an injected `ReminderSender`.
//!
//! # Invariants
//! - `last_notification_at` advances only after a confirmed send.
//! - A failure on one vehicle never aborts the rest of the sweep.
//! - Concurrent sweeps cannot both send for the same vehicle: the send is
//!   guarded by a compare-and-swap claim on the vehicle row.
//! - A claim made from a snapshot taken before a repair, reading or task
//!   edit fails, because those writes bump the vehicle's version.

use crate::config::ScheduleConfig;
use crate::model::vehicle::{Account, Vehicle, VehicleId};
use crate::repo::maintenance_repo::MaintenanceRepository;
use crate::repo::vehicle_repo::{NotificationClaim, VehicleRepository};
use crate::schedule::evaluation::{evaluate_vehicle, VehicleReport};
use crate::service::error::ServiceResult;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One reminder ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub account: Account,
    pub vehicle: Vehicle,
    pub report: VehicleReport,
}

impl Reminder {
    pub fn subject(&self) -> String {
        format!(
            "{}: maintenance {}",
            self.vehicle.display_name, self.report.status
        )
    }

    /// Plain-text body listing tasks that need attention, worst first.
    pub fn body(&self) -> String {
        let mut body = format!(
            "Hello {},\n\n{} (estimated {} miles) has maintenance that needs attention:\n",
            self.account.display_name, self.vehicle.display_name, self.report.estimated_mileage
        );
        for task in self.report.attention_tasks() {
            body.push_str(&format!(
                "- {} [{}]: {} miles / {} days remaining\n",
                task.name, task.status, task.due.miles_due, task.due.days_due
            ));
        }
        body
    }
}

/// Failure reported by a reminder transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Transport could not be reached or timed out.
    Transport(String),
    /// Transport refused the message (bad recipient, quota).
    Rejected(String),
}

impl Display for DeliveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "reminder transport failed: {message}"),
            Self::Rejected(message) => write!(f, "reminder rejected: {message}"),
        }
    }
}

impl Error for DeliveryError {}

/// Delivery collaborator. Timeouts and retries belong to implementations.
pub trait ReminderSender {
    fn send_reminder(&self, reminder: &Reminder) -> Result<(), DeliveryError>;
}

impl<T: ReminderSender + ?Sized> ReminderSender for &T {
    fn send_reminder(&self, reminder: &Reminder) -> Result<(), DeliveryError> {
        (**self).send_reminder(reminder)
    }
}

/// Sender that writes reminders to the log instead of a mail transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReminderSender;

impl ReminderSender for LogReminderSender {
    fn send_reminder(&self, reminder: &Reminder) -> Result<(), DeliveryError> {
        info!(
            "event=reminder_send module=notify status=ok vehicle_uuid={} vehicle_status={} tasks={}",
            reminder.vehicle.uuid,
            reminder.report.status.as_str(),
            reminder.report.attention_tasks().len()
        );
        Ok(())
    }
}

/// Counters of one sweep run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub vehicles: usize,
    pub sent: usize,
    pub up_to_date: usize,
    pub cooling_down: usize,
    pub claimed_elsewhere: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VehicleOutcome {
    Sent,
    UpToDate,
    CoolingDown,
    ClaimedElsewhere,
    DeliveryFailed,
    /// Deleted between listing and evaluation.
    Vanished,
}

impl VehicleOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::UpToDate => "up_to_date",
            Self::CoolingDown => "cooling_down",
            Self::ClaimedElsewhere => "claimed_elsewhere",
            Self::DeliveryFailed => "delivery_failed",
            Self::Vanished => "vanished",
        }
    }
}

impl SweepSummary {
    fn record(&mut self, outcome: VehicleOutcome) {
        match outcome {
            VehicleOutcome::Sent => self.sent += 1,
            VehicleOutcome::UpToDate | VehicleOutcome::Vanished => self.up_to_date += 1,
            VehicleOutcome::CoolingDown => self.cooling_down += 1,
            VehicleOutcome::ClaimedElsewhere => self.claimed_elsewhere += 1,
            VehicleOutcome::DeliveryFailed => self.failed += 1,
        }
    }
}

/// Reminder sweep over one record store and one sender.
pub struct NotificationSweep<S, N> {
    store: S,
    sender: N,
    config: ScheduleConfig,
}

impl<S, N> NotificationSweep<S, N>
where
    S: VehicleRepository + MaintenanceRepository,
    N: ReminderSender,
{
    pub fn new(store: S, sender: N, config: ScheduleConfig) -> Self {
        Self {
            store,
            sender,
            config,
        }
    }

    /// Runs one sweep and returns the number of reminders sent.
    pub fn run_notification_sweep(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        Ok(self.run(now)?.sent)
    }

    /// Runs one sweep over all accounts and vehicles.
    ///
    /// Only listing accounts can fail the whole run; everything after that
    /// is isolated per account and per vehicle.
    pub fn run(&self, now: DateTime<Utc>) -> ServiceResult<SweepSummary> {
        let mut summary = SweepSummary::default();
        let accounts = self.store.list_accounts()?;

        for account in &accounts {
            let vehicles = match self.store.list_vehicles(account.uuid) {
                Ok(vehicles) => vehicles,
                Err(err) => {
                    error!(
                        "event=sweep_account module=notify status=error account_uuid={} error={}",
                        account.uuid, err
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            for vehicle in vehicles {
                summary.vehicles += 1;
                match self.sweep_vehicle(account, vehicle.uuid, now) {
                    Ok(outcome) => {
                        debug!(
                            "event=sweep_vehicle module=notify status=ok vehicle_uuid={} outcome={}",
                            vehicle.uuid,
                            outcome.as_str()
                        );
                        summary.record(outcome);
                    }
                    Err(err) => {
                        error!(
                            "event=sweep_vehicle module=notify status=error vehicle_uuid={} error_code={} error={}",
                            vehicle.uuid,
                            err.code(),
                            err
                        );
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            "event=sweep_run module=notify status=ok vehicles={} sent={} up_to_date={} cooling_down={} claimed_elsewhere={} failed={}",
            summary.vehicles,
            summary.sent,
            summary.up_to_date,
            summary.cooling_down,
            summary.claimed_elsewhere,
            summary.failed
        );
        Ok(summary)
    }

    fn sweep_vehicle(
        &self,
        account: &Account,
        vehicle: VehicleId,
        now: DateTime<Utc>,
    ) -> ServiceResult<VehicleOutcome> {
        let Some(snapshot) = self.store.load_snapshot(vehicle)? else {
            return Ok(VehicleOutcome::Vanished);
        };
        let report = evaluate_vehicle(&snapshot, now.date_naive(), self.config.thresholds);
        if !report.status.needs_attention() {
            return Ok(VehicleOutcome::UpToDate);
        }

        let cooldown_cutoff = now - self.config.notification_cooldown;
        if snapshot
            .vehicle
            .last_notification_at
            .is_some_and(|sent_at| sent_at > cooldown_cutoff)
        {
            return Ok(VehicleOutcome::CoolingDown);
        }

        let claim = NotificationClaim {
            vehicle_uuid: vehicle,
            expected_version: snapshot.vehicle.notification_version,
            now,
            cooldown_cutoff,
            lease_until: now + self.config.notification_lease,
            claim_token: Uuid::new_v4(),
        };
        if !self.store.try_claim_notification(&claim)? {
            return Ok(VehicleOutcome::ClaimedElsewhere);
        }

        let reminder = Reminder {
            account: account.clone(),
            vehicle: snapshot.vehicle,
            report,
        };
        match self.sender.send_reminder(&reminder) {
            Ok(()) => {
                if !self
                    .store
                    .complete_notification(vehicle, claim.claim_token, now)?
                {
                    warn!(
                        "event=reminder_complete module=notify status=lease_lost vehicle_uuid={}",
                        vehicle
                    );
                }
                Ok(VehicleOutcome::Sent)
            }
            Err(err) => {
                warn!(
                    "event=reminder_send module=notify status=error vehicle_uuid={} error={}",
                    vehicle, err
                );
                self.store.release_notification(vehicle, claim.claim_token)?;
                Ok(VehicleOutcome::DeliveryFailed)
            }
        }
    }
}
