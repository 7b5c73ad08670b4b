//! Command-line entry point.
//!
//! # Responsibility
//! - Run the reminder sweep on its own timer, or once.
//! - Print vehicle status reports and apply the standard schedule.
//!
//! # Invariants
//! - Each sweep opens its own connection on a blocking worker thread.
//! - Ctrl-C stops the sweep loop between runs, never inside one.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::{error, info};
use servicebook_core::{
    default_log_level, init_logging, init_stderr_logging, open_db, LogReminderSender,
    MaintenanceService, NotificationSweep, ScheduleConfig, SqliteStore, SweepSummary,
    VehicleReport, VehicleService,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Vehicle maintenance tracker.
#[derive(Parser, Debug)]
#[command(name = "servicebook", version, about)]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "SERVICEBOOK_DB", default_value = "servicebook.sqlite3")]
    db: PathBuf,

    /// trace|debug|info|warn|error; defaults by build mode.
    #[arg(long, env = "SERVICEBOOK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; stderr when unset.
    #[arg(long, env = "SERVICEBOOK_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send reminders for vehicles that need maintenance.
    Sweep {
        /// Run a single sweep and exit instead of looping.
        #[arg(long)]
        once: bool,
    },
    /// Print the status report of one vehicle.
    Report {
        vehicle: Uuid,
        /// Evaluation date (YYYY-MM-DD); defaults to today (UTC).
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// List every vehicle with its aggregate status.
    Vehicles,
    /// Add the built-in maintenance schedule to a vehicle.
    ApplySchedule { vehicle: Uuid },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = start_logging(&cli) {
        eprintln!("servicebook: {err}");
        return ExitCode::FAILURE;
    }

    let result = match ScheduleConfig::from_env() {
        Ok(config) => run(cli, config).await,
        Err(err) => Err(err.to_string()),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("servicebook: {err}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging(cli: &Cli) -> Result<(), String> {
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    match cli.log_dir.as_deref() {
        Some(dir) => init_logging(level, dir),
        None => init_stderr_logging(level),
    }
}

async fn run(cli: Cli, config: ScheduleConfig) -> Result<(), String> {
    match cli.command {
        Command::Sweep { once } => run_sweeps(cli.db, config, once).await,
        Command::Report {
            vehicle,
            today,
            json,
        } => {
            let today = today.unwrap_or_else(|| Utc::now().date_naive());
            let report = vehicle_report(&cli.db, &config, vehicle, today)?;
            if json {
                let text = serde_json::to_string_pretty(&report).map_err(|err| err.to_string())?;
                println!("{text}");
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Command::Vehicles => list_vehicles(&cli.db, &config),
        Command::ApplySchedule { vehicle } => apply_schedule(&cli.db, &config, vehicle),
    }
}

async fn run_sweeps(db: PathBuf, config: ScheduleConfig, once: bool) -> Result<(), String> {
    let mut ticker = tokio::time::interval(config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        "event=sweep_loop_start module=cli status=ok once={} interval_secs={}",
        once,
        config.sweep_interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let path = db.clone();
                let sweep_config = config.clone();
                let outcome = tokio::task::spawn_blocking(move || sweep_once(&path, sweep_config)).await;
                match outcome {
                    Ok(Ok(summary)) => {
                        if once {
                            println!("sent={} failed={}", summary.sent, summary.failed);
                        }
                    }
                    Ok(Err(err)) if once => return Err(err),
                    Ok(Err(err)) => {
                        error!("event=sweep_run module=cli status=error error={err}");
                    }
                    Err(join_err) => {
                        return Err(format!("sweep worker aborted: {join_err}"));
                    }
                }
                if once {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("event=sweep_loop_stop module=cli status=ok reason=ctrl_c");
                return Ok(());
            }
        }
    }
}

fn sweep_once(db: &Path, config: ScheduleConfig) -> Result<SweepSummary, String> {
    let conn = open_db(db).map_err(|err| err.to_string())?;
    let store = SqliteStore::try_new(&conn).map_err(|err| err.to_string())?;
    NotificationSweep::new(store, LogReminderSender, config)
        .run(Utc::now())
        .map_err(|err| err.to_string())
}

fn vehicle_report(
    db: &Path,
    config: &ScheduleConfig,
    vehicle: Uuid,
    today: NaiveDate,
) -> Result<VehicleReport, String> {
    let conn = open_db(db).map_err(|err| err.to_string())?;
    let store = SqliteStore::try_new(&conn).map_err(|err| err.to_string())?;
    MaintenanceService::new(store, config.thresholds)
        .vehicle_report(vehicle, today)
        .map_err(|err| err.to_string())
}

fn list_vehicles(db: &Path, config: &ScheduleConfig) -> Result<(), String> {
    let conn = open_db(db).map_err(|err| err.to_string())?;
    let store = SqliteStore::try_new(&conn).map_err(|err| err.to_string())?;
    let vehicles = VehicleService::new(store)
        .list_all_vehicles()
        .map_err(|err| err.to_string())?;
    let maintenance = MaintenanceService::new(store, config.thresholds);

    let today = Utc::now().date_naive();
    for vehicle in vehicles {
        let status = maintenance
            .vehicle_status(vehicle.uuid, today)
            .map_err(|err| err.to_string())?;
        println!("{}  {:<8} {}", vehicle.uuid, status, vehicle.display_name);
    }
    Ok(())
}

fn apply_schedule(db: &Path, config: &ScheduleConfig, vehicle: Uuid) -> Result<(), String> {
    let conn = open_db(db).map_err(|err| err.to_string())?;
    let store = SqliteStore::try_new(&conn).map_err(|err| err.to_string())?;
    let created = MaintenanceService::new(store, config.thresholds)
        .apply_standard_schedule(vehicle, Utc::now().date_naive())
        .map_err(|err| err.to_string())?;
    let backfilled = created.iter().filter(|task| task.backfilled).count();
    println!("added {} tasks ({} backfilled)", created.len(), backfilled);
    Ok(())
}

fn print_report(report: &VehicleReport) {
    println!(
        "{} ({}): {}, estimated {} miles",
        report.display_name, report.vehicle_uuid, report.status, report.estimated_mileage
    );
    for task in &report.tasks {
        println!(
            "  {:<8} {:<36} {:>7} mi {:>5} d",
            task.status,
            task.name,
            task.due.miles_due,
            task.due.days_due
        );
    }
}
