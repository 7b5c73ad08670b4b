use chrono::NaiveDate;
use servicebook_core::db::open_db_in_memory;
use servicebook_core::schedule::classifier::StatusThresholds;
use servicebook_core::{
    MaintenanceService, MaintenanceStatus, NewLog, NewTask, Recurrence, SqliteStore, Vehicle,
    VehicleService,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_vehicle(store: SqliteStore<'_>, built_on: NaiveDate) -> Vehicle {
    let vehicles = VehicleService::new(store);
    let account = vehicles.create_account("o@example.com", "O").unwrap();
    vehicles
        .create_vehicle(account.uuid, "Element", built_on, None, date(2024, 6, 1))
        .unwrap()
}

fn with_first_log(name: &str, miles: u32, months: u32, on: NaiveDate, mileage: u32) -> NewTask {
    let mut request = NewTask::new(name, Recurrence::new(miles, months).unwrap());
    request.first_log = Some(NewLog {
        performed_on: on,
        mileage,
        notes: String::new(),
    });
    request
}

#[test]
fn task_without_logs_measures_from_manufacture() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2024, 1, 1));
    let today = date(2024, 6, 1);
    VehicleService::new(store)
        .add_odometer_reading(vehicle.uuid, 3_000, date(2024, 5, 1), today)
        .unwrap();

    let service = MaintenanceService::new(store, StatusThresholds::default());
    let task = service
        .add_maintenance_task(
            vehicle.uuid,
            NewTask::new("Oil", Recurrence::new(7_500, 12).unwrap()),
            today,
        )
        .unwrap()
        .task;

    // Single reading: 3,000 miles over 121 days since manufacture, then 31
    // more days at that rate gives 3,768.
    let due = service.task_due(task.uuid, today).unwrap();
    assert_eq!(due.miles_due, 7_500 - 3_768);
    assert_eq!(due.days_due, 213);
    assert_eq!(
        service.task_status(task.uuid, today).unwrap(),
        MaintenanceStatus::Good
    );
}

#[test]
fn exhausted_mileage_is_overdue_even_with_days_left() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2023, 1, 1));
    let today = date(2024, 5, 1);
    VehicleService::new(store)
        .add_odometer_reading(vehicle.uuid, 15_500, today, today)
        .unwrap();

    let service = MaintenanceService::new(store, StatusThresholds::default());
    let task = service
        .add_maintenance_task(
            vehicle.uuid,
            with_first_log("Brakes", 5_000, 12, date(2024, 1, 1), 10_000),
            today,
        )
        .unwrap()
        .task;

    let due = service.task_due(task.uuid, today).unwrap();
    assert_eq!(due.miles_due, 0);
    assert!(due.days_due > 200);
    assert_eq!(
        service.task_status(task.uuid, today).unwrap(),
        MaintenanceStatus::Overdue
    );
}

#[test]
fn few_days_left_is_soon() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2020, 1, 1));
    let today = date(2024, 6, 1);

    let service = MaintenanceService::new(store, StatusThresholds::default());
    let task = service
        .add_maintenance_task(
            vehicle.uuid,
            with_first_log("Coolant", 100_000, 12, date(2023, 6, 10), 10_000),
            today,
        )
        .unwrap()
        .task;
    VehicleService::new(store)
        .add_odometer_reading(vehicle.uuid, 12_000, today, today)
        .unwrap();

    // 365.2524 - 357 elapsed days = 8.25 -> 8 days.
    let due = service.task_due(task.uuid, today).unwrap();
    assert_eq!(due.days_due, 8);
    assert_eq!(due.miles_due, 98_000);
    assert_eq!(
        service.task_status(task.uuid, today).unwrap(),
        MaintenanceStatus::Soon
    );
}

#[test]
fn vehicle_status_is_worst_task_status() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2022, 1, 1));
    let today = date(2024, 6, 1);
    let service = MaintenanceService::new(store, StatusThresholds::default());

    assert_eq!(
        service.vehicle_status(vehicle.uuid, today).unwrap(),
        MaintenanceStatus::Good
    );

    service
        .add_maintenance_task(
            vehicle.uuid,
            with_first_log("Tires", 15_000, 12, date(2024, 5, 1), 20_000),
            today,
        )
        .unwrap();
    assert_eq!(
        service.vehicle_status(vehicle.uuid, today).unwrap(),
        MaintenanceStatus::Good
    );

    service
        .add_maintenance_task(
            vehicle.uuid,
            with_first_log("Oil", 7_500, 6, date(2023, 11, 1), 19_000),
            today,
        )
        .unwrap();
    let report = service.vehicle_report(vehicle.uuid, today).unwrap();
    assert_eq!(report.status, MaintenanceStatus::Overdue);
    assert_eq!(report.tasks.len(), 2);
    assert_eq!(report.attention_tasks().len(), 1);
    assert_eq!(report.attention_tasks()[0].name, "Oil");
}

#[test]
fn report_serializes_flat_task_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2024, 1, 1));
    let today = date(2024, 6, 1);
    let service = MaintenanceService::new(store, StatusThresholds::default());
    service
        .add_maintenance_task(
            vehicle.uuid,
            NewTask::new("Oil", Recurrence::new(7_500, 12).unwrap()),
            today,
        )
        .unwrap();

    let report = service.vehicle_report(vehicle.uuid, today).unwrap();
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["status"], "good");
    assert_eq!(value["tasks"][0]["name"], "Oil");
    assert_eq!(value["tasks"][0]["miles_due"], 7_500);
    assert_eq!(value["tasks"][0]["days_due"], 213);
}
