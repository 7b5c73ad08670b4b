use chrono::{Duration, NaiveDate};
use servicebook_core::db::open_db_in_memory;
use servicebook_core::schedule::backfill::BACKFILL_NOTES;
use servicebook_core::schedule::classifier::StatusThresholds;
use servicebook_core::schedule::standard::STANDARD_SCHEDULE;
use servicebook_core::{
    MaintenanceRepository, MaintenanceService, MaintenanceTask, NewLog, NewTask,
    OdometerRepository, Recurrence, RepoError, ServiceError, SqliteStore, TaskDraft,
    ValidationError, Vehicle, VehicleService,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 1)
}

fn seed_vehicle(store: SqliteStore<'_>, built_on: NaiveDate, mileage: Option<u32>) -> Vehicle {
    let vehicles = VehicleService::new(store);
    let account = vehicles
        .create_account("owner@example.com", "Owner")
        .unwrap();
    vehicles
        .create_vehicle(account.uuid, "Accord", built_on, mileage, today())
        .unwrap()
}

fn oil_change() -> NewTask {
    NewTask::new("Replace Engine Oil", Recurrence::new(7_500, 12).unwrap())
}

#[test]
fn task_on_aged_vehicle_is_backfilled_to_last_boundary() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, today() - Duration::days(500), Some(9_000));
    let service = MaintenanceService::new(store, StatusThresholds::default());

    let created = service
        .add_maintenance_task(vehicle.uuid, oil_change(), today())
        .unwrap();
    assert!(created.backfilled);

    let logs = service.list_logs(created.task.uuid).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].performed_on, today() - Duration::days(134));
    assert_eq!(logs[0].mileage, 7_500);
    assert_eq!(logs[0].notes, BACKFILL_NOTES);

    // The estimated reading fits before the 9,000 reading, so it is recorded.
    let readings = store.list_readings(vehicle.uuid).unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].reading_date, today() - Duration::days(134));
    assert_eq!(readings[0].mileage, 7_500);

    let due = service.task_due(created.task.uuid, today()).unwrap();
    assert_eq!(due.miles_due, 6_000);
    assert_eq!(due.days_due, 231);
}

#[test]
fn age_alone_triggers_backfill_at_zero_miles() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, today() - Duration::days(400), None);
    let service = MaintenanceService::new(store, StatusThresholds::default());

    let created = service
        .add_maintenance_task(
            vehicle.uuid,
            NewTask::new("Rotate Tires", Recurrence::new(15_000, 12).unwrap()),
            today(),
        )
        .unwrap();

    let log = created.initial_log.unwrap();
    assert_eq!(log.performed_on, today() - Duration::days(34));
    assert_eq!(log.mileage, 0);
    // No observed reading to anchor it, so the estimate stays out of the ledger.
    assert!(store.list_readings(vehicle.uuid).unwrap().is_empty());
}

#[test]
fn young_vehicle_gets_no_backfill() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, today() - Duration::days(100), Some(3_000));
    let service = MaintenanceService::new(store, StatusThresholds::default());

    let created = service
        .add_maintenance_task(vehicle.uuid, oil_change(), today())
        .unwrap();
    assert!(!created.backfilled);
    assert!(created.initial_log.is_none());
    assert!(service.list_logs(created.task.uuid).unwrap().is_empty());
}

#[test]
fn explicit_first_log_skips_backfill() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, today() - Duration::days(900), Some(30_000));
    let service = MaintenanceService::new(store, StatusThresholds::default());

    let mut request = oil_change();
    request.first_log = Some(NewLog {
        performed_on: date(2024, 3, 1),
        mileage: 28_000,
        notes: "dealer service".to_string(),
    });
    let created = service
        .add_maintenance_task(vehicle.uuid, request, today())
        .unwrap();
    assert!(!created.backfilled);

    let latest = service.latest_log(created.task.uuid).unwrap().unwrap();
    assert_eq!(latest.performed_on, date(2024, 3, 1));
    assert_eq!(latest.mileage, 28_000);
    assert_eq!(latest.notes, "dealer service");
    assert_eq!(store.list_readings(vehicle.uuid).unwrap().len(), 2);
}

#[test]
fn log_writes_matching_odometer_reading() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2024, 1, 1), None);
    let service = MaintenanceService::new(store, StatusThresholds::default());
    let task = service
        .add_maintenance_task(vehicle.uuid, oil_change(), today())
        .unwrap()
        .task;

    let log = service
        .add_log(
            task.uuid,
            NewLog {
                performed_on: date(2024, 5, 1),
                mileage: 4_200,
                notes: String::new(),
            },
            today(),
        )
        .unwrap();

    let around = store.readings_around(vehicle.uuid, date(2024, 5, 2)).unwrap();
    let reading = around.before.unwrap();
    assert_eq!(reading.reading_date, log.performed_on);
    assert_eq!(reading.mileage, 4_200);
}

#[test]
fn log_mileage_must_fit_between_neighboring_readings() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2020, 1, 1), None);
    let vehicles = VehicleService::new(store);
    vehicles
        .add_odometer_reading(vehicle.uuid, 10_000, date(2023, 1, 1), today())
        .unwrap();
    vehicles
        .add_odometer_reading(vehicle.uuid, 20_000, date(2024, 1, 1), today())
        .unwrap();

    let service = MaintenanceService::new(store, StatusThresholds::default());
    let mut request = oil_change();
    request.first_log = Some(NewLog {
        performed_on: date(2024, 1, 1),
        mileage: 20_000,
        notes: String::new(),
    });
    let task = service
        .add_maintenance_task(vehicle.uuid, request, today())
        .unwrap()
        .task;

    let err = service
        .add_log(
            task.uuid,
            NewLog {
                performed_on: date(2023, 6, 1),
                mileage: 25_000,
                notes: String::new(),
            },
            today(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MileageOutOfOrder { mileage: 25_000, .. })
    ));
    assert_eq!(service.list_logs(task.uuid).unwrap().len(), 1);

    service
        .add_log(
            task.uuid,
            NewLog {
                performed_on: date(2023, 6, 1),
                mileage: 15_000,
                notes: String::new(),
            },
            today(),
        )
        .unwrap();
    assert_eq!(service.list_logs(task.uuid).unwrap().len(), 2);
}

#[test]
fn invalid_task_input_is_rejected_before_writes() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2024, 1, 1), None);
    let service = MaintenanceService::new(store, StatusThresholds::default());

    let err = service
        .add_maintenance_task(
            vehicle.uuid,
            NewTask::new("   ", Recurrence { miles: 5_000, months: 6 }),
            today(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::BlankName("task"))
    ));

    let err = service
        .add_maintenance_task(
            vehicle.uuid,
            NewTask::new("Wash", Recurrence { miles: 0, months: 1 }),
            today(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::NonPositiveFrequency("freq_miles"))
    ));
    assert!(service.list_tasks(vehicle.uuid).unwrap().is_empty());
}

#[test]
fn task_edit_and_delete() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, today() - Duration::days(500), Some(9_000));
    let service = MaintenanceService::new(store, StatusThresholds::default());
    let created = service
        .add_maintenance_task(vehicle.uuid, oil_change(), today())
        .unwrap();

    let updated = service
        .update_task(
            created.task.uuid,
            " Synthetic Oil ",
            Some("0W-20".to_string()),
            Recurrence::new(10_000, 12).unwrap(),
        )
        .unwrap();
    assert_eq!(updated.name, "Synthetic Oil");
    assert_eq!(service.get_task(created.task.uuid).unwrap(), updated);

    service.delete_task(created.task.uuid).unwrap();
    assert!(matches!(
        service.get_task(created.task.uuid),
        Err(ServiceError::NotFound { .. })
    ));
    let orphan_logs: i64 = conn
        .query_row("SELECT COUNT(*) FROM maintenance_logs;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphan_logs, 0);
}

#[test]
fn standard_schedule_adds_every_task() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, today() - Duration::days(800), Some(40_000));
    let service = MaintenanceService::new(store, StatusThresholds::default());

    let created = service
        .apply_standard_schedule(vehicle.uuid, today())
        .unwrap();
    assert_eq!(created.len(), STANDARD_SCHEDULE.len());

    let names: Vec<String> = service
        .list_tasks(vehicle.uuid)
        .unwrap()
        .into_iter()
        .map(|task| task.name)
        .collect();
    assert_eq!(names.len(), STANDARD_SCHEDULE.len());
    assert!(names.iter().any(|name| name == "Rotate Tires"));

    // 40,000 miles on an 800-day-old car passes the oil interval but not
    // the 105,000-mile / 84-month timing belt interval.
    let oil = created
        .iter()
        .find(|entry| entry.task.name == "Replace Engine Oil")
        .unwrap();
    assert!(oil.backfilled);
    let belt = created
        .iter()
        .find(|entry| entry.task.name == "Replace Timing Belt")
        .unwrap();
    assert!(!belt.backfilled);
}

#[test]
fn unknown_vehicle_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = MaintenanceService::new(store, StatusThresholds::default());
    let missing = uuid::Uuid::new_v4();

    assert!(matches!(
        service.add_maintenance_task(missing, oil_change(), today()),
        Err(ServiceError::NotFound { entity: "vehicle", .. })
    ));
    assert!(matches!(
        service.vehicle_status(missing, today()),
        Err(ServiceError::NotFound { .. })
    ));
}

fn ledger(store: SqliteStore<'_>, vehicle: uuid::Uuid) -> Vec<(NaiveDate, u32)> {
    store
        .list_readings(vehicle)
        .unwrap()
        .into_iter()
        .map(|reading| (reading.reading_date, reading.mileage))
        .collect()
}

#[test]
fn backfill_below_recorded_mileage_leaves_ledger_and_estimate_alone() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2020, 1, 1), None);
    let vehicles = VehicleService::new(store);
    vehicles
        .add_odometer_reading(vehicle.uuid, 20_000, date(2020, 6, 1), today())
        .unwrap();
    let before = vehicles.estimated_mileage(vehicle.uuid, today()).unwrap();
    assert!(before.mileage > 200_000);

    let service = MaintenanceService::new(store, StatusThresholds::default());
    let created = service
        .add_maintenance_task(
            vehicle.uuid,
            NewTask::new("Replace Spark Plugs", Recurrence::new(30_000, 24).unwrap()),
            today(),
        )
        .unwrap();

    // Age alone triggers the backfill; its 0-mile estimate would sit after
    // a 20,000 reading, so only the log is written.
    assert!(created.backfilled);
    let log = created.initial_log.unwrap();
    assert_eq!(log.mileage, 0);
    assert!(log.performed_on > date(2020, 6, 1));
    assert_eq!(service.list_logs(created.task.uuid).unwrap(), vec![log]);

    assert_eq!(ledger(store, vehicle.uuid), vec![(date(2020, 6, 1), 20_000)]);
    let after = vehicles.estimated_mileage(vehicle.uuid, today()).unwrap();
    assert_eq!(after.mileage, before.mileage);
}

#[test]
fn backfill_never_replaces_reading_on_its_date() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    // 366 days is one 12-month interval plus less than a day, so the
    // backfill lands on the seed reading's date.
    let vehicle = seed_vehicle(store, today() - Duration::days(366), Some(8_000));
    let service = MaintenanceService::new(store, StatusThresholds::default());

    let created = service
        .add_maintenance_task(
            vehicle.uuid,
            NewTask::new("Replace Coolant", Recurrence::new(30_000, 12).unwrap()),
            today(),
        )
        .unwrap();
    let log = created.initial_log.unwrap();
    assert_eq!(log.performed_on, today());
    assert_eq!(log.mileage, 0);

    assert_eq!(ledger(store, vehicle.uuid), vec![(today(), 8_000)]);
    let due = service.task_due(created.task.uuid, today()).unwrap();
    assert_eq!(due.miles_due, 22_000);
}

#[test]
fn standard_schedule_does_not_depend_on_task_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2020, 1, 1), None);
    let vehicles = VehicleService::new(store);
    vehicles
        .add_odometer_reading(vehicle.uuid, 20_000, date(2020, 6, 1), today())
        .unwrap();
    let before = vehicles.estimated_mileage(vehicle.uuid, today()).unwrap();

    let service = MaintenanceService::new(store, StatusThresholds::default());
    let created = service
        .apply_standard_schedule(vehicle.uuid, today())
        .unwrap();

    // Every entry was planned from the 20,000 reading: interval multiples
    // of it, never a reading written by an earlier entry.
    for entry in created.iter().filter(|entry| entry.backfilled) {
        let log = entry.initial_log.as_ref().unwrap();
        let miles = entry.task.recurrence.miles;
        assert_eq!(log.mileage, 20_000 - 20_000 % miles, "{}", entry.task.name);
    }
    assert_eq!(ledger(store, vehicle.uuid)[0], (date(2020, 6, 1), 20_000));
    let after = vehicles.estimated_mileage(vehicle.uuid, today()).unwrap();
    assert!(after.mileage >= before.mileage);
    for window in ledger(store, vehicle.uuid).windows(2) {
        assert!(window[0].1 <= window[1].1);
    }
}

#[test]
fn task_batch_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, date(2024, 1, 1), None);
    let recurrence = Recurrence::new(7_500, 12).unwrap();

    let drafts = vec![
        TaskDraft {
            task: MaintenanceTask::new(vehicle.uuid, "Replace Engine Oil", None, recurrence),
            first_log: None,
        },
        TaskDraft {
            task: MaintenanceTask::new(uuid::Uuid::new_v4(), "Rotate Tires", None, recurrence),
            first_log: None,
        },
    ];
    let err = store.create_tasks(&drafts).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "vehicle", .. }));
    assert!(store.list_tasks(vehicle.uuid).unwrap().is_empty());

    store.create_tasks(&drafts[..1]).unwrap();
    assert_eq!(store.list_tasks(vehicle.uuid).unwrap().len(), 1);
}

#[test]
fn failed_standard_schedule_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let vehicle = seed_vehicle(store, today() - Duration::days(800), Some(40_000));
    let service = MaintenanceService::new(store, StatusThresholds::default());

    service
        .apply_standard_schedule(vehicle.uuid, today())
        .unwrap();
    let before = service.list_tasks(vehicle.uuid).unwrap().len();
    let readings_before = ledger(store, vehicle.uuid);

    // Re-inserting an existing task fails after "Wash" was already written.
    let existing = service.list_tasks(vehicle.uuid).unwrap().pop().unwrap();
    let recurrence = Recurrence::new(7_500, 12).unwrap();
    let drafts = vec![
        TaskDraft {
            task: MaintenanceTask::new(vehicle.uuid, "Wash", None, recurrence),
            first_log: None,
        },
        TaskDraft {
            task: existing,
            first_log: None,
        },
    ];
    assert!(matches!(
        store.create_tasks(&drafts),
        Err(RepoError::Db(_))
    ));
    assert_eq!(service.list_tasks(vehicle.uuid).unwrap().len(), before);
    assert_eq!(ledger(store, vehicle.uuid), readings_before);

    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        service.apply_standard_schedule(missing, today()),
        Err(ServiceError::NotFound { entity: "vehicle", .. })
    ));
}
