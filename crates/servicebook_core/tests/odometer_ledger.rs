use chrono::NaiveDate;
use servicebook_core::db::open_db_in_memory;
use servicebook_core::schedule::estimator::EstimateBasis;
use servicebook_core::{
    OdometerReading, OdometerRepository, RepoError, ServiceError, SqliteStore, ValidationError,
    Vehicle, VehicleRepository, VehicleService,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_vehicle(service: &VehicleService<SqliteStore<'_>>, built_on: NaiveDate) -> Vehicle {
    let account = service
        .create_account("owner@example.com", "Owner")
        .unwrap();
    service
        .create_vehicle(account.uuid, "Civic", built_on, None, date(2024, 6, 1))
        .unwrap()
}

#[test]
fn same_date_reading_replaces_previous_one() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = VehicleService::new(store);
    let vehicle = seed_vehicle(&service, date(2020, 1, 1));
    let today = date(2024, 6, 1);

    service
        .add_odometer_reading(vehicle.uuid, 10_000, date(2023, 5, 1), today)
        .unwrap();
    service
        .add_odometer_reading(vehicle.uuid, 9_800, date(2023, 5, 1), today)
        .unwrap();

    let readings = service.list_readings(vehicle.uuid).unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].mileage, 9_800);
}

#[test]
fn readings_are_listed_oldest_first_with_neighbors() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = VehicleService::new(store);
    let vehicle = seed_vehicle(&service, date(2020, 1, 1));
    let today = date(2024, 6, 1);

    for (mileage, day) in [(30_000, date(2023, 1, 1)), (10_000, date(2021, 1, 1)), (20_000, date(2022, 1, 1))] {
        store
            .upsert_reading(&OdometerReading::new(vehicle.uuid, mileage, day))
            .unwrap();
    }

    let mileages: Vec<u32> = service
        .list_readings(vehicle.uuid)
        .unwrap()
        .iter()
        .map(|reading| reading.mileage)
        .collect();
    assert_eq!(mileages, vec![10_000, 20_000, 30_000]);
    assert_eq!(
        store.latest_reading(vehicle.uuid).unwrap().unwrap().mileage,
        30_000
    );

    let around = store.readings_around(vehicle.uuid, date(2022, 1, 1)).unwrap();
    assert_eq!(around.before.unwrap().mileage, 10_000);
    assert_eq!(around.after.unwrap().mileage, 30_000);

    let err = service
        .add_odometer_reading(vehicle.uuid, 35_000, date(2022, 6, 1), today)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MileageOutOfOrder {
            earlier: Some(20_000),
            later: Some(30_000),
            ..
        })
    ));
}

#[test]
fn future_and_prehistoric_dates_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = VehicleService::new(store);
    let vehicle = seed_vehicle(&service, date(2020, 1, 1));
    let today = date(2024, 6, 1);

    for day in [date(2024, 6, 2), date(1899, 12, 31)] {
        let err = service
            .add_odometer_reading(vehicle.uuid, 1_000, day, today)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::DateOutOfRange { .. })
        ));
    }
    assert!(service.list_readings(vehicle.uuid).unwrap().is_empty());
}

#[test]
fn last_reading_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = VehicleService::new(store);
    let vehicle = seed_vehicle(&service, date(2020, 1, 1));
    let today = date(2024, 6, 1);

    let first = service
        .add_odometer_reading(vehicle.uuid, 10_000, date(2023, 1, 1), today)
        .unwrap();
    let second = service
        .add_odometer_reading(vehicle.uuid, 12_000, date(2024, 1, 1), today)
        .unwrap();

    service.delete_odometer_reading(first.uuid).unwrap();
    let err = service.delete_odometer_reading(second.uuid).unwrap_err();
    assert!(matches!(err, ServiceError::LastReading(id) if id == vehicle.uuid));
    assert_eq!(service.list_readings(vehicle.uuid).unwrap().len(), 1);

    assert!(matches!(
        store.delete_reading(first.uuid),
        Err(RepoError::NotFound { .. })
    ));
}

#[test]
fn deleting_vehicle_cascades_to_readings() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = VehicleService::new(store);
    let account = service.create_account("a@example.com", "A").unwrap();
    let vehicle = service
        .create_vehicle(
            account.uuid,
            "Fit",
            date(2019, 1, 1),
            Some(42_000),
            date(2024, 6, 1),
        )
        .unwrap();
    assert_eq!(service.list_readings(vehicle.uuid).unwrap().len(), 1);

    service.delete_account(account.uuid).unwrap();
    assert!(store.get_vehicle(vehicle.uuid).unwrap().is_none());
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM odometer_readings;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

#[test]
fn estimate_extrapolates_from_ledger() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = VehicleService::new(store);
    let vehicle = seed_vehicle(&service, date(2020, 1, 1));
    let today = date(2024, 6, 1);

    let empty = service.estimated_mileage(vehicle.uuid, today).unwrap();
    assert_eq!(empty.mileage, 0);
    assert_eq!(empty.basis, EstimateBasis::NoReadings);

    service
        .add_odometer_reading(vehicle.uuid, 10_000, date(2024, 1, 1), today)
        .unwrap();
    service
        .add_odometer_reading(vehicle.uuid, 11_000, date(2024, 1, 11), today)
        .unwrap();

    // 100 miles/day over the 142 days since the latest reading.
    let estimate = service
        .estimated_mileage(vehicle.uuid, date(2024, 6, 1))
        .unwrap();
    assert_eq!(estimate.basis, EstimateBasis::Extrapolated);
    assert_eq!(estimate.mileage, 11_000 + 100 * 142);
}

#[test]
fn vehicle_and_seed_reading_commit_together() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = VehicleService::new(store);
    let account = service
        .create_account("owner@example.com", "Owner")
        .unwrap();
    let today = date(2024, 6, 1);

    let first = service
        .create_vehicle(account.uuid, "Civic", date(2020, 1, 1), Some(41_000), today)
        .unwrap();
    let seeded = service.list_readings(first.uuid).unwrap();
    assert_eq!(seeded.len(), 1);
    assert_eq!(seeded[0].mileage, 41_000);
    assert_eq!(seeded[0].reading_date, today);

    // The seed reading fails on its primary key after the vehicle row is
    // inserted; the vehicle must not survive without it.
    let second = Vehicle::new(account.uuid, "Fit", date(2021, 1, 1));
    let mut clashing = OdometerReading::new(second.uuid, 12_000, today);
    clashing.uuid = seeded[0].uuid;
    let err = store.create_vehicle(&second, Some(&clashing)).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert!(store.get_vehicle(second.uuid).unwrap().is_none());
    assert_eq!(service.list_vehicles(account.uuid).unwrap().len(), 1);
}
