//! Record store contracts and their SQLite implementation.
//!
//! # Responsibility
//! - Define use-case oriented data access traits per aggregate.
//! - Keep SQL inside the persistence boundary; services only see traits.
//!
//! # Invariants
//! - Multi-step writes (reading upsert, log + reading, task + first log,
//!   vehicle + seed reading, task batches) commit in a single transaction
//!   or not at all.
//! - Missing parents surface as `RepoError::NotFound`, not as raw
//!   foreign-key failures.

pub mod maintenance_repo;
pub mod odometer_repo;
pub mod store;
pub mod vehicle_repo;
