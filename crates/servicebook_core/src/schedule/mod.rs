//! Maintenance scheduling arithmetic.
//!
//! # Responsibility
//! - Estimate current mileage from the odometer ledger.
//! - Derive miles/days remaining and a three-state status per task.
//! - Plan backfilled log entries for tasks added to aged vehicles.
//! - Provide the default schedule offered for new vehicles.
//!
//! # Invariants
//! - Everything here is pure: callers pass `today` and loaded records, no
//!   function reads the clock or the database.

pub mod backfill;
pub mod classifier;
pub mod due;
pub mod estimator;
pub mod evaluation;
pub mod standard;
