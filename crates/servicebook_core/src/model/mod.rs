//! Domain model for vehicles, odometer history and recurring maintenance.
//!
//! # Responsibility
//! - Define the records persisted by the repository layer.
//! - Define value types shared by the scheduling arithmetic.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Vehicles own readings and tasks; tasks own logs. Deletes cascade down
//!   that ownership chain.

pub mod maintenance;
pub mod status;
pub mod validation;
pub mod vehicle;
