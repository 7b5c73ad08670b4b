//! Manufacturer-style default maintenance schedule.

use crate::model::maintenance::Recurrence;

/// One entry of the default schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardTask {
    pub name: &'static str,
    pub description: &'static str,
    pub miles: u32,
    pub months: u32,
}

impl StandardTask {
    pub fn recurrence(&self) -> Recurrence {
        Recurrence {
            miles: self.miles,
            months: self.months,
        }
    }
}

const fn entry(
    name: &'static str,
    description: &'static str,
    miles: u32,
    months: u32,
) -> StandardTask {
    StandardTask {
        name,
        description,
        miles,
        months,
    }
}

/// Default schedule offered for a newly tracked vehicle.
pub const STANDARD_SCHEDULE: &[StandardTask] = &[
    entry("Replace Engine Oil", "Drain and refill engine oil.", 7_500, 12),
    entry("Replace Oil Filter", "Fit a new engine oil filter.", 15_000, 12),
    entry("Replace Air Cleaner Element", "Swap the engine air filter.", 30_000, 24),
    entry("Inspect Valve Clearance", "Check and adjust valve lash.", 105_000, 84),
    entry("Replace Spark Plugs", "Fit new spark plugs.", 105_000, 84),
    entry("Replace Timing Belt", "Replace the timing belt.", 105_000, 84),
    entry("Replace Balancer Belt", "Replace the balance shaft belt.", 105_000, 84),
    entry("Inspect Water Pump", "Check the water pump for leaks and play.", 105_000, 84),
    entry("Inspect Drive Belts", "Check accessory belts for wear and tension.", 30_000, 24),
    entry("Inspect Idle Speed", "Check and adjust idle speed.", 105_000, 84),
    entry("Replace Engine Coolant", "Drain and refill engine coolant.", 120_000, 120),
    entry("Replace Transmission Fluid", "Drain and refill transmission fluid.", 120_000, 72),
    entry("Inspect Front and Rear Brakes", "Check pads, rotors and calipers.", 15_000, 12),
    entry("Replace Brake Fluid", "Flush and refill brake fluid.", 45_000, 36),
    entry("Check Parking Brake Adjustment", "Check parking brake travel.", 15_000, 12),
    entry("Replace Air Conditioning Filter", "Swap the cabin air filter.", 30_000, 24),
    entry("Rotate Tires", "Rotate tires front to back.", 15_000, 12),
];
