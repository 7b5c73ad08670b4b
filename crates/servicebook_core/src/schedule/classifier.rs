//! Due figures to `MaintenanceStatus`.

use crate::model::status::MaintenanceStatus;
use crate::schedule::due::DueFigures;

/// Cut-offs below which a task counts as due soon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusThresholds {
    pub soon_days: u32,
    pub soon_miles: u32,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            soon_days: 14,
            soon_miles: 500,
        }
    }
}

/// Classifies one task.
///
/// Overdue is checked first, so a task at zero miles is Overdue even when its
/// days remaining would only make it Soon.
pub fn classify(due: DueFigures, thresholds: StatusThresholds) -> MaintenanceStatus {
    if due.days_due == 0 || due.miles_due == 0 {
        MaintenanceStatus::Overdue
    } else if due.days_due < thresholds.soon_days || due.miles_due < thresholds.soon_miles {
        MaintenanceStatus::Soon
    } else {
        MaintenanceStatus::Good
    }
}

/// Worst status across a vehicle's tasks; `Good` when there are none.
pub fn aggregate(statuses: impl IntoIterator<Item = MaintenanceStatus>) -> MaintenanceStatus {
    let mut worst = MaintenanceStatus::Good;
    for status in statuses {
        if status == MaintenanceStatus::Overdue {
            return status;
        }
        worst = worst.max(status);
    }
    worst
}
