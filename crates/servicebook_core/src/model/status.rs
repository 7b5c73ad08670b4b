//! Three-state maintenance status.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Due state of a task, or the worst state across a vehicle's tasks.
///
/// Variants are ordered by severity so a vehicle aggregate is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    /// Not due within the soon thresholds.
    Good,
    /// Due within the soon thresholds (days or miles).
    Soon,
    /// Zero days or zero miles remaining.
    Overdue,
}

impl MaintenanceStatus {
    /// Whether this status warrants a reminder.
    pub fn needs_attention(self) -> bool {
        matches!(self, Self::Soon | Self::Overdue)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Soon => "soon",
            Self::Overdue => "overdue",
        }
    }
}

impl Display for MaintenanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Good => "Good",
            Self::Soon => "Soon",
            Self::Overdue => "Overdue",
        };
        f.pad(label)
    }
}
