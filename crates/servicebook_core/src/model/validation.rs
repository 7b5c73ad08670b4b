//! Input validation rules applied before core writes.
//!
//! The request layer validates forms first; these checks make the core fail
//! fast instead of deriving nonsensical due figures from bad input.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Earliest date accepted for readings, logs and manufacture dates.
pub fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A frequency field was zero.
    NonPositiveFrequency(&'static str),
    /// Name field (task, vehicle or account) is blank after trim.
    BlankName(&'static str),
    /// Account email is blank or lacks an `@`.
    InvalidEmail(String),
    /// Date is in the future or earlier than 1900-01-01.
    DateOutOfRange { date: NaiveDate, today: NaiveDate },
    /// Mileage is lower than an earlier reading or higher than a later one.
    MileageOutOfOrder {
        mileage: u32,
        earlier: Option<u32>,
        later: Option<u32>,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveFrequency(field) => write!(f, "{field} must be greater than zero"),
            Self::BlankName(entity) => write!(f, "{entity} name must not be blank"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::DateOutOfRange { date, today } => write!(
                f,
                "date {date} must be between {} and {today}",
                earliest_date()
            ),
            Self::MileageOutOfOrder {
                mileage,
                earlier,
                later,
            } => write!(
                f,
                "mileage {mileage} does not fit existing odometer readings (earlier={}, later={})",
                fmt_optional(*earlier),
                fmt_optional(*later)
            ),
        }
    }
}

impl Error for ValidationError {}

/// Rejects dates in the future or before 1900.
pub fn check_date(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date > today || date < earliest_date() {
        return Err(ValidationError::DateOutOfRange { date, today });
    }
    Ok(())
}

/// Trims a display name and rejects blank values.
pub fn normalize_name(entity: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName(entity));
    }
    Ok(trimmed.to_string())
}

/// Trims an email address and applies a shape check.
pub fn normalize_email(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(trimmed.to_string())
        }
        _ => Err(ValidationError::InvalidEmail(trimmed.to_string())),
    }
}

/// Checks that `mileage` sits between its neighbouring readings (inclusive).
pub fn check_mileage_order(
    mileage: u32,
    earlier: Option<u32>,
    later: Option<u32>,
) -> Result<(), ValidationError> {
    let after_earlier = earlier.map_or(true, |value| value <= mileage);
    let before_later = later.map_or(true, |value| mileage <= value);
    if after_earlier && before_later {
        return Ok(());
    }
    Err(ValidationError::MileageOutOfOrder {
        mileage,
        earlier,
        later,
    })
}

fn fmt_optional(value: Option<u32>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}
