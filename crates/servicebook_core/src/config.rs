//! Scheduling policy configuration.
//!
//! # Responsibility
//! - Hold the tunable thresholds, cooldown and sweep cadence.
//! - Load overrides from `SERVICEBOOK_*` environment variables.
//!
//! # Invariants
//! - `Default` reproduces the reference policy: soon within 14 days or 500
//!   miles, 3-day reminder cooldown, 5-minute sweep interval.
//! - Unparsable overrides are rejected, never silently ignored.

use crate::schedule::classifier::StatusThresholds;
use chrono::Duration;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const ENV_SOON_DAYS: &str = "SERVICEBOOK_SOON_DAYS";
pub const ENV_SOON_MILES: &str = "SERVICEBOOK_SOON_MILES";
pub const ENV_COOLDOWN_HOURS: &str = "SERVICEBOOK_COOLDOWN_HOURS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "SERVICEBOOK_SWEEP_INTERVAL_SECS";
pub const ENV_LEASE_SECS: &str = "SERVICEBOOK_NOTIFICATION_LEASE_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but does not parse as the expected number.
    InvalidValue { key: &'static str, value: String },
    /// Value parses but must be greater than zero.
    MustBePositive(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
            Self::MustBePositive(key) => write!(f, "{key} must be greater than zero"),
        }
    }
}

impl Error for ConfigError {}

/// Policy knobs for status classification and the notification sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub thresholds: StatusThresholds,
    /// Minimum time between two reminders for the same vehicle.
    pub notification_cooldown: Duration,
    /// Period of the sweep timer.
    pub sweep_interval: std::time::Duration,
    /// How long a sweep may hold a vehicle's reminder claim before another
    /// sweep may take it over.
    pub notification_lease: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            thresholds: StatusThresholds::default(),
            notification_cooldown: Duration::days(3),
            sweep_interval: std::time::Duration::from_secs(5 * 60),
            notification_lease: Duration::minutes(10),
        }
    }
}

impl ScheduleConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(days) = parse_positive(&lookup, ENV_SOON_DAYS)? {
            config.thresholds.soon_days = days;
        }
        if let Some(miles) = parse_positive(&lookup, ENV_SOON_MILES)? {
            config.thresholds.soon_miles = miles;
        }
        if let Some(hours) = parse_positive(&lookup, ENV_COOLDOWN_HOURS)? {
            config.notification_cooldown = Duration::hours(i64::from(hours));
        }
        if let Some(secs) = parse_positive(&lookup, ENV_SWEEP_INTERVAL_SECS)? {
            config.sweep_interval = std::time::Duration::from_secs(u64::from(secs));
        }
        if let Some(secs) = parse_positive(&lookup, ENV_LEASE_SECS)? {
            config.notification_lease = Duration::seconds(i64::from(secs));
        }

        Ok(config)
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u32>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: trimmed.to_string(),
        })?;
    if value == 0 {
        return Err(ConfigError::MustBePositive(key));
    }
    Ok(Some(value))
}
