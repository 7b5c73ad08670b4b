//! Service-level error taxonomy.

use crate::model::validation::ValidationError;
use crate::model::vehicle::VehicleId;
use crate::repo::store::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by core use-case services.
///
/// The request layer maps these to its own presentation (messages, status
/// codes); the core never formats user-facing text beyond `Display`.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before any write.
    Validation(ValidationError),
    /// Referenced record does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// The only odometer reading of a vehicle cannot be removed.
    LastReading(VehicleId),
    /// Storage failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::LastReading(vehicle) => write!(
                f,
                "cannot delete the last odometer reading of vehicle {vehicle}; add another first"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::LastReading(vehicle) => Self::LastReading(vehicle),
            other => Self::Repo(other),
        }
    }
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Short stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::LastReading(_) => "last_reading",
            Self::Repo(_) => "storage",
        }
    }
}
