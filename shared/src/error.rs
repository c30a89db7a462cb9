//! Domain errors raised by the pure stock and ordering algorithms

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid movement type: {0}")]
    InvalidMovementType(String),

    #[error("Invalid movement nature: {0}")]
    InvalidMovementNature(String),

    #[error("Invalid quantity for {field}: {reason}")]
    InvalidQuantity {
        field: &'static str,
        reason: &'static str,
    },

    #[error("Invalid ISO week: {0}")]
    InvalidIsoWeek(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("No valid lines")]
    NoValidLines,

    #[error("{entity} is already {status}")]
    TerminalStatus {
        entity: &'static str,
        status: &'static str,
    },

    #[error("No line for product {0}")]
    LineNotFound(Uuid),
}

pub type DomainResult<T> = Result<T, DomainError>;
