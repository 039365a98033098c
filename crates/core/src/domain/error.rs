// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Section out of order: expected {expected}, got {actual}")]
    SectionOutOfOrder { expected: String, actual: String },

    #[error("Age must be between {min} and {max}")]
    InvalidAge { min: u8, max: u8 },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
