use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid project status: {0}")]
    InvalidStatus(String),

    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Required field missing: {0}")]
    MissingField(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
