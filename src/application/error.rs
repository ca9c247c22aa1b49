use crate::domain::DomainError;
use crate::ports::{ConfigError, StoreError, TranslatedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Operation(#[from] TranslatedError),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Application error: {0}")]
    Application(String),

    #[error("Authentication required")]
    AuthenticationRequired,
}

pub type AppResult<T> = Result<T, AppError>;
