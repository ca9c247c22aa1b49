use serde::Serialize;
use thiserror::Error;

use super::StoreError;

/// Backend failure rewritten for display to the person using the app.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{title}: {message}")]
pub struct TranslatedError {
    pub code: String,
    pub title: String,
    pub message: String,
}

pub trait ErrorTranslator: Send + Sync {
    fn translate(&self, err: &StoreError) -> TranslatedError;
}
