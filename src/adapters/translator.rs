use crate::ports::{ErrorTranslator, StoreError, TranslatedError};

/// Maps store failures to messages meant for the person at the keyboard.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorTranslator;

impl ErrorTranslator for DefaultErrorTranslator {
    fn translate(&self, err: &StoreError) -> TranslatedError {
        let (title, message) = match err {
            StoreError::PermissionDenied(_) => (
                "Permission denied",
                "You do not have permission to perform this operation.".to_string(),
            ),
            StoreError::NotFound(_) => (
                "Not found",
                "The requested document does not exist.".to_string(),
            ),
            StoreError::FailedPrecondition(_) => (
                "Conflicting change",
                "The document was changed by someone else. Reload it and try again.".to_string(),
            ),
            StoreError::InvalidArgument(detail) => ("Invalid data", detail.clone()),
            StoreError::Unavailable(_) => (
                "Service unavailable",
                "The server could not be reached. Check your connection.".to_string(),
            ),
            StoreError::Serialization(detail) => (
                "Invalid document",
                format!("A stored document could not be read: {detail}"),
            ),
            StoreError::Storage(detail) => ("Internal error", detail.clone()),
        };

        TranslatedError {
            code: err.code().to_string(),
            title: title.to_string(),
            message,
        }
    }
}
