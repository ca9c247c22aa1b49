use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;

pub type Fields = Map<String, Value>;

/// Failures reported by a document store.
///
/// The local store raises `NotFound`, `FailedPrecondition`, `InvalidArgument`,
/// `Serialization` and `Storage`. `PermissionDenied` and `Unavailable` come
/// from remote backends (security rules, lost connection).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[allow(dead_code)]
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    FailedPrecondition(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[allow(dead_code)]
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Stable machine-readable code, shared with the error translator.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::PermissionDenied(_) => "permission-denied",
            StoreError::NotFound(_) => "not-found",
            StoreError::FailedPrecondition(_) => "aborted",
            StoreError::InvalidArgument(_) => "invalid-argument",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Serialization(_) => "invalid-document",
            StoreError::Storage(_) => "internal",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Document data with its identifier written into `id_field`.
    pub fn into_tagged(self, id_field: &str) -> Value {
        let mut fields = self.fields;
        fields.insert(id_field.to_string(), Value::String(self.id));
        Value::Object(fields)
    }
}

/// Handle to a written document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

/// State of a live collection subscription.
///
/// The local store always has its data at hand and only publishes `Ready`.
/// A remote backend starts `Pending` until its first snapshot arrives and
/// reports a broken listener as `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotState {
    #[allow(dead_code)]
    Pending,
    Ready(Vec<Document>),
    #[allow(dead_code)]
    Failed(StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(Value),
    /// Adds each value not already present in the array field.
    ArrayUnion(Vec<Value>),
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    FieldEquals { field: String, value: Value },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub fields: Vec<(String, FieldUpdate)>,
    pub precondition: Option<Precondition>,
}

impl DocumentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.push((field.into(), FieldUpdate::Set(value)));
        self
    }

    pub fn array_union(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.fields.push((field.into(), FieldUpdate::ArrayUnion(values)));
        self
    }

    pub fn delete(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), FieldUpdate::Delete));
        self
    }

    /// Reject the write unless `field` still holds `value`.
    pub fn guarded_by(mut self, field: impl Into<String>, value: Value) -> Self {
        self.precondition = Some(Precondition::FieldEquals {
            field: field.into(),
            value,
        });
        self
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&FieldUpdate> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, update)| update)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn subscribe(&self, collection: &str) -> watch::Receiver<SnapshotState>;
    async fn get(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// One document as currently stored, `NotFound` when it does not exist.
    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document>;
    async fn add_document(&self, collection: &str, fields: Fields) -> StoreResult<DocumentRef>;
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        update: DocumentUpdate,
    ) -> StoreResult<()>;
}
