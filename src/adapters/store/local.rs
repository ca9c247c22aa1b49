use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::ports::{
    Document, DocumentRef, DocumentStore, DocumentUpdate, FieldUpdate, Fields, Precondition,
    SnapshotState, StoreError, StoreResult,
};

type SnapshotFile = BTreeMap<String, BTreeMap<String, Fields>>;

struct Collection {
    documents: BTreeMap<String, Fields>,
    sender: watch::Sender<SnapshotState>,
}

impl Collection {
    fn new(documents: BTreeMap<String, Fields>) -> Self {
        let (sender, _) = watch::channel(SnapshotState::Ready(to_documents(&documents)));
        Self { documents, sender }
    }

    fn publish(&self) {
        self.sender
            .send_replace(SnapshotState::Ready(to_documents(&self.documents)));
    }
}

fn to_documents(documents: &BTreeMap<String, Fields>) -> Vec<Document> {
    documents
        .iter()
        .map(|(id, fields)| Document {
            id: id.clone(),
            fields: fields.clone(),
        })
        .collect()
}

/// In-process document store with live collection subscriptions.
///
/// Writes to a single document are applied under that collection's entry
/// lock, so array unions from concurrent writers never overwrite each other.
/// When opened with a path, the full store is rewritten to that JSON file
/// after every successful write.
pub struct LocalDocumentStore {
    collections: DashMap<String, Collection>,
    snapshot_path: Option<PathBuf>,
    persist_lock: Mutex<()>,
}

impl LocalDocumentStore {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            snapshot_path: None,
            persist_lock: Mutex::new(()),
        }
    }

    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot: SnapshotFile = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SnapshotFile::new(),
            Err(e) => return Err(StoreError::Storage(e.to_string())),
        };

        tracing::debug!(
            "Opened document store at {} ({} collections)",
            path.display(),
            snapshot.len()
        );

        let collections = DashMap::new();
        for (name, documents) in snapshot {
            collections.insert(name, Collection::new(documents));
        }

        Ok(Self {
            collections,
            snapshot_path: Some(path),
            persist_lock: Mutex::new(()),
        })
    }

    async fn persist(&self) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let _guard = self.persist_lock.lock().await;
        let snapshot: SnapshotFile = self
            .collections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().documents.clone()))
            .collect();
        let content = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Storage(e.to_string()))?;
        }
        fs::write(path, content)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

impl Default for LocalDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_path(collection: &str, id: Option<&str>) -> StoreResult<()> {
    if collection.trim().is_empty() {
        return Err(StoreError::InvalidArgument(
            "collection name is empty".to_string(),
        ));
    }
    if id.is_some_and(|id| id.trim().is_empty()) {
        return Err(StoreError::InvalidArgument(format!(
            "empty document id in {collection}"
        )));
    }
    Ok(())
}

fn apply_update(fields: &mut Fields, update: DocumentUpdate) -> StoreResult<()> {
    if let Some(Precondition::FieldEquals { field, value }) = &update.precondition {
        if fields.get(field) != Some(value) {
            return Err(StoreError::FailedPrecondition(format!(
                "field '{field}' changed since it was read"
            )));
        }
    }

    // reject before touching anything so a bad update never half-applies
    for (field, op) in &update.fields {
        if let FieldUpdate::ArrayUnion(_) = op {
            if fields.get(field).is_some_and(|existing| !existing.is_array()) {
                return Err(StoreError::InvalidArgument(format!(
                    "field '{field}' is not an array"
                )));
            }
        }
    }

    for (field, op) in update.fields {
        match op {
            FieldUpdate::Set(value) => {
                fields.insert(field, value);
            }
            FieldUpdate::Delete => {
                fields.remove(&field);
            }
            FieldUpdate::ArrayUnion(values) => {
                let slot = fields.entry(field).or_insert_with(|| Value::Array(Vec::new()));
                if let Value::Array(items) = slot {
                    for value in values {
                        if !items.contains(&value) {
                            items.push(value);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    fn subscribe(&self, collection: &str) -> watch::Receiver<SnapshotState> {
        self.collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection::new(BTreeMap::new()))
            .sender
            .subscribe()
    }

    async fn get(&self, collection: &str) -> StoreResult<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|c| to_documents(&c.documents))
            .unwrap_or_default())
    }

    async fn get_document(&self, collection: &str, id: &str) -> StoreResult<Document> {
        self.collections
            .get(collection)
            .and_then(|c| c.documents.get(id).cloned())
            .map(|fields| Document {
                id: id.to_string(),
                fields,
            })
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> StoreResult<DocumentRef> {
        check_path(collection, None)?;
        let id = Uuid::new_v4().simple().to_string();
        {
            let mut entry = self
                .collections
                .entry(collection.to_string())
                .or_insert_with(|| Collection::new(BTreeMap::new()));
            entry.documents.insert(id.clone(), fields);
            entry.publish();
        }

        tracing::debug!("Added document {collection}/{id}");
        self.persist().await?;

        Ok(DocumentRef {
            collection: collection.to_string(),
            id,
        })
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        update: DocumentUpdate,
    ) -> StoreResult<()> {
        check_path(collection, Some(id))?;
        {
            let mut entry = self
                .collections
                .get_mut(collection)
                .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
            let fields = entry
                .documents
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
            apply_update(fields, update)?;
            entry.publish();
        }

        tracing::debug!("Updated document {collection}/{id}");
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_add_and_get() {
        let store = LocalDocumentStore::new();
        assert!(store.get("things").await.unwrap().is_empty());

        let doc = store
            .add_document("things", fields(json!({"name": "pump"})))
            .await
            .unwrap();
        assert_eq!(doc.collection, "things");

        let docs = store.get("things").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, doc.id);
        assert_eq!(docs[0].fields["name"], "pump");
    }

    #[tokio::test]
    async fn test_subscribers_see_writes() {
        let store = LocalDocumentStore::new();
        let mut rx = store.subscribe("things");
        assert_eq!(*rx.borrow_and_update(), SnapshotState::Ready(Vec::new()));

        store
            .add_document("things", fields(json!({"name": "valve"})))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        match &*rx.borrow() {
            SnapshotState::Ready(docs) => assert_eq!(docs.len(), 1),
            other => panic!("unexpected snapshot {other:?}"),
        };
    }

    #[tokio::test]
    async fn test_array_union_appends_missing_values_only() {
        let store = LocalDocumentStore::new();
        let doc = store
            .add_document("things", fields(json!({"tags": [1, 2]})))
            .await
            .unwrap();

        let update = DocumentUpdate::new().array_union("tags", vec![json!(2), json!(3)]);
        assert_ok!(store.update_document("things", &doc.id, update).await);

        let docs = store.get("things").await.unwrap();
        assert_eq!(docs[0].fields["tags"], json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_set_and_delete_fields() {
        let store = LocalDocumentStore::new();
        let doc = store
            .add_document("things", fields(json!({"a": 1, "b": true})))
            .await
            .unwrap();

        let update = DocumentUpdate::new().set("a", json!(5)).delete("b");
        store.update_document("things", &doc.id, update).await.unwrap();

        let docs = store.get("things").await.unwrap();
        assert_eq!(Value::Object(docs[0].fields.clone()), json!({"a": 5}));
    }

    #[tokio::test]
    async fn test_precondition_rejects_stale_write() {
        let store = LocalDocumentStore::new();
        let doc = store
            .add_document("things", fields(json!({"log": [1]})))
            .await
            .unwrap();

        let stale = DocumentUpdate::new()
            .set("log", json!([9]))
            .guarded_by("log", json!([0]));
        let err = store.update_document("things", &doc.id, stale).await.unwrap_err();
        assert!(matches!(err, StoreError::FailedPrecondition(_)));

        let fresh = DocumentUpdate::new()
            .set("log", json!([9]))
            .guarded_by("log", json!([1]));
        assert_ok!(store.update_document("things", &doc.id, fresh).await);
        assert_eq!(store.get("things").await.unwrap()[0].fields["log"], json!([9]));
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = LocalDocumentStore::new();
        let err = assert_err!(
            store
                .update_document("things", "nope", DocumentUpdate::new())
                .await
        );
        assert_eq!(err, StoreError::NotFound("things/nope".to_string()));
    }

    #[tokio::test]
    async fn test_get_document_returns_stored_fields() {
        let store = LocalDocumentStore::new();
        let doc = store
            .add_document("things", fields(json!({"name": "fan"})))
            .await
            .unwrap();

        let stored = assert_ok!(store.get_document("things", &doc.id).await);
        assert_eq!(stored.id, doc.id);
        assert_eq!(stored.fields["name"], "fan");

        let err = assert_err!(store.get_document("things", "nope").await);
        assert_eq!(err.code(), "not-found");
    }

    #[tokio::test]
    async fn test_union_into_non_array_is_rejected_untouched() {
        let store = LocalDocumentStore::new();
        let doc = store
            .add_document("things", fields(json!({"a": 1, "log": "text"})))
            .await
            .unwrap();

        let update = DocumentUpdate::new()
            .set("a", json!(2))
            .array_union("log", vec![json!(1)]);
        let err = assert_err!(store.update_document("things", &doc.id, update).await);
        assert_eq!(err.code(), "invalid-argument");

        let stored = store.get_document("things", &doc.id).await.unwrap();
        assert_eq!(stored.fields["a"], 1);
        assert_eq!(stored.fields["log"], "text");
    }

    #[tokio::test]
    async fn test_empty_paths_are_invalid() {
        let store = LocalDocumentStore::new();
        let err = assert_err!(store.add_document(" ", Fields::new()).await);
        assert!(matches!(err, StoreError::InvalidArgument(_)));

        let err = assert_err!(
            store
                .update_document("things", "", DocumentUpdate::new())
                .await
        );
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_concurrent_unions_are_not_lost() {
        let store = Arc::new(LocalDocumentStore::new());
        let doc = store
            .add_document("things", fields(json!({"log": []})))
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let id = doc.id.clone();
            tasks.push(tokio::spawn(async move {
                let update = DocumentUpdate::new().array_union("log", vec![json!(i)]);
                store.update_document("things", &id, update).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let docs = store.get("things").await.unwrap();
        assert_eq!(docs[0].fields["log"].as_array().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let id = {
            let store = LocalDocumentStore::open(&path).await.unwrap();
            store
                .add_document("things", fields(json!({"name": "motor"})))
                .await
                .unwrap()
                .id
        };

        let reopened = LocalDocumentStore::open(&path).await.unwrap();
        let docs = reopened.get("things").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert_eq!(docs[0].fields["name"], "motor");
    }
}
