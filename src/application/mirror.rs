use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::StateSlice;
use crate::domain::Person;
use crate::ports::{Document, DocumentStore, ErrorTranslator, SnapshotState, StoreError};

const ID_FIELD: &str = "id";

/// Keeps a state slice in sync with a live backend collection.
///
/// Every subscription snapshot is republished to the slice. Every change of
/// the signed-in identity (and the initial one) triggers a full re-fetch.
pub struct CollectionMirror<T> {
    store: Arc<dyn DocumentStore>,
    translator: Arc<dyn ErrorTranslator>,
    collection_id: String,
    slice: Arc<StateSlice<T>>,
    auth: watch::Receiver<Option<Person>>,
    _doc: PhantomData<fn() -> T>,
}

/// Owns a running mirror. Dropping it tears the subscription down.
pub struct MirrorHandle {
    collection_id: String,
    task: JoinHandle<()>,
}

impl MirrorHandle {
    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for MirrorHandle {
    fn drop(&mut self) {
        tracing::debug!("Stopping mirror of {}", self.collection_id);
        self.task.abort();
    }
}

impl<T> CollectionMirror<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<dyn DocumentStore>,
        translator: Arc<dyn ErrorTranslator>,
        collection_id: impl Into<String>,
        slice: Arc<StateSlice<T>>,
        auth: watch::Receiver<Option<Person>>,
    ) -> Self {
        Self {
            store,
            translator,
            collection_id: collection_id.into(),
            slice,
            auth,
            _doc: PhantomData,
        }
    }

    pub fn spawn(self) -> MirrorHandle {
        let collection_id = self.collection_id.clone();
        let task = tokio::spawn(self.run());
        MirrorHandle {
            collection_id,
            task,
        }
    }

    async fn run(mut self) {
        let mut snapshots = self.store.subscribe(&self.collection_id);
        tracing::debug!("Mirroring collection {}", self.collection_id);

        self.force_refresh().await;
        let initial = snapshots.borrow_and_update().clone();
        self.publish(initial);

        loop {
            tokio::select! {
                biased;
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = snapshots.borrow_and_update().clone();
                    self.publish(state);
                }
                changed = self.auth.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.force_refresh().await;
                }
            }
        }

        tracing::debug!("Mirror of {} finished", self.collection_id);
    }

    fn publish(&self, state: SnapshotState) {
        match state {
            SnapshotState::Pending => self.slice.set_loading(true),
            SnapshotState::Ready(documents) => {
                tracing::debug!(
                    "Snapshot of {} with {} documents",
                    self.collection_id,
                    documents.len()
                );
                match decode::<T>(documents) {
                    Ok(items) => {
                        self.slice.set_data(Some(items));
                        self.slice.set_error(None);
                    }
                    Err(e) => self.fail(e),
                }
                self.slice.set_loading(false);
            }
            SnapshotState::Failed(err) => {
                self.slice.set_data(None);
                self.fail(err);
                self.slice.set_loading(false);
            }
        }
    }

    async fn force_refresh(&mut self) {
        let identity = self.auth.borrow_and_update().clone();

        self.slice.set_loading(true);
        self.slice.set_error(None);
        self.slice.set_data(None);

        if let Some(person) = identity {
            tracing::info!("Refreshing {} for {person}", self.collection_id);
            match self.store.get(&self.collection_id).await {
                Ok(documents) => match decode::<T>(documents) {
                    Ok(items) => self.slice.set_data(Some(items)),
                    Err(e) => self.fail(e),
                },
                Err(e) => self.fail(e),
            }
        }

        self.slice.set_loading(false);
    }

    fn fail(&self, err: StoreError) {
        tracing::warn!("Mirror of {} failed: {err}", self.collection_id);
        self.slice.set_error(Some(self.translator.translate(&err)));
    }
}

fn decode<T: DeserializeOwned>(documents: Vec<Document>) -> Result<Vec<T>, StoreError> {
    documents
        .into_iter()
        .map(|doc| {
            let id = doc.id.clone();
            serde_json::from_value(doc.into_tagged(ID_FIELD))
                .map_err(|e| StoreError::Serialization(format!("document {id}: {e}")))
        })
        .collect()
}
