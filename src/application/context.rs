use std::sync::Arc;

use super::{
    AuthState, CollectionMirror, MaintProjectService, MirrorHandle, StateSlice,
    MAINT_PROJECTS_COLLECTION,
};
use crate::domain::{resolve_collection_id, MaintenanceProject, StdDocument};
use crate::ports::{AppConfig, Clock, DocumentStore, ErrorTranslator};

pub const STD_DOCS_COLLECTION: &str = "docs-std";

/// Application-wide state and collaborators, created once at start-up and
/// handed to every component that needs them.
pub struct AppContext {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub translator: Arc<dyn ErrorTranslator>,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthState,
    pub maint_projects: Arc<StateSlice<MaintenanceProject>>,
    pub std_docs: Arc<StateSlice<StdDocument>>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        translator: Arc<dyn ErrorTranslator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            translator,
            clock,
            auth: AuthState::new(),
            maint_projects: Arc::new(StateSlice::new()),
            std_docs: Arc::new(StateSlice::new()),
        }
    }

    pub fn collection_id(&self, name: &str) -> String {
        resolve_collection_id(name, self.config.environment)
    }

    /// Starts the mirrors for every collection the app keeps in state.
    /// Mirrors stop when their handles are dropped.
    pub fn spawn_controllers(&self) -> Vec<MirrorHandle> {
        vec![
            self.mirror(MAINT_PROJECTS_COLLECTION, self.maint_projects.clone()),
            self.mirror(STD_DOCS_COLLECTION, self.std_docs.clone()),
        ]
    }

    fn mirror<T>(&self, name: &str, slice: Arc<StateSlice<T>>) -> MirrorHandle
    where
        T: serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
    {
        CollectionMirror::new(
            self.store.clone(),
            self.translator.clone(),
            self.collection_id(name),
            slice,
            self.auth.subscribe(),
        )
        .spawn()
    }

    pub fn maint_projects_service(&self) -> MaintProjectService {
        MaintProjectService::new(
            self.store.clone(),
            self.translator.clone(),
            self.clock.clone(),
            self.maint_projects.clone(),
            self.collection_id(MAINT_PROJECTS_COLLECTION),
        )
    }
}
