use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::StateSlice;
use crate::domain::{self, *};
use crate::ports::{
    Clock, DocumentRef, DocumentStore, DocumentUpdate, ErrorTranslator, Fields, StoreError,
    TranslatedError,
};

pub const MAINT_PROJECTS_COLLECTION: &str = "manut-projects";

const EVENTS_FIELD: &str = "events";
const PRED_PREV_FIELD: &str = "isPredPrev";

/// Outcome of a single remote write. Backend failures arrive already
/// translated; nothing here panics or retries.
pub type DocOperationResult<T> = Result<T, TranslatedError>;

/// Maintenance project helpers over the mirrored `manut-projects` collection.
///
/// Reads default to the mirrored state. Writes go straight to the store and
/// reach readers through the mirror's subscription.
pub struct MaintProjectService {
    store: Arc<dyn DocumentStore>,
    translator: Arc<dyn ErrorTranslator>,
    clock: Arc<dyn Clock>,
    projects: Arc<StateSlice<MaintenanceProject>>,
    collection_id: String,
}

impl MaintProjectService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        translator: Arc<dyn ErrorTranslator>,
        clock: Arc<dyn Clock>,
        projects: Arc<StateSlice<MaintenanceProject>>,
        collection_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            translator,
            clock,
            projects,
            collection_id: collection_id.into(),
        }
    }

    /// Mirrored projects, empty until the first snapshot arrives.
    pub fn projects(&self) -> Vec<MaintenanceProject> {
        self.projects.data()
    }

    fn data_or_mirrored(&self, data: Option<&[MaintenanceProject]>) -> Vec<MaintenanceProject> {
        match data {
            Some(data) => data.to_vec(),
            None => self.projects(),
        }
    }

    pub fn get_next_internal_id(&self) -> Option<u32> {
        next_internal_id(&self.projects())
    }

    pub fn format_internal_id(&self, internal_id: u32) -> String {
        format_internal_id(internal_id)
    }

    pub fn get_by_id(&self, id: &ProjectId) -> Option<MaintenanceProject> {
        self.projects().into_iter().find(|project| &project.id == id)
    }

    pub fn get_project_status(&self, project: &MaintenanceProject) -> ProjectStatus {
        project.status_at(self.clock.now())
    }

    pub fn get_by_status(
        &self,
        filter: impl Into<StatusFilter>,
        data: Option<&[MaintenanceProject]>,
    ) -> Vec<MaintenanceProject> {
        domain::get_by_status(filter, &self.data_or_mirrored(data), self.clock.now())
    }

    pub fn map_by_status(&self, data: Option<&[MaintenanceProject]>) -> StatusGroups {
        domain::map_by_status(&self.data_or_mirrored(data), self.clock.now())
    }

    pub fn sort_by_status(
        &self,
        order: &[ProjectStatus],
        data: Option<&[MaintenanceProject]>,
    ) -> Vec<MaintenanceProject> {
        domain::sort_by_status(order, &self.data_or_mirrored(data), self.clock.now())
    }

    pub fn sort_by_priority(&self, data: Option<&[MaintenanceProject]>) -> Vec<MaintenanceProject> {
        domain::sort_by_priority(&self.data_or_mirrored(data))
    }

    pub async fn add(
        &self,
        internal_id: u32,
        draft: &ProjectDraft,
    ) -> DocOperationResult<DocumentRef> {
        let project = build_project(internal_id, draft, self.clock.now());
        let fields = to_fields(&project).map_err(|e| self.fail("add", e))?;

        let doc = self
            .store
            .add_document(&self.collection_id, fields)
            .await
            .map_err(|e| self.fail("add", e))?;

        tracing::info!("Created project {} as {}", project.code(), doc.id);
        Ok(doc)
    }

    pub async fn share_project_status(
        &self,
        project_id: &ProjectId,
        author: &Person,
        message: &str,
    ) -> DocOperationResult<DocumentRef> {
        let event = ProjectEvent::status(author.clone(), message.to_string(), self.clock.now());
        self.append_event(project_id, event).await
    }

    pub async fn deliver_project(
        &self,
        project_id: &ProjectId,
        author: &Person,
        message: Option<&str>,
    ) -> DocOperationResult<DocumentRef> {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        let event = ProjectEvent::complete(author.clone(), message, self.clock.now());
        self.append_event(project_id, event).await
    }

    /// Rewrites the project's fields from `draft`.
    ///
    /// When the draft's author is not the author of the creation event, the
    /// head of the log is reassigned to them instead of appending an edit.
    pub async fn update(
        &self,
        project_id: &ProjectId,
        internal_id: u32,
        draft: &ProjectDraft,
    ) -> DocOperationResult<DocumentRef> {
        let now = self.clock.now();
        let rebuilt = build_project(internal_id, draft, now);
        let mut update = field_updates(&rebuilt).map_err(|e| self.fail("update", e))?;

        match self.get_by_id(project_id) {
            Some(current) if current.head_author() != Some(&draft.author) => {
                self.reassign_head(&current, &draft.author, update, now).await
            }
            _ => {
                let edit = serialize(&ProjectEvent::edit(draft.author.clone(), now))
                    .map_err(|e| self.fail("update", e))?;
                update = update.array_union(EVENTS_FIELD, vec![edit]);
                self.write(project_id, update, "update").await
            }
        }
    }

    /// Replaces the whole event log with one whose creation event belongs to
    /// `author`, keeping every later event.
    ///
    /// Unlike appends this is not mergeable. The stored log must still hold
    /// the events the mirror showed, and the write is guarded by the exact
    /// stored value so a change landing in between is refused too.
    async fn reassign_head(
        &self,
        current: &MaintenanceProject,
        author: &Person,
        update: DocumentUpdate,
        now: DateTime<Utc>,
    ) -> DocOperationResult<DocumentRef> {
        let stored = self
            .store
            .get_document(&self.collection_id, &current.id.0)
            .await
            .map_err(|e| self.fail("update", e))?;
        let stored_events = stored.fields.get(EVENTS_FIELD).cloned().unwrap_or(Value::Null);

        let log: Vec<ProjectEvent> = serde_json::from_value(stored_events.clone())
            .map_err(|e| self.fail("update", StoreError::Serialization(e.to_string())))?;
        if log != current.events {
            let err = StoreError::FailedPrecondition(format!(
                "events of {} changed since they were mirrored",
                current.id
            ));
            return Err(self.fail("update", err));
        }

        let events = reassigned_events(current, author, now).map_err(|e| self.fail("update", e))?;
        tracing::info!("Reassigning creation of {} to {author}", current.code());

        let update = update
            .set(EVENTS_FIELD, events)
            .guarded_by(EVENTS_FIELD, stored_events);
        self.write(&current.id, update, "update").await
    }

    async fn append_event(
        &self,
        project_id: &ProjectId,
        event: ProjectEvent,
    ) -> DocOperationResult<DocumentRef> {
        let kind = event.kind;
        let value = serialize(&event).map_err(|e| self.fail("append", e))?;
        let update = DocumentUpdate::new().array_union(EVENTS_FIELD, vec![value]);

        tracing::debug!("Appending {kind} event to {project_id}");
        self.write(project_id, update, "append").await
    }

    async fn write(
        &self,
        project_id: &ProjectId,
        update: DocumentUpdate,
        operation: &str,
    ) -> DocOperationResult<DocumentRef> {
        self.store
            .update_document(&self.collection_id, &project_id.0, update)
            .await
            .map_err(|e| self.fail(operation, e))?;

        Ok(DocumentRef {
            collection: self.collection_id.clone(),
            id: project_id.0.clone(),
        })
    }

    fn fail(&self, operation: &str, err: StoreError) -> TranslatedError {
        tracing::warn!("Project {operation} failed: {err}");
        self.translator.translate(&err)
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Stored form of a project. The identifier lives outside the document.
fn to_fields(project: &MaintenanceProject) -> Result<Fields, StoreError> {
    match serialize(project)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Serialization(format!(
            "project serialized to {other}"
        ))),
    }
}

/// Field writes for an edit: every mutable field except the event log.
/// The predictive/preventive flag is removed rather than stored as false.
fn field_updates(rebuilt: &MaintenanceProject) -> Result<DocumentUpdate, StoreError> {
    let mut fields = to_fields(rebuilt)?;
    fields.remove(EVENTS_FIELD);
    fields.remove(PRED_PREV_FIELD);

    let mut update = DocumentUpdate::new();
    for (field, value) in fields {
        update = update.set(field, value);
    }

    update = if rebuilt.is_pred_prev {
        update.set(PRED_PREV_FIELD, Value::Bool(true))
    } else {
        update.delete(PRED_PREV_FIELD)
    };
    Ok(update)
}

/// Full replacement log with a fresh creation head by `author`. Later events
/// are kept untouched.
fn reassigned_events(
    current: &MaintenanceProject,
    author: &Person,
    now: DateTime<Utc>,
) -> Result<Value, StoreError> {
    let mut events = vec![ProjectEvent::create(author.clone(), now)];
    events.extend(current.events.iter().skip(1).cloned());
    serialize(&events)
}
