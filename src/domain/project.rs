use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{DomainError, DomainResult, Person, ProjectEvent};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        ProjectId(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        ProjectId(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Sorting weight, higher first.
    pub fn weight(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(DomainError::InvalidPriority(other.to_string())),
        }
    }
}

/// Lifecycle status of a project. Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Finished,
    Late,
    Running,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::Finished,
        ProjectStatus::Late,
        ProjectStatus::Running,
    ];
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectStatus::Finished => "finished",
            ProjectStatus::Late => "late",
            ProjectStatus::Running => "running",
        };
        f.write_str(name)
    }
}

impl FromStr for ProjectStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "finished" => Ok(ProjectStatus::Finished),
            "late" => Ok(ProjectStatus::Late),
            "running" => Ok(ProjectStatus::Running),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceProject {
    #[serde(default)]
    pub id: ProjectId,
    pub internal_id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub requester: Person,
    #[serde(default)]
    pub team: Option<String>,
    pub priority: Priority,
    pub eta: DateTime<Utc>,
    #[serde(default)]
    pub is_pred_prev: bool,
    pub events: Vec<ProjectEvent>,
}

impl MaintenanceProject {
    pub fn status_at(&self, now: DateTime<Utc>) -> ProjectStatus {
        project_status(&self.events, self.eta, now)
    }

    /// Author of the creation event at the head of the log.
    pub fn head_author(&self) -> Option<&Person> {
        self.events.first().map(|ev| &ev.author)
    }

    pub fn code(&self) -> String {
        format_internal_id(self.internal_id)
    }
}

/// Input payload shared by project creation and edits.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub requester: Person,
    pub team: Option<String>,
    pub priority: Priority,
    pub eta: DateTime<Utc>,
    pub is_pred_prev: bool,
    pub author: Person,
}

impl ProjectDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::MissingField("title".to_string()));
        }
        if self.requester.0.trim().is_empty() {
            return Err(DomainError::MissingField("requester".to_string()));
        }
        if self.author.0.trim().is_empty() {
            return Err(DomainError::MissingField("author".to_string()));
        }
        Ok(())
    }

    /// Draft that reproduces an existing project's fields, edited by `author`.
    pub fn from_project(project: &MaintenanceProject, author: Person) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
            requester: project.requester.clone(),
            team: project.team.clone(),
            priority: project.priority,
            eta: project.eta,
            is_pred_prev: project.is_pred_prev,
            author,
        }
    }
}

/// Builds a new project record whose log holds a single creation event.
pub fn build_project(
    internal_id: u32,
    draft: &ProjectDraft,
    created_at: DateTime<Utc>,
) -> MaintenanceProject {
    MaintenanceProject {
        id: ProjectId::default(),
        internal_id,
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        requester: draft.requester.clone(),
        team: draft.team.clone(),
        priority: draft.priority,
        eta: draft.eta,
        is_pred_prev: draft.is_pred_prev,
        events: vec![ProjectEvent::create(draft.author.clone(), created_at)],
    }
}

pub fn project_status(
    events: &[ProjectEvent],
    eta: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ProjectStatus {
    if events.iter().any(ProjectEvent::is_completion) {
        ProjectStatus::Finished
    } else if eta < now {
        ProjectStatus::Late
    } else {
        ProjectStatus::Running
    }
}

/// One status or a set of statuses to match against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFilter(Vec<ProjectStatus>);

impl StatusFilter {
    pub fn contains(&self, status: ProjectStatus) -> bool {
        self.0.contains(&status)
    }
}

impl From<ProjectStatus> for StatusFilter {
    fn from(status: ProjectStatus) -> Self {
        StatusFilter(vec![status])
    }
}

impl From<Vec<ProjectStatus>> for StatusFilter {
    fn from(statuses: Vec<ProjectStatus>) -> Self {
        StatusFilter(statuses)
    }
}

impl From<&[ProjectStatus]> for StatusFilter {
    fn from(statuses: &[ProjectStatus]) -> Self {
        StatusFilter(statuses.to_vec())
    }
}

impl<const N: usize> From<[ProjectStatus; N]> for StatusFilter {
    fn from(statuses: [ProjectStatus; N]) -> Self {
        StatusFilter(statuses.to_vec())
    }
}

pub fn get_by_status(
    filter: impl Into<StatusFilter>,
    data: &[MaintenanceProject],
    now: DateTime<Utc>,
) -> Vec<MaintenanceProject> {
    let filter = filter.into();
    data.iter()
        .filter(|project| filter.contains(project.status_at(now)))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusGroups {
    pub finished: Vec<MaintenanceProject>,
    pub late: Vec<MaintenanceProject>,
    pub running: Vec<MaintenanceProject>,
}

impl StatusGroups {
    pub fn get(&self, status: ProjectStatus) -> &[MaintenanceProject] {
        match status {
            ProjectStatus::Finished => &self.finished,
            ProjectStatus::Late => &self.late,
            ProjectStatus::Running => &self.running,
        }
    }
}

pub fn map_by_status(data: &[MaintenanceProject], now: DateTime<Utc>) -> StatusGroups {
    StatusGroups {
        finished: get_by_status(ProjectStatus::Finished, data, now),
        late: get_by_status(ProjectStatus::Late, data, now),
        running: get_by_status(ProjectStatus::Running, data, now),
    }
}

/// Concatenates the status groups in `order`, newest internal id first within
/// each group. Statuses left out of `order` are dropped.
pub fn sort_by_status(
    order: &[ProjectStatus],
    data: &[MaintenanceProject],
    now: DateTime<Utc>,
) -> Vec<MaintenanceProject> {
    let groups = map_by_status(data, now);
    order
        .iter()
        .flat_map(|&status| {
            let mut group = groups.get(status).to_vec();
            group.sort_by(|a, b| b.internal_id.cmp(&a.internal_id));
            group
        })
        .collect()
}

/// Highest priority first. The sort is stable: equal priorities keep the
/// order they had in `data`.
pub fn sort_by_priority(data: &[MaintenanceProject]) -> Vec<MaintenanceProject> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight()));
    sorted
}

pub fn next_internal_id(data: &[MaintenanceProject]) -> Option<u32> {
    data.iter()
        .map(|project| project.internal_id)
        .max()
        .and_then(|last| last.checked_add(1))
}

pub fn format_internal_id(internal_id: u32) -> String {
    format!("PR-{internal_id:04}")
}
