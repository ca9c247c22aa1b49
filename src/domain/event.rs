use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Person;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Create,
    Edit,
    Status,
    Complete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Create => "create",
            EventKind::Edit => "edit",
            EventKind::Status => "status",
            EventKind::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// An entry in a project's history. Events are never edited once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub author: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProjectEvent {
    pub fn new(
        kind: EventKind,
        author: Person,
        message: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            author,
            message,
            timestamp,
        }
    }

    pub fn create(author: Person, timestamp: DateTime<Utc>) -> Self {
        Self::new(EventKind::Create, author, None, timestamp)
    }

    pub fn edit(author: Person, timestamp: DateTime<Utc>) -> Self {
        Self::new(EventKind::Edit, author, None, timestamp)
    }

    pub fn status(author: Person, message: String, timestamp: DateTime<Utc>) -> Self {
        Self::new(EventKind::Status, author, Some(message), timestamp)
    }

    pub fn complete(author: Person, message: Option<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(EventKind::Complete, author, message, timestamp)
    }

    /// Whether this event closes the project.
    pub fn is_completion(&self) -> bool {
        match self.kind {
            EventKind::Complete => true,
            EventKind::Create | EventKind::Edit | EventKind::Status => false,
        }
    }
}
