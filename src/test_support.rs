//! Fixtures shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{EventKind, MaintenanceProject, Person, Priority, ProjectDraft, ProjectEvent, ProjectId};
use crate::ports::Clock;

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Midnight UTC on the given day.
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// A project created by `"ana"` followed by events of the given kinds.
pub fn project(internal_id: u32, eta: DateTime<Utc>, kinds: &[EventKind]) -> MaintenanceProject {
    let created = eta - chrono::Duration::days(30);
    let mut events = vec![ProjectEvent::create(Person::from("ana"), created)];
    for (offset, kind) in kinds.iter().enumerate() {
        events.push(ProjectEvent::new(
            *kind,
            Person::from("rui"),
            Some(format!("event {offset}")),
            created + chrono::Duration::hours(offset as i64 + 1),
        ));
    }

    MaintenanceProject {
        id: ProjectId(format!("doc-{internal_id}")),
        internal_id,
        title: format!("Project {internal_id}"),
        description: String::new(),
        requester: Person::from("maintenance"),
        team: None,
        priority: Priority::Medium,
        eta,
        is_pred_prev: false,
        events,
    }
}

pub fn draft(author: &str, eta: DateTime<Utc>) -> ProjectDraft {
    ProjectDraft {
        title: "Inspect boiler".to_string(),
        description: "Yearly inspection".to_string(),
        requester: Person::from("production"),
        team: Some("mechanical".to_string()),
        priority: Priority::High,
        eta,
        is_pred_prev: false,
        author: Person::from(author),
    }
}
