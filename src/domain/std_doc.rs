use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A controlled standard document (procedure, instruction, form...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdDocument {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub revision_interval_days: Option<u32>,
    #[serde(default)]
    pub next_revision_at: Option<DateTime<Utc>>,
}

impl StdDocument {
    pub fn is_revision_due(&self, now: DateTime<Utc>) -> bool {
        self.next_revision_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::at;
    use serde_json::json;

    #[test]
    fn test_decode_std_document() {
        let doc: StdDocument = serde_json::from_value(json!({
            "id": "d1",
            "type": "procedure",
            "code": "PQ-001",
            "title": "Lubrication",
            "version": 3,
            "nextRevisionAt": "2023-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(doc.kind, "procedure");
        assert_eq!(doc.version, 3);
        assert!(doc.is_revision_due(at(2023, 2, 1)));
        assert!(!doc.is_revision_due(at(2022, 12, 1)));
    }
}
