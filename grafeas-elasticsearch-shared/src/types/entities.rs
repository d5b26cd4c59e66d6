//! Grafeas entity types as they are stored in the search engine.
//!
//! Each entity keeps the attributes the storage backend participates in
//! (`name`, `kind`, `noteName`, `createTime`, `updateTime`) as typed fields and
//! carries the remainder of the protobuf-JSON document in `fields`, so that
//! documents written by newer schemas survive a read/write cycle unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection segment used in project names.
pub const PROJECTS_COLLECTION: &str = "projects";

/// Collection segment used in occurrence names.
pub const OCCURRENCES_COLLECTION: &str = "occurrences";

/// Collection segment used in note names.
pub const NOTES_COLLECTION: &str = "notes";

/// A Grafeas project.
///
/// The canonical name is `projects/{projectId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Project {
    /// Build the canonical name of a project.
    pub fn name_for(project_id: &str) -> String {
        format!("{}/{}", PROJECTS_COLLECTION, project_id)
    }
}

/// A Grafeas occurrence: an instance of a note found on a resource.
///
/// The canonical name is `projects/{projectId}/occurrences/{occurrenceId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Name of the note this occurrence is an instance of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Occurrence {
    /// Build the canonical name of an occurrence.
    pub fn name_for(project_id: &str, occurrence_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            PROJECTS_COLLECTION, project_id, OCCURRENCES_COLLECTION, occurrence_id
        )
    }
}

/// A Grafeas note: a high-level description of a piece of metadata.
///
/// The canonical name is `projects/{projectId}/notes/{noteId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Note {
    /// Build the canonical name of a note.
    pub fn name_for(project_id: &str, note_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            PROJECTS_COLLECTION, project_id, NOTES_COLLECTION, note_id
        )
    }

    /// Split a note name into `(projectId, noteId)`.
    ///
    /// Returns `None` unless the name has exactly the shape
    /// `projects/{projectId}/notes/{noteId}` with non-empty ids.
    pub fn parse_name(name: &str) -> Option<(&str, &str)> {
        let mut parts = name.split('/');
        match (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) {
            (Some(PROJECTS_COLLECTION), Some(project_id), Some(NOTES_COLLECTION), Some(note_id), None)
                if !project_id.is_empty() && !note_id.is_empty() =>
            {
                Some((project_id, note_id))
            }
            _ => None,
        }
    }
}

/// Summary of vulnerability occurrences for a project.
///
/// The search backend does not aggregate vulnerabilities, so this is always
/// returned empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityOccurrencesSummary {
    #[serde(default)]
    pub counts: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_names() {
        assert_eq!(Project::name_for("rode"), "projects/rode");
        assert_eq!(
            Occurrence::name_for("rode", "abc"),
            "projects/rode/occurrences/abc"
        );
        assert_eq!(Note::name_for("rode", "cve-1"), "projects/rode/notes/cve-1");
    }

    #[test]
    fn test_parse_note_name() {
        assert_eq!(
            Note::parse_name("projects/rode/notes/cve-1"),
            Some(("rode", "cve-1"))
        );
        assert_eq!(Note::parse_name("projects/rode/occurrences/x"), None);
        assert_eq!(Note::parse_name("projects//notes/x"), None);
        assert_eq!(Note::parse_name("projects/rode/notes/x/extra"), None);
        assert_eq!(Note::parse_name(""), None);
    }

    #[test]
    fn test_occurrence_preserves_unknown_fields() {
        let raw = json!({
            "name": "projects/rode/occurrences/1",
            "kind": "VULNERABILITY",
            "noteName": "projects/rode/notes/cve",
            "resource": { "uri": "git://example" },
            "vulnerability": { "cvssScore": 7.5 }
        });

        let occurrence: Occurrence = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(occurrence.kind.as_deref(), Some("VULNERABILITY"));
        assert_eq!(
            occurrence.note_name.as_deref(),
            Some("projects/rode/notes/cve")
        );
        assert!(occurrence.create_time.is_none());
        assert_eq!(occurrence.fields["resource"]["uri"], "git://example");

        assert_eq!(serde_json::to_value(&occurrence).unwrap(), raw);
    }

    #[test]
    fn test_note_timestamps_parse_rfc3339() {
        let note: Note = serde_json::from_value(json!({
            "name": "projects/rode/notes/cve",
            "createTime": "2021-01-01T00:00:00Z",
            "updateTime": "2021-01-02T12:30:00.5Z"
        }))
        .unwrap();

        assert_eq!(note.create_time.unwrap().timestamp(), 1_609_459_200);
        assert!(note.update_time.is_some());
        assert!(note.fields.is_empty());
    }

    #[test]
    fn test_empty_project_serializes_to_empty_object() {
        let project = Project::default();
        assert_eq!(serde_json::to_value(&project).unwrap(), json!({}));
    }
}
