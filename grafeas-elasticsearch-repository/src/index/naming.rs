//! Index and alias naming.
//!
//! Physical indexes are named `grafeas-<version>[-<projectId>]-<kind>` and are
//! reached through aliases without the version, `grafeas[-<projectId>]-<kind>`.

use std::fmt;
use std::str::FromStr;

use crate::errors::IndexError;

/// Prefix of every index and alias owned by the backend.
pub const INDEX_PREFIX: &str = "grafeas";

/// Value of `_meta.type` in the mapping of every owned index.
pub const GRAFEAS_META_TYPE: &str = "grafeas";

/// Kind of document stored in an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    Projects,
    Occurrences,
    Notes,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [Self::Projects, Self::Occurrences, Self::Notes];

    /// The kind's name, used as the index suffix and mapping file stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Occurrences => "occurrences",
            Self::Notes => "notes",
        }
    }

    /// Whether indexes of this kind belong to a single project.
    pub fn is_per_project(&self) -> bool {
        !matches!(self, Self::Projects)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "projects" => Ok(Self::Projects),
            "occurrences" => Ok(Self::Occurrences),
            "notes" => Ok(Self::Notes),
            other => Err(IndexError::mapping(format!(
                "unknown document kind '{}'",
                other
            ))),
        }
    }
}

/// Components of a physical index name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIndexName {
    pub version: String,
    pub project_id: Option<String>,
    pub kind: DocumentKind,
}

impl ParsedIndexName {
    /// The alias that resolves to this index.
    pub fn alias(&self) -> String {
        alias_name(self.project_id.as_deref(), self.kind)
    }

    /// The physical name of this index under another version.
    pub fn with_version(&self, version: &str) -> String {
        index_name(version, self.project_id.as_deref(), self.kind)
    }
}

/// Physical index name for a version, project and kind.
pub fn index_name(version: &str, project_id: Option<&str>, kind: DocumentKind) -> String {
    match project_id {
        Some(project_id) => format!("{}-{}-{}-{}", INDEX_PREFIX, version, project_id, kind),
        None => format!("{}-{}-{}", INDEX_PREFIX, version, kind),
    }
}

/// Alias for a project's collection of `kind`, or the projects alias.
pub fn alias_name(project_id: Option<&str>, kind: DocumentKind) -> String {
    match project_id {
        Some(project_id) => format!("{}-{}-{}", INDEX_PREFIX, project_id, kind),
        None => format!("{}-{}", INDEX_PREFIX, kind),
    }
}

/// Pattern matching the aliases of every project's collection of `kind`.
pub fn all_projects_pattern(kind: DocumentKind) -> String {
    format!("{}-*-{}", INDEX_PREFIX, kind)
}

/// Split a physical index name into version, project and kind.
///
/// The last segment is the kind, the second is the version, and anything in
/// between is the project id, which may itself contain `-`.
pub fn parse_index_name(name: &str) -> Result<ParsedIndexName, IndexError> {
    let segments: Vec<&str> = name.split('-').collect();
    let invalid = || IndexError::invalid_index_name(name);

    if segments.len() < 3 || segments[0] != INDEX_PREFIX {
        return Err(invalid());
    }
    let kind: DocumentKind = segments[segments.len() - 1]
        .parse()
        .map_err(|_| invalid())?;
    let version = segments[1];
    if version.is_empty() {
        return Err(invalid());
    }

    let middle = &segments[2..segments.len() - 1];
    let project_id = if middle.is_empty() {
        None
    } else {
        Some(middle.join("-"))
    };

    match (kind.is_per_project(), &project_id) {
        (true, Some(id)) if !id.is_empty() => {}
        (false, None) => {}
        _ => return Err(invalid()),
    }

    Ok(ParsedIndexName {
        version: version.to_string(),
        project_id,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_and_alias_names() {
        assert_eq!(
            index_name("v1", None, DocumentKind::Projects),
            "grafeas-v1-projects"
        );
        assert_eq!(
            index_name("v1", Some("rode"), DocumentKind::Occurrences),
            "grafeas-v1-rode-occurrences"
        );
        assert_eq!(alias_name(None, DocumentKind::Projects), "grafeas-projects");
        assert_eq!(
            alias_name(Some("rode"), DocumentKind::Notes),
            "grafeas-rode-notes"
        );
        assert_eq!(
            all_projects_pattern(DocumentKind::Occurrences),
            "grafeas-*-occurrences"
        );
    }

    #[test]
    fn test_parse_index_name() {
        assert_eq!(
            parse_index_name("grafeas-v1beta1-rode-occurrences").unwrap(),
            ParsedIndexName {
                version: "v1beta1".to_string(),
                project_id: Some("rode".to_string()),
                kind: DocumentKind::Occurrences,
            }
        );
        assert_eq!(
            parse_index_name("grafeas-v2-projects").unwrap(),
            ParsedIndexName {
                version: "v2".to_string(),
                project_id: None,
                kind: DocumentKind::Projects,
            }
        );
    }

    #[test]
    fn test_parse_project_id_with_dashes() {
        let parsed = parse_index_name("grafeas-v1-my-cool-project-notes").unwrap();
        assert_eq!(parsed.project_id.as_deref(), Some("my-cool-project"));
        assert_eq!(parsed.kind, DocumentKind::Notes);
        assert_eq!(parsed.alias(), "grafeas-my-cool-project-notes");
        assert_eq!(parsed.with_version("v3"), "grafeas-v3-my-cool-project-notes");
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        for name in [
            "grafeas-projects",
            "grafeas-v1-rode-widgets",
            "other-v1-rode-notes",
            "grafeas--projects",
            "grafeas-v1-notes",
            "grafeas-v1-rode-projects",
            ".tasks",
        ] {
            assert!(
                matches!(parse_index_name(name), Err(IndexError::InvalidIndexName(_))),
                "expected {} to be rejected",
                name
            );
        }
    }

    #[test]
    fn test_document_kind_from_str() {
        for kind in DocumentKind::ALL {
            assert_eq!(kind.as_str().parse::<DocumentKind>().unwrap(), kind);
        }
        assert!("widgets".parse::<DocumentKind>().is_err());
    }
}
