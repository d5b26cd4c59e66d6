//! Field mask carried by update operations.

use serde::{Deserialize, Serialize};

/// A set of dotted field paths selecting which parts of a patch are applied
/// during an update, e.g. `["vulnerability.cvss_score", "remediation"]`.
///
/// Paths may use either the protobuf field name (`cvss_score`) or its JSON
/// name (`cvssScore`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMask {
    #[serde(default)]
    pub paths: Vec<String>,
}

impl FieldMask {
    /// Create a field mask from a list of paths.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the mask selects no paths.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
