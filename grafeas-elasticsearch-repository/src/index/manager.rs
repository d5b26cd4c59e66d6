//! Versioned mappings and index creation.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::naming::{
    alias_name, index_name, parse_index_name, DocumentKind, ParsedIndexName, GRAFEAS_META_TYPE,
};
use crate::errors::IndexError;
use crate::interfaces::SearchEngineClient;

/// Version given to kinds without a mapping file.
pub const DEFAULT_MAPPING_VERSION: &str = "v1";

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// A physical index together with the alias that reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedIndexInfo {
    pub index: String,
    pub alias: String,
    pub kind: DocumentKind,
}

/// Mapping of one document kind at one version.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VersionedMapping {
    pub version: String,
    pub mappings: Value,
}

impl VersionedMapping {
    /// Mapping used when no file is provided for a kind: every string is an
    /// unscored keyword.
    pub fn default_mapping() -> Self {
        Self {
            version: DEFAULT_MAPPING_VERSION.to_string(),
            mappings: json!({
                "_meta": { "type": GRAFEAS_META_TYPE },
                "dynamic_templates": [
                    {
                        "strings_as_keywords": {
                            "match_mapping_type": "string",
                            "mapping": { "type": "keyword", "norms": false }
                        }
                    }
                ]
            }),
        }
    }
}

/// Owns the mapping of every document kind and the naming of their indexes.
///
/// Mappings are loaded once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct IndexManager {
    mappings: HashMap<DocumentKind, VersionedMapping>,
}

impl IndexManager {
    /// Build a manager from already-loaded mappings. Missing kinds get the default mapping.
    pub fn new(mappings: HashMap<DocumentKind, VersionedMapping>) -> Result<Self, IndexError> {
        let mut complete = HashMap::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            let mapping = match mappings.get(&kind) {
                Some(mapping) => prepare_mapping(kind, mapping.clone())?,
                None => VersionedMapping::default_mapping(),
            };
            complete.insert(kind, mapping);
        }
        Ok(Self { mappings: complete })
    }

    /// Load `projects.json`, `occurrences.json` and `notes.json` from `dir`.
    ///
    /// Each file holds `{"version": "...", "mappings": {...}}`. Files whose
    /// stem is not a document kind are skipped.
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory containing the mapping files
    ///
    /// # Returns
    ///
    /// * `Ok(IndexManager)` - A manager with a mapping for every kind
    /// * `Err(IndexError::MappingError)` - If the directory or a mapping file cannot be read
    pub fn load_mappings(dir: &Path) -> Result<Self, IndexError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            IndexError::mapping(format!(
                "failed to read mappings directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut mappings = HashMap::new();
        for entry in entries {
            let path = entry
                .map_err(|e| IndexError::mapping(format!("failed to list {}: {}", dir.display(), e)))?
                .path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(kind) = stem.parse::<DocumentKind>() else {
                warn!(file = %path.display(), "Skipping mapping file for unknown document kind");
                continue;
            };

            let contents = fs::read_to_string(&path).map_err(|e| {
                IndexError::mapping(format!("failed to read {}: {}", path.display(), e))
            })?;
            let mapping: VersionedMapping = serde_json::from_str(&contents).map_err(|e| {
                IndexError::mapping(format!("failed to decode {}: {}", path.display(), e))
            })?;
            debug!(kind = %kind, version = %mapping.version, "Loaded mapping");
            mappings.insert(kind, mapping);
        }

        let manager = Self::new(mappings)?;
        info!(
            projects = %manager.latest_version(DocumentKind::Projects),
            occurrences = %manager.latest_version(DocumentKind::Occurrences),
            notes = %manager.latest_version(DocumentKind::Notes),
            "Loaded index mappings"
        );
        Ok(manager)
    }

    /// Current mapping version of `kind`.
    pub fn latest_version(&self, kind: DocumentKind) -> &str {
        self.mappings
            .get(&kind)
            .map(|m| m.version.as_str())
            .unwrap_or(DEFAULT_MAPPING_VERSION)
    }

    /// Current mapping of `kind`.
    pub fn mapping(&self, kind: DocumentKind) -> Result<&Value, IndexError> {
        self.mappings
            .get(&kind)
            .map(|m| &m.mappings)
            .ok_or_else(|| IndexError::MissingMapping(kind.to_string()))
    }

    pub fn projects_index(&self) -> VersionedIndexInfo {
        self.index_info(DocumentKind::Projects, None)
    }

    pub fn occurrences_index(&self, project_id: &str) -> VersionedIndexInfo {
        self.index_info(DocumentKind::Occurrences, Some(project_id))
    }

    pub fn notes_index(&self, project_id: &str) -> VersionedIndexInfo {
        self.index_info(DocumentKind::Notes, Some(project_id))
    }

    fn index_info(&self, kind: DocumentKind, project_id: Option<&str>) -> VersionedIndexInfo {
        VersionedIndexInfo {
            index: index_name(self.latest_version(kind), project_id, kind),
            alias: alias_name(project_id, kind),
            kind,
        }
    }

    /// The name `index` would have under the current mapping version of its kind.
    pub fn increment_index_version(&self, index: &str) -> Result<String, IndexError> {
        let parsed = parse_index_name(index)?;
        Ok(parsed.with_version(self.latest_version(parsed.kind)))
    }

    /// The parsed name of `index` if its version differs from the current one.
    pub fn outdated(&self, index: &str) -> Result<Option<ParsedIndexName>, IndexError> {
        let parsed = parse_index_name(index)?;
        if parsed.version == self.latest_version(parsed.kind) {
            Ok(None)
        } else {
            Ok(Some(parsed))
        }
    }

    /// Create the index described by `info` with its mapping and alias.
    ///
    /// Creation is idempotent: an index that already exists, whether seen by
    /// the existence check or reported by the engine, counts as created.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Cancellation token
    /// * `client` - Engine client
    /// * `info` - Index, alias and kind to create
    /// * `check_exists` - Whether to look for the index before creating it
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index exists afterwards
    /// * `Err(IndexError)` - If the engine rejects the check or the creation
    #[instrument(skip(self, ctx, client, info), fields(index = %info.index))]
    pub async fn create_index(
        &self,
        ctx: &CancellationToken,
        client: &dyn SearchEngineClient,
        info: &VersionedIndexInfo,
        check_exists: bool,
    ) -> Result<(), IndexError> {
        self.create(ctx, client, info, check_exists, true).await
    }

    /// Create the target index of a migration.
    ///
    /// The alias is left off; the migration moves it over atomically once
    /// the documents are copied.
    #[instrument(skip(self, ctx, client, info), fields(index = %info.index))]
    pub async fn create_migration_target(
        &self,
        ctx: &CancellationToken,
        client: &dyn SearchEngineClient,
        info: &VersionedIndexInfo,
    ) -> Result<(), IndexError> {
        self.create(ctx, client, info, true, false).await
    }

    async fn create(
        &self,
        ctx: &CancellationToken,
        client: &dyn SearchEngineClient,
        info: &VersionedIndexInfo,
        check_exists: bool,
        with_alias: bool,
    ) -> Result<(), IndexError> {
        if check_exists && client.index_exists(ctx, &info.index).await? {
            debug!(index = %info.index, "Index already exists");
            return Ok(());
        }

        let mut body = Map::new();
        body.insert("mappings".to_string(), self.mapping(info.kind)?.clone());
        if with_alias {
            let mut aliases = Map::new();
            aliases.insert(info.alias.clone(), json!({}));
            body.insert("aliases".to_string(), Value::Object(aliases));
        }

        match client
            .create_index(ctx, &info.index, Value::Object(body))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.status() == Some(400) && err.has_error_type(ALREADY_EXISTS) => {
                debug!(index = %info.index, "Index was created concurrently");
                Ok(())
            }
            Err(err) => Err(IndexError::from(err)),
        }
    }
}

/// Validate a loaded mapping and mark it as owned by the backend.
fn prepare_mapping(
    kind: DocumentKind,
    mut mapping: VersionedMapping,
) -> Result<VersionedMapping, IndexError> {
    if mapping.version.is_empty() || mapping.version.contains('-') {
        return Err(IndexError::mapping(format!(
            "invalid version '{}' in {} mapping: versions must be non-empty and must not contain '-'",
            mapping.version, kind
        )));
    }

    let Value::Object(mappings) = &mut mapping.mappings else {
        return Err(IndexError::mapping(format!(
            "mappings of {} must be a JSON object",
            kind
        )));
    };
    let meta = mappings
        .entry("_meta".to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    match meta {
        Value::Object(meta) => {
            meta.insert(
                "type".to_string(),
                Value::String(GRAFEAS_META_TYPE.to_string()),
            );
        }
        _ => {
            return Err(IndexError::mapping(format!(
                "_meta of {} mapping must be a JSON object",
                kind
            )))
        }
    }
    Ok(mapping)
}
