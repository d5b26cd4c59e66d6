//! Index lifecycle.
//!
//! Naming of physical indexes and aliases, loading of versioned mappings, and
//! idempotent index creation.

mod manager;
mod naming;

pub use manager::{IndexManager, VersionedIndexInfo, VersionedMapping, DEFAULT_MAPPING_VERSION};
pub use naming::{
    alias_name, all_projects_pattern, index_name, parse_index_name, DocumentKind,
    ParsedIndexName, GRAFEAS_META_TYPE, INDEX_PREFIX,
};
