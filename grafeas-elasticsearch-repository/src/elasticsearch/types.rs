//! Request and response types for the search engine client.
//!
//! Requests are plain structs built by the storage facade and the migrator.
//! Responses are deserialized from the engine's JSON and reduced to the
//! fields the callers use.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RefreshOption;
use crate::dsl::{Query, Sort};

/// Parent-child join declaration for a document.
///
/// Merged into the document body as `{field: {name, parent?}}`; when `parent`
/// is set the request is routed to the parent's shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsJoin {
    pub field: String,
    pub name: String,
    pub parent: Option<String>,
}

impl EsJoin {
    /// The JSON merge patch this join contributes to a document body.
    pub fn patch(&self) -> Value {
        let mut relation = Map::new();
        relation.insert("name".to_string(), Value::String(self.name.clone()));
        if let Some(parent) = &self.parent {
            relation.insert("parent".to_string(), Value::String(parent.clone()));
        }
        let mut patch = Map::new();
        patch.insert(self.field.clone(), Value::Object(relation));
        Value::Object(patch)
    }
}

/// A single document to index.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub index: String,
    pub document: Value,
    /// Caller-chosen id; the engine assigns one when unset.
    pub document_id: Option<String>,
    pub routing: Option<String>,
    pub join: Option<EsJoin>,
    pub refresh: RefreshOption,
}

impl CreateRequest {
    pub fn new(index: impl Into<String>, document: Value, refresh: RefreshOption) -> Self {
        Self {
            index: index.into(),
            document,
            document_id: None,
            routing: None,
            join: None,
            refresh,
        }
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }
}

/// One item of a bulk create.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkCreateItem {
    pub document: Value,
    pub document_id: Option<String>,
    pub routing: Option<String>,
    pub join: Option<EsJoin>,
}

impl BulkCreateItem {
    pub fn new(document: Value) -> Self {
        Self {
            document,
            document_id: None,
            routing: None,
            join: None,
        }
    }

    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }
}

/// A batch of documents indexed in one `_bulk` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkCreateRequest {
    pub index: String,
    pub items: Vec<BulkCreateItem>,
    pub refresh: RefreshOption,
}

/// Per-item outcome of a bulk create, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub id: Option<String>,
    pub status: u16,
    pub error: Option<BulkItemError>,
}

impl BulkItemResult {
    /// Whether the engine created the document.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// Error reported for a single bulk item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BulkItemError {
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub reason: String,
}

/// Page size and resume token of a paginated search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub size: usize,
    /// Empty on the first page.
    pub token: String,
}

/// A search against an index or alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub index: String,
    /// `None` matches every document.
    pub query: Option<Query>,
    pub sort: Sort,
    pub pagination: Option<Pagination>,
}

impl SearchRequest {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: Option<Query>) -> Self {
        self.query = query;
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_pagination(mut self, pagination: Option<Pagination>) -> Self {
        self.pagination = pagination;
        self
    }
}

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// Hits of one search, plus the token of the next page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total: u64,
    /// Empty when there are no further pages or the search was not paginated.
    pub next_page_token: String,
}

/// A document fetched by id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetResponse {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
}

/// Overwrite of a document by id.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub index: String,
    pub document_id: String,
    pub document: Value,
    pub refresh: RefreshOption,
}

/// Delete of every document matching `query`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    pub index: String,
    pub query: Query,
    pub refresh: RefreshOption,
}

/// Result of placing a write block on an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WriteBlockResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub shards_acknowledged: bool,
}

/// Status of an asynchronous engine task.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Mapping of one physical index as listed by `GET /_mapping`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMapping {
    #[serde(default)]
    pub mappings: Value,
}

impl IndexMapping {
    /// The `_meta.type` marker of the mapping, if any.
    pub fn meta_type(&self) -> Option<&str> {
        self.mappings.get("_meta")?.get("type")?.as_str()
    }
}

/// All index mappings keyed by physical index name, in name order.
pub type Mappings = BTreeMap<String, IndexMapping>;
