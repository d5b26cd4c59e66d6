//! Query DSL types.
//!
//! A small, typed subset of the engine's JSON query language: the node types
//! produced by the filter translator plus sorting. Every [`Query`] serializes
//! to a single-key object such as `{"term": {...}}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A query tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Bool(BoolQuery),
    /// Exact match of a field against a value.
    Term(BTreeMap<String, Value>),
    /// Prefix match of a keyword field.
    Prefix(BTreeMap<String, Value>),
    QueryString(QueryStringQuery),
    Range(BTreeMap<String, RangeBounds>),
    Nested(NestedQuery),
}

impl Query {
    /// `{"term": {field: value}}`
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term(BTreeMap::from([(field.into(), value.into())]))
    }

    /// `{"prefix": {field: value}}`
    pub fn prefix(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Prefix(BTreeMap::from([(field.into(), value.into())]))
    }

    /// `{"range": {field: bounds}}`
    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        Self::Range(BTreeMap::from([(field.into(), bounds)]))
    }

    /// `{"bool": {"must": queries}}`
    pub fn must(queries: Vec<Query>) -> Self {
        Self::Bool(BoolQuery {
            must: queries,
            ..BoolQuery::default()
        })
    }

    /// `{"bool": {"should": queries}}`
    pub fn should(queries: Vec<Query>) -> Self {
        Self::Bool(BoolQuery {
            should: queries,
            ..BoolQuery::default()
        })
    }

    /// `{"bool": {"must_not": queries}}`
    pub fn must_not(queries: Vec<Query>) -> Self {
        Self::Bool(BoolQuery {
            must_not: queries,
            ..BoolQuery::default()
        })
    }

    /// `{"nested": {"path": path, "query": query}}`
    pub fn nested(path: impl Into<String>, query: Query) -> Self {
        Self::Nested(NestedQuery {
            path: path.into(),
            query: Box::new(query),
        })
    }
}

/// Boolean combination of queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Query>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Query>,
}

/// Lucene query-string query scoped to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStringQuery {
    pub default_field: String,
    pub query: String,
}

/// Bounds of a range query. Unset bounds are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
}

/// Query over an object-nested field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedQuery {
    pub path: String,
    pub query: Box<Query>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort order of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub order: SortOrder,
}

/// A sort clause, serialized as `[{field: {"order": ...}}, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort(pub Vec<BTreeMap<String, SortField>>);

impl Sort {
    /// Sort by a single field.
    pub fn by(field: impl Into<String>, order: SortOrder) -> Self {
        Self(vec![BTreeMap::from([(field.into(), SortField { order })])])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
