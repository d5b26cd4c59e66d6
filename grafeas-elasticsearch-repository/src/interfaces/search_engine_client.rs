//! Search engine client trait definition.
//!
//! This module defines the operations the storage facade, the index manager
//! and the migrator need from an Elasticsearch-compatible engine.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::dsl::Query;
use crate::elasticsearch::types::{
    BulkCreateRequest, BulkItemResult, CreateRequest, DeleteRequest, GetResponse, Mappings,
    SearchRequest, SearchResponse, TaskStatus, UpdateRequest, WriteBlockResponse,
};
use crate::errors::EngineError;

/// Abstracts the REST surface of the search engine.
///
/// Every method races the request against `ctx` and returns
/// [`EngineError::Cancelled`] once it fires. Implementations hold no
/// per-request state and are shared between tasks behind an `Arc`.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Index a single document.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The engine-assigned or caller-supplied document id
    /// * `Err(EngineError::InvalidArgument)` - If both a join and a routing key are given
    /// * `Err(EngineError)` - If the engine rejects the document
    async fn create(
        &self,
        ctx: &CancellationToken,
        request: CreateRequest,
    ) -> Result<String, EngineError>;

    /// Index several documents with one `_bulk` call.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<BulkItemResult>)` - One result per item, in request order
    /// * `Err(EngineError)` - If the request as a whole failed
    async fn bulk_create(
        &self,
        ctx: &CancellationToken,
        request: BulkCreateRequest,
    ) -> Result<Vec<BulkItemResult>, EngineError>;

    /// Run a search, paginated through a point-in-time when requested.
    ///
    /// Without pagination a single page of at most 1000 hits is returned and
    /// the next page token is empty.
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResponse)` - Hits and the next page token
    /// * `Err(EngineError::InvalidArgument)` - If the page token is malformed
    async fn search(
        &self,
        ctx: &CancellationToken,
        request: SearchRequest,
    ) -> Result<SearchResponse, EngineError>;

    /// Run several unpaginated searches against `index` in one `_msearch` call.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SearchResponse>)` - One response per query, in request order
    async fn multi_search(
        &self,
        ctx: &CancellationToken,
        index: &str,
        queries: &[Option<Query>],
    ) -> Result<Vec<SearchResponse>, EngineError>;

    /// Fetch a document by id. A missing document is reported with `found: false`.
    async fn get(
        &self,
        ctx: &CancellationToken,
        index: &str,
        id: &str,
    ) -> Result<GetResponse, EngineError>;

    /// Fetch several documents by id, one entry per requested id.
    async fn multi_get(
        &self,
        ctx: &CancellationToken,
        index: &str,
        ids: &[String],
    ) -> Result<Vec<GetResponse>, EngineError>;

    /// Overwrite a document by id.
    async fn update(&self, ctx: &CancellationToken, request: UpdateRequest)
        -> Result<(), EngineError>;

    /// Delete every document matching a query.
    ///
    /// # Returns
    ///
    /// * `Ok(u64)` - The number of deleted documents, never zero
    /// * `Err(EngineError::NothingDeleted)` - If no document matched
    async fn delete(&self, ctx: &CancellationToken, request: DeleteRequest)
        -> Result<u64, EngineError>;

    /// Whether an index or alias exists.
    async fn index_exists(&self, ctx: &CancellationToken, index: &str)
        -> Result<bool, EngineError>;

    /// Create an index with the given body (`mappings`, `aliases`, `settings`).
    async fn create_index(
        &self,
        ctx: &CancellationToken,
        index: &str,
        body: Value,
    ) -> Result<(), EngineError>;

    /// The `settings` object of an index, e.g. `{"index": {"blocks": {"write": "true"}}}`.
    async fn get_index_settings(
        &self,
        ctx: &CancellationToken,
        index: &str,
    ) -> Result<Value, EngineError>;

    /// Make an index read-only.
    async fn add_write_block(
        &self,
        ctx: &CancellationToken,
        index: &str,
    ) -> Result<WriteBlockResponse, EngineError>;

    /// Start copying every document of `source` into `dest` as a background task.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(String))` - The id of the reindex task
    /// * `Ok(None)` - If the engine accepted the request without naming a task
    async fn reindex(
        &self,
        ctx: &CancellationToken,
        source: &str,
        dest: &str,
    ) -> Result<Option<String>, EngineError>;

    /// Status of a background task.
    async fn get_task(&self, ctx: &CancellationToken, task: &str)
        -> Result<TaskStatus, EngineError>;

    /// Remove the stored result of a completed task.
    async fn delete_task_document(
        &self,
        ctx: &CancellationToken,
        task: &str,
    ) -> Result<(), EngineError>;

    /// Physical indexes `alias` points at, empty if the alias does not exist.
    async fn get_alias(&self, ctx: &CancellationToken, alias: &str)
        -> Result<Vec<String>, EngineError>;

    /// Atomically move `alias` from index `from` to index `to`.
    async fn swap_alias(
        &self,
        ctx: &CancellationToken,
        alias: &str,
        from: &str,
        to: &str,
    ) -> Result<(), EngineError>;

    /// Delete an index. Deleting a missing index succeeds.
    async fn delete_index(&self, ctx: &CancellationToken, index: &str)
        -> Result<(), EngineError>;

    /// Mappings of every index in the cluster.
    async fn get_mappings(&self, ctx: &CancellationToken) -> Result<Mappings, EngineError>;
}
