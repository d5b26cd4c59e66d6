//! Elasticsearch client implementation.
//!
//! This module provides the concrete implementation of [`SearchEngineClient`]
//! on top of the `opensearch` transport. Requests go through
//! [`OpenSearch::send`] with explicit paths, which keeps the point-in-time,
//! task and block endpoints on the same code path as the document APIs.

use async_trait::async_trait;
use opensearch::auth::Credentials;
use opensearch::http::headers::{HeaderMap, HeaderValue, CONTENT_TYPE};
use opensearch::http::request::{Body, JsonBody};
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::http::Method;
use opensearch::OpenSearch;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::pagination::{decode_token, next_token, DEFAULT_PAGE_SIZE};
use super::types::{
    BulkCreateRequest, BulkItemError, BulkItemResult, CreateRequest, DeleteRequest, EsJoin,
    GetResponse, Mappings, SearchHit, SearchRequest, SearchResponse, TaskStatus, UpdateRequest,
    WriteBlockResponse,
};
use crate::config::ElasticsearchConfig;
use crate::context::with_cancellation;
use crate::dsl::{Query, Sort};
use crate::errors::EngineError;
use crate::interfaces::SearchEngineClient;

const NDJSON: &str = "application/x-ndjson";

/// Client for an Elasticsearch-compatible cluster.
///
/// # Example
///
/// ```ignore
/// use grafeas_elasticsearch_repository::{ElasticsearchClient, ElasticsearchConfig, RefreshOption};
///
/// let config = ElasticsearchConfig::new("http://localhost:9200", RefreshOption::True);
/// let client = ElasticsearchClient::new(&config)?;
/// let exists = client.index_exists(&ctx, "grafeas-projects").await?;
/// ```
pub struct ElasticsearchClient {
    client: OpenSearch,
    pit_keep_alive: String,
}

/// Status and body of a completed request.
struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T, EngineError> {
        serde_json::from_str(&self.body).map_err(|e| {
            EngineError::parse(format!(
                "failed to decode response with status {}: {}",
                self.status, e
            ))
        })
    }

    /// Decode the body of a successful response, or turn a failed one into an error.
    fn success_json<T: DeserializeOwned>(self) -> Result<T, EngineError> {
        if self.is_success() {
            self.json()
        } else {
            Err(self.into_error())
        }
    }

    fn ensure_success(self) -> Result<(), EngineError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    /// Build a response error from the engine's `{"error": {"type", "reason"}}` body.
    fn into_error(self) -> EngineError {
        let parsed: Option<Value> = serde_json::from_str(&self.body).ok();
        let error = parsed.as_ref().and_then(|body| body.get("error"));
        let (error_type, reason) = match error {
            Some(Value::Object(error)) => (
                error.get("type").and_then(Value::as_str).map(str::to_string),
                error
                    .get("reason")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| self.body.clone()),
            ),
            Some(Value::String(reason)) => (None, reason.clone()),
            _ => (None, self.body.clone()),
        };
        EngineError::response(self.status, error_type, reason)
    }
}

#[derive(Deserialize)]
struct CreateResponseBody {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Deserialize)]
struct BulkResponseBody {
    #[serde(default)]
    items: Vec<Map<String, Value>>,
}

#[derive(Deserialize)]
struct BulkItemBody {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    status: u16,
    #[serde(default)]
    error: Option<BulkItemError>,
}

#[derive(Deserialize)]
struct SearchResponseBody {
    hits: HitsBody,
}

#[derive(Deserialize)]
struct HitsBody {
    #[serde(default)]
    total: Option<TotalBody>,
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct TotalBody {
    value: u64,
}

impl From<SearchResponseBody> for SearchResponse {
    fn from(body: SearchResponseBody) -> Self {
        let total = body
            .hits
            .total
            .map(|t| t.value)
            .unwrap_or(body.hits.hits.len() as u64);
        Self {
            hits: body.hits.hits,
            total,
            next_page_token: String::new(),
        }
    }
}

#[derive(Deserialize)]
struct MultiSearchResponseBody {
    responses: Vec<Value>,
}

#[derive(Deserialize)]
struct MultiGetResponseBody {
    docs: Vec<GetResponse>,
}

#[derive(Deserialize)]
struct PitResponseBody {
    id: String,
}

#[derive(Deserialize)]
struct DeleteByQueryResponseBody {
    #[serde(default)]
    deleted: u64,
}

#[derive(Deserialize)]
struct ReindexResponseBody {
    #[serde(default)]
    task: Option<String>,
}

impl ElasticsearchClient {
    /// Create a client for the cluster described by `config`.
    ///
    /// No request is made; connectivity is established lazily.
    ///
    /// # Arguments
    ///
    /// * `config` - Cluster URL, optional basic auth credentials and point-in-time keepalive
    ///
    /// # Returns
    ///
    /// * `Ok(ElasticsearchClient)` - A new client instance
    /// * `Err(EngineError)` - If the URL is invalid or the transport cannot be built
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, EngineError> {
        let url = Url::parse(&config.url).map_err(|e| EngineError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();
        if let Some(username) = &config.username {
            builder = builder.auth(Credentials::Basic(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }
        let transport = builder
            .build()
            .map_err(|e| EngineError::connection(e.to_string()))?;

        info!(
            url = %config.url,
            authenticated = config.username.is_some(),
            "Created Elasticsearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
            pit_keep_alive: config.pit_keep_alive.clone(),
        })
    }

    async fn send<B>(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        headers: HeaderMap,
        body: Option<B>,
    ) -> Result<RawResponse, EngineError>
    where
        B: Body + Send,
    {
        with_cancellation(ctx, async {
            let response = self
                .client
                .send(method, path, headers, Some(query), body, None)
                .await?;
            let status = response.status_code().as_u16();
            let body = response.text().await?;
            Ok(RawResponse { status, body })
        })
        .await
    }

    async fn send_json(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Value,
    ) -> Result<RawResponse, EngineError> {
        self.send(ctx, method, path, query, HeaderMap::new(), Some(JsonBody::new(body)))
            .await
    }

    async fn send_empty(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<RawResponse, EngineError> {
        self.send(ctx, method, path, query, HeaderMap::new(), Option::<()>::None)
            .await
    }

    async fn send_ndjson(
        &self,
        ctx: &CancellationToken,
        path: &str,
        query: &[(&str, String)],
        lines: Vec<Value>,
    ) -> Result<RawResponse, EngineError> {
        let mut body = String::new();
        for line in lines {
            body.push_str(&line.to_string());
            body.push('\n');
        }
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(NDJSON));
        self.send(ctx, Method::Post, path, query, headers, Some(body))
            .await
    }

    /// Open a point-in-time on `index` and return its id.
    async fn open_pit(&self, ctx: &CancellationToken, index: &str) -> Result<String, EngineError> {
        let response = self
            .send_empty(
                ctx,
                Method::Post,
                &format!("/{}/_pit", index),
                &[("keep_alive", self.pit_keep_alive.clone())],
            )
            .await?;
        let pit: PitResponseBody = response.success_json()?;
        debug!(index = %index, "Opened point-in-time");
        Ok(pit.id)
    }
}

/// Path segment for a caller-supplied document id.
fn escape_id(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Apply `patch` to `target` as a JSON merge patch.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Merge the join declaration into `document` and resolve the routing key.
fn apply_join(
    document: &mut Value,
    join: Option<&EsJoin>,
    routing: Option<String>,
) -> Result<Option<String>, EngineError> {
    match (join, routing) {
        (Some(_), Some(_)) => Err(EngineError::invalid_argument(
            "a document cannot declare both a join and an explicit routing key",
        )),
        (Some(join), None) => {
            merge_patch(document, &join.patch());
            Ok(join.parent.clone())
        }
        (None, routing) => Ok(routing),
    }
}

/// Body of a `_search` request.
fn search_body(query: Option<&Query>, sort: &Sort) -> Result<Map<String, Value>, EngineError> {
    let mut body = Map::new();
    if let Some(query) = query {
        body.insert(
            "query".to_string(),
            serde_json::to_value(query).map_err(|e| EngineError::serialization(e.to_string()))?,
        );
    }
    if !sort.is_empty() {
        body.insert(
            "sort".to_string(),
            serde_json::to_value(sort).map_err(|e| EngineError::serialization(e.to_string()))?,
        );
    }
    Ok(body)
}

#[async_trait]
impl SearchEngineClient for ElasticsearchClient {
    async fn create(
        &self,
        ctx: &CancellationToken,
        request: CreateRequest,
    ) -> Result<String, EngineError> {
        let CreateRequest {
            index,
            mut document,
            document_id,
            routing,
            join,
            refresh,
        } = request;

        let routing = apply_join(&mut document, join.as_ref(), routing)?;
        let mut query = vec![("refresh", refresh.as_str().to_string())];
        if let Some(routing) = routing {
            query.push(("routing", routing));
        }

        let response = match &document_id {
            Some(id) => {
                self.send_json(
                    ctx,
                    Method::Put,
                    &format!("/{}/_doc/{}", index, escape_id(id)),
                    &query,
                    document,
                )
                .await?
            }
            None => {
                self.send_json(ctx, Method::Post, &format!("/{}/_doc", index), &query, document)
                    .await?
            }
        };

        let created: CreateResponseBody = response.success_json()?;
        debug!(index = %index, id = %created.id, "Document created");
        Ok(created.id)
    }

    async fn bulk_create(
        &self,
        ctx: &CancellationToken,
        request: BulkCreateRequest,
    ) -> Result<Vec<BulkItemResult>, EngineError> {
        let BulkCreateRequest {
            index,
            items,
            refresh,
        } = request;
        let count = items.len();

        let mut lines = Vec::with_capacity(count * 2);
        for item in items {
            let mut document = item.document;
            let routing = apply_join(&mut document, item.join.as_ref(), item.routing)?;
            let mut metadata = Map::new();
            if let Some(id) = item.document_id {
                metadata.insert("_id".to_string(), Value::String(id));
            }
            if let Some(routing) = routing {
                metadata.insert("routing".to_string(), Value::String(routing));
            }
            lines.push(json!({ "create": metadata }));
            lines.push(document);
        }

        let response = self
            .send_ndjson(
                ctx,
                &format!("/{}/_bulk", index),
                &[("refresh", refresh.as_str().to_string())],
                lines,
            )
            .await?;
        let body: BulkResponseBody = response.success_json()?;

        let mut results = Vec::with_capacity(body.items.len());
        for item in body.items {
            // Each item is keyed by its action name.
            let Some(outcome) = item.into_iter().next().map(|(_, v)| v) else {
                return Err(EngineError::parse("bulk response item has no action"));
            };
            let outcome: BulkItemBody = serde_json::from_value(outcome)
                .map_err(|e| EngineError::parse(format!("invalid bulk response item: {}", e)))?;
            results.push(BulkItemResult {
                id: outcome.id,
                status: outcome.status,
                error: outcome.error,
            });
        }

        if results.len() != count {
            return Err(EngineError::parse(format!(
                "bulk response has {} items for {} requests",
                results.len(),
                count
            )));
        }

        debug!(
            index = %index,
            items = count,
            failed = results.iter().filter(|r| !r.is_success()).count(),
            "Bulk create completed"
        );
        Ok(results)
    }

    async fn search(
        &self,
        ctx: &CancellationToken,
        request: SearchRequest,
    ) -> Result<SearchResponse, EngineError> {
        let mut body = search_body(request.query.as_ref(), &request.sort)?;

        let Some(pagination) = request.pagination else {
            let response = self
                .send_json(
                    ctx,
                    Method::Post,
                    &format!("/{}/_search", request.index),
                    &[("size", DEFAULT_PAGE_SIZE.to_string())],
                    Value::Object(body),
                )
                .await?;
            let parsed: SearchResponseBody = response.success_json()?;
            let response = SearchResponse::from(parsed);
            debug!(index = %request.index, hits = response.hits.len(), "Search completed");
            return Ok(response);
        };

        let (pit_id, from) = if pagination.token.is_empty() {
            (self.open_pit(ctx, &request.index).await?, 0)
        } else {
            decode_token(&pagination.token)?
        };
        let size = if pagination.size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            pagination.size
        };

        body.insert(
            "pit".to_string(),
            json!({ "id": pit_id, "keep_alive": self.pit_keep_alive }),
        );
        let response = self
            .send_json(
                ctx,
                Method::Post,
                "/_search",
                &[("size", size.to_string()), ("from", from.to_string())],
                Value::Object(body),
            )
            .await?;
        let parsed: SearchResponseBody = response.success_json()?;
        let mut response = SearchResponse::from(parsed);
        response.next_page_token = next_token(&pit_id, from, size, response.total);

        debug!(
            index = %request.index,
            from = from,
            size = size,
            total = response.total,
            "Paginated search completed"
        );
        Ok(response)
    }

    async fn multi_search(
        &self,
        ctx: &CancellationToken,
        index: &str,
        queries: &[Option<Query>],
    ) -> Result<Vec<SearchResponse>, EngineError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let mut lines = Vec::with_capacity(queries.len() * 2);
        for query in queries {
            lines.push(json!({ "index": index }));
            lines.push(Value::Object(search_body(query.as_ref(), &Sort::default())?));
        }

        let response = self.send_ndjson(ctx, "/_msearch", &[], lines).await?;
        let body: MultiSearchResponseBody = response.success_json()?;
        if body.responses.len() != queries.len() {
            return Err(EngineError::parse(format!(
                "multi-search returned {} responses for {} searches",
                body.responses.len(),
                queries.len()
            )));
        }

        let mut responses = Vec::with_capacity(body.responses.len());
        for item in body.responses {
            if item.get("error").is_some() {
                let status = item
                    .get("status")
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(500);
                return Err(RawResponse {
                    status,
                    body: item.to_string(),
                }
                .into_error());
            }
            let parsed: SearchResponseBody = serde_json::from_value(item)
                .map_err(|e| EngineError::parse(format!("invalid multi-search response: {}", e)))?;
            responses.push(SearchResponse::from(parsed));
        }

        debug!(index = %index, searches = responses.len(), "Multi-search completed");
        Ok(responses)
    }

    async fn get(
        &self,
        ctx: &CancellationToken,
        index: &str,
        id: &str,
    ) -> Result<GetResponse, EngineError> {
        let response = self
            .send_empty(
                ctx,
                Method::Get,
                &format!("/{}/_doc/{}", index, escape_id(id)),
                &[],
            )
            .await?;

        // A missing document is a 404 without an error object.
        if response.status == 404 {
            let body: Value = response.json().unwrap_or(Value::Null);
            if body.get("error").is_none() {
                return Ok(GetResponse {
                    id: id.to_string(),
                    found: false,
                    source: None,
                });
            }
            return Err(RawResponse {
                status: 404,
                body: body.to_string(),
            }
            .into_error());
        }
        response.success_json()
    }

    async fn multi_get(
        &self,
        ctx: &CancellationToken,
        index: &str,
        ids: &[String],
    ) -> Result<Vec<GetResponse>, EngineError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .send_json(
                ctx,
                Method::Post,
                &format!("/{}/_mget", index),
                &[],
                json!({ "ids": ids }),
            )
            .await?;
        let body: MultiGetResponseBody = response.success_json()?;
        Ok(body.docs)
    }

    async fn update(
        &self,
        ctx: &CancellationToken,
        request: UpdateRequest,
    ) -> Result<(), EngineError> {
        let response = self
            .send_json(
                ctx,
                Method::Put,
                &format!("/{}/_doc/{}", request.index, escape_id(&request.document_id)),
                &[("refresh", request.refresh.as_str().to_string())],
                request.document,
            )
            .await?;
        response.ensure_success()?;
        debug!(index = %request.index, id = %request.document_id, "Document updated");
        Ok(())
    }

    async fn delete(
        &self,
        ctx: &CancellationToken,
        request: DeleteRequest,
    ) -> Result<u64, EngineError> {
        let query = serde_json::to_value(&request.query)
            .map_err(|e| EngineError::serialization(e.to_string()))?;
        let refresh = request.refresh.for_delete_by_query();
        let response = self
            .send_json(
                ctx,
                Method::Post,
                &format!("/{}/_delete_by_query", request.index),
                &[("refresh", refresh.as_str().to_string())],
                json!({ "query": query }),
            )
            .await?;
        let body: DeleteByQueryResponseBody = response.success_json()?;
        if body.deleted == 0 {
            return Err(EngineError::nothing_deleted(request.index));
        }
        debug!(index = %request.index, deleted = body.deleted, "Documents deleted");
        Ok(body.deleted)
    }

    async fn index_exists(
        &self,
        ctx: &CancellationToken,
        index: &str,
    ) -> Result<bool, EngineError> {
        let response = self
            .send_empty(ctx, Method::Head, &format!("/{}", index), &[])
            .await?;
        match response.status {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(EngineError::response(
                status,
                None,
                format!("unexpected status checking whether {} exists", index),
            )),
        }
    }

    async fn create_index(
        &self,
        ctx: &CancellationToken,
        index: &str,
        body: Value,
    ) -> Result<(), EngineError> {
        let response = self
            .send_json(ctx, Method::Put, &format!("/{}", index), &[], body)
            .await?;
        response.ensure_success()?;
        info!(index = %index, "Index created");
        Ok(())
    }

    async fn get_index_settings(
        &self,
        ctx: &CancellationToken,
        index: &str,
    ) -> Result<Value, EngineError> {
        let response = self
            .send_empty(ctx, Method::Get, &format!("/{}/_settings", index), &[])
            .await?;
        let body: Map<String, Value> = response.success_json()?;

        // Keyed by physical index name; an alias resolves to a single entry.
        let entry = match body.get(index) {
            Some(entry) => Some(entry.clone()),
            None if body.len() == 1 => body.into_iter().next().map(|(_, v)| v),
            None => None,
        };
        entry
            .and_then(|e| e.get("settings").cloned())
            .ok_or_else(|| EngineError::parse(format!("no settings returned for {}", index)))
    }

    async fn add_write_block(
        &self,
        ctx: &CancellationToken,
        index: &str,
    ) -> Result<WriteBlockResponse, EngineError> {
        let response = self
            .send_empty(ctx, Method::Put, &format!("/{}/_block/write", index), &[])
            .await?;
        response.success_json()
    }

    async fn reindex(
        &self,
        ctx: &CancellationToken,
        source: &str,
        dest: &str,
    ) -> Result<Option<String>, EngineError> {
        let response = self
            .send_json(
                ctx,
                Method::Post,
                "/_reindex",
                &[("wait_for_completion", "false".to_string())],
                json!({
                    "conflicts": "proceed",
                    "source": { "index": source },
                    "dest": { "index": dest, "op_type": "create" },
                }),
            )
            .await?;
        let body: ReindexResponseBody = response.success_json()?;
        Ok(body.task)
    }

    async fn get_task(
        &self,
        ctx: &CancellationToken,
        task: &str,
    ) -> Result<TaskStatus, EngineError> {
        let response = self
            .send_empty(ctx, Method::Get, &format!("/_tasks/{}", task), &[])
            .await?;
        response.success_json()
    }

    async fn delete_task_document(
        &self,
        ctx: &CancellationToken,
        task: &str,
    ) -> Result<(), EngineError> {
        let response = self
            .send_empty(ctx, Method::Delete, &format!("/.tasks/_doc/{}", task), &[])
            .await?;
        response.ensure_success()
    }

    async fn get_alias(
        &self,
        ctx: &CancellationToken,
        alias: &str,
    ) -> Result<Vec<String>, EngineError> {
        let response = self
            .send_empty(ctx, Method::Get, &format!("/_alias/{}", alias), &[])
            .await?;
        if response.status == 404 {
            return Ok(Vec::new());
        }
        // Keyed by physical index name.
        let body: Map<String, Value> = response.success_json()?;
        let mut indexes: Vec<String> = body.into_iter().map(|(index, _)| index).collect();
        indexes.sort();
        Ok(indexes)
    }

    async fn swap_alias(
        &self,
        ctx: &CancellationToken,
        alias: &str,
        from: &str,
        to: &str,
    ) -> Result<(), EngineError> {
        let response = self
            .send_json(
                ctx,
                Method::Post,
                "/_aliases",
                &[],
                json!({
                    "actions": [
                        { "remove": { "index": from, "alias": alias } },
                        { "add": { "index": to, "alias": alias } },
                    ]
                }),
            )
            .await?;
        response.ensure_success()?;
        info!(alias = %alias, from = %from, to = %to, "Alias swapped");
        Ok(())
    }

    async fn delete_index(
        &self,
        ctx: &CancellationToken,
        index: &str,
    ) -> Result<(), EngineError> {
        let response = self
            .send_empty(ctx, Method::Delete, &format!("/{}", index), &[])
            .await?;
        if response.status == 404 {
            warn!(index = %index, "Index to delete does not exist");
            return Ok(());
        }
        response.ensure_success()?;
        info!(index = %index, "Index deleted");
        Ok(())
    }

    async fn get_mappings(&self, ctx: &CancellationToken) -> Result<Mappings, EngineError> {
        let response = self
            .send_empty(ctx, Method::Get, "/_mapping", &[])
            .await?;
        response.success_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_id() {
        assert_eq!(escape_id("plain-id"), "plain-id");
        assert_eq!(escape_id("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn test_merge_patch() {
        let mut target = json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge_patch(&mut target, &json!({"b": {"c": 20, "d": null}, "e": "x"}));
        assert_eq!(target, json!({"a": 1, "b": {"c": 20}, "e": "x"}));
    }

    #[test]
    fn test_apply_join() {
        let join = EsJoin {
            field: "relation".to_string(),
            name: "child".to_string(),
            parent: Some("p1".to_string()),
        };
        let mut document = json!({"name": "x"});
        let routing = apply_join(&mut document, Some(&join), None).unwrap();
        assert_eq!(routing.as_deref(), Some("p1"));
        assert_eq!(
            document,
            json!({"name": "x", "relation": {"name": "child", "parent": "p1"}})
        );

        let mut document = json!({});
        let err = apply_join(&mut document, Some(&join), Some("r".to_string())).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let routing = apply_join(&mut document, None, Some("r".to_string())).unwrap();
        assert_eq!(routing.as_deref(), Some("r"));
    }

    #[test]
    fn test_error_body_parsing() {
        let err = RawResponse {
            status: 400,
            body: r#"{"error":{"type":"resource_already_exists_exception","reason":"exists"},"status":400}"#
                .to_string(),
        }
        .into_error();
        assert!(err.has_error_type("resource_already_exists_exception"));
        assert_eq!(err.status(), Some(400));

        let err = RawResponse {
            status: 502,
            body: "bad gateway".to_string(),
        }
        .into_error();
        assert_eq!(err.to_string(), "Request failed with status 502: bad gateway");
    }

    #[test]
    fn test_search_body_omits_empty_parts() {
        assert!(search_body(None, &Sort::default()).unwrap().is_empty());

        let body = search_body(
            Some(&Query::term("name", "projects/rode")),
            &Sort::by("createTime", crate::dsl::SortOrder::Desc),
        )
        .unwrap();
        assert_eq!(
            Value::Object(body),
            json!({
                "query": {"term": {"name": "projects/rode"}},
                "sort": [{"createTime": {"order": "desc"}}]
            })
        );
    }
}
