//! Elasticsearch engine client.
//!
//! This module provides the [`SearchEngineClient`](crate::interfaces::SearchEngineClient)
//! implementation, its request and response types, and page token handling.

mod client;
pub mod pagination;
pub mod types;

pub use client::ElasticsearchClient;
pub use types::{
    BulkCreateItem, BulkCreateRequest, BulkItemError, BulkItemResult, CreateRequest,
    DeleteRequest, EsJoin, GetResponse, IndexMapping, Mappings, Pagination, SearchHit,
    SearchRequest, SearchResponse, TaskStatus, UpdateRequest, WriteBlockResponse,
};
