//! Integration tests for the storage facade.
//!
//! These tests run the real client and facade against a mock HTTP server
//! standing in for Elasticsearch.

use std::collections::HashMap;
use std::sync::Arc;

use grafeas_elasticsearch_repository::elasticsearch::pagination::decode_token;
use grafeas_elasticsearch_repository::index::VersionedMapping;
use grafeas_elasticsearch_repository::{
    new_storage, DocumentKind, ElasticsearchClient, ElasticsearchConfig, ElasticsearchStorage,
    EngineError, ErrorKind, GrafeasStorage, IndexManager, ProjectStorage, RefreshOption,
    SearchEngineClient, STORAGE_TYPE,
};
use grafeas_elasticsearch_shared::{FieldMask, Note, Occurrence, Project};
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn storage(server: &MockServer) -> ElasticsearchStorage {
    storage_with(server, IndexManager::new(HashMap::new()).unwrap(), RefreshOption::True)
}

fn storage_with(
    server: &MockServer,
    indexes: IndexManager,
    refresh: RefreshOption,
) -> ElasticsearchStorage {
    ElasticsearchStorage::new(client(server), Arc::new(indexes), refresh)
}

fn client(server: &MockServer) -> Arc<ElasticsearchClient> {
    let config = ElasticsearchConfig::new(server.uri(), RefreshOption::True);
    Arc::new(ElasticsearchClient::new(&config).unwrap())
}

/// Occurrence and note mappings at `v2`.
fn v2_indexes() -> IndexManager {
    let mapping = |kind| {
        (
            kind,
            VersionedMapping {
                version: "v2".to_string(),
                mappings: json!({"properties": {"name": {"type": "keyword"}}}),
            },
        )
    };
    IndexManager::new(HashMap::from([
        mapping(DocumentKind::Occurrences),
        mapping(DocumentKind::Notes),
    ]))
    .unwrap()
}

fn hits(sources: &[Value], total: u64) -> Value {
    let hits: Vec<Value> = sources
        .iter()
        .enumerate()
        .map(|(i, source)| json!({"_id": format!("doc-{}", i), "_source": source}))
        .collect();
    json!({"hits": {"total": {"value": total}, "hits": hits}})
}

fn with_uri(uri: &str) -> Occurrence {
    let mut fields = Map::new();
    fields.insert("resource".to_string(), json!({"uri": uri}));
    Occurrence {
        note_name: Some("projects/rode/notes/cve".to_string()),
        fields,
        ..Occurrence::default()
    }
}

fn resource_uri(occurrence: &Occurrence) -> &str {
    occurrence.fields["resource"]["uri"].as_str().unwrap()
}

#[tokio::test]
async fn test_create_and_get_project() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_search"))
        .and(body_partial_json(json!({"query": {"term": {"name": "projects/rode"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[], 0)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(hits(&[json!({"name": "projects/rode"})], 1)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_doc"))
        .and(query_param("refresh", "true"))
        .and(body_partial_json(json!({"name": "projects/rode"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "x"})))
        .expect(1)
        .mount(&server)
        .await;
    for index in ["/grafeas-v1-rode-occurrences", "/grafeas-v1-rode-notes"] {
        Mock::given(method("PUT"))
            .and(path(index))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let storage = storage(&server);
    let ctx = CancellationToken::new();

    let created = storage
        .create_project(&ctx, "rode", Project::default())
        .await
        .unwrap();
    assert_eq!(created.name, "projects/rode");

    let fetched = storage.get_project(&ctx, "rode").await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_existing_project_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(hits(&[json!({"name": "projects/rode"})], 1)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_doc"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let err = storage(&server)
        .create_project(&CancellationToken::new(), "rode", Project::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn test_get_missing_project_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[], 0)))
        .mount(&server)
        .await;

    let err = storage(&server)
        .get_project(&CancellationToken::new(), "rode")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_project_removes_indexes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_delete_by_query"))
        .and(query_param("refresh", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 1})))
        .expect(1)
        .mount(&server)
        .await;
    for index in ["/grafeas-v1-rode-occurrences", "/grafeas-v1-rode-notes"] {
        Mock::given(method("DELETE"))
            .and(path(index))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;
    }

    storage(&server)
        .delete_project(&CancellationToken::new(), "rode")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_missing_project_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_delete_by_query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 0})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = storage(&server)
        .delete_project(&CancellationToken::new(), "rode")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_list_occurrences_paginates_with_point_in_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-occurrences/_pit"))
        .and(query_param("keep_alive", "5m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "pit-1"})))
        .expect(1)
        .mount(&server)
        .await;
    for from in ["0", "50", "100"] {
        Mock::given(method("POST"))
            .and(path("/_search"))
            .and(query_param("size", "50"))
            .and(query_param("from", from))
            .and(body_partial_json(json!({
                "pit": {"id": "pit-1", "keep_alive": "5m"},
                "sort": [{"createTime": {"order": "desc"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(hits(
                &[json!({"name": format!("projects/rode/occurrences/{}", from)})],
                130,
            )))
            .expect(1)
            .mount(&server)
            .await;
    }

    let storage = storage(&server);
    let ctx = CancellationToken::new();

    let first = storage
        .list_occurrences(&ctx, "rode", "", 50, "")
        .await
        .unwrap();
    assert_eq!(first.items[0].name, "projects/rode/occurrences/0");
    assert_eq!(
        decode_token(&first.next_page_token).unwrap(),
        ("pit-1".to_string(), 50)
    );

    let second = storage
        .list_occurrences(&ctx, "rode", "", 50, &first.next_page_token)
        .await
        .unwrap();
    assert_eq!(
        decode_token(&second.next_page_token).unwrap(),
        ("pit-1".to_string(), 100)
    );

    let third = storage
        .list_occurrences(&ctx, "rode", "", 50, &second.next_page_token)
        .await
        .unwrap();
    assert!(third.is_last());
    assert_eq!(third.items[0].name, "projects/rode/occurrences/100");
}

#[tokio::test]
async fn test_list_without_page_size_is_a_single_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_search"))
        .and(query_param("size", "1000"))
        .and(body_partial_json(json!({"query": {"term": {"kind": "VULNERABILITY"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[json!({"name": "projects/rode/notes/cve", "kind": "VULNERABILITY"})],
            1,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let page = storage(&server)
        .list_notes(&CancellationToken::new(), "rode", r#"kind == "VULNERABILITY""#, 0, "")
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].kind.as_deref(), Some("VULNERABILITY"));
    assert!(page.is_last());
}

#[tokio::test]
async fn test_invalid_filter_and_token_are_rejected_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let storage = storage(&server);
    let ctx = CancellationToken::new();

    let err = storage
        .list_occurrences(&ctx, "rode", "a ==", 0, "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = storage
        .list_occurrences(&ctx, "rode", "", 10, "not-a-token")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_batch_create_occurrences_reports_partial_failure() {
    let server = MockServer::start().await;
    let item = |status: u16| json!({"create": {"_id": "id", "status": status}});
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-occurrences/_bulk"))
        .and(query_param("refresh", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": true,
            "items": [
                item(201),
                item(201),
                {"create": {
                    "_id": "id",
                    "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "failed to parse"}
                }},
                item(201),
                item(201),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let inputs: Vec<Occurrence> = (1..=5).map(|i| with_uri(&format!("uri-{}", i))).collect();
    let result = storage(&server)
        .batch_create_occurrences(&CancellationToken::new(), "rode", inputs)
        .await
        .unwrap();

    assert_eq!(result.created.len(), 4);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind(), ErrorKind::Internal);
    let uris: Vec<&str> = result.created.iter().map(resource_uri).collect();
    assert_eq!(uris, vec!["uri-1", "uri-2", "uri-4", "uri-5"]);
    for occurrence in &result.created {
        assert!(occurrence.name.starts_with("projects/rode/occurrences/"));
        assert!(occurrence.create_time.is_some());
    }
}

#[tokio::test]
async fn test_batch_create_occurrences_transport_failure_fails_every_item() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-occurrences/_bulk"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"type": "cluster_block_exception", "reason": "blocked"}
        })))
        .mount(&server)
        .await;

    let result = storage(&server)
        .batch_create_occurrences(&CancellationToken::new(), "rode", vec![with_uri("a")])
        .await
        .unwrap();
    assert!(result.created.is_empty());
    assert_eq!(result.errors.len(), 1);
}

#[tokio::test]
async fn test_batch_create_notes_skips_existing_and_duplicate_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_msearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [
                hits(&[json!({"name": "projects/rode/notes/a"})], 1),
                hits(&[], 0),
                hits(&[], 0),
                hits(&[], 0),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"create": {"_id": "1", "status": 201}},
                {"create": {"_id": "2", "status": 201}},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let notes = ["a", "b", "b", "c"]
        .into_iter()
        .map(|id| (id.to_string(), Note::default()))
        .collect();
    let result = storage(&server)
        .batch_create_notes(&CancellationToken::new(), "rode", notes)
        .await
        .unwrap();

    let names: Vec<&str> = result.created.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["projects/rode/notes/b", "projects/rode/notes/c"]);
    assert_eq!(result.errors.len(), 2);
    assert!(result
        .errors
        .iter()
        .all(|e| e.kind() == ErrorKind::AlreadyExists));
}

#[tokio::test]
async fn test_update_occurrence_applies_field_mask() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-occurrences/_search"))
        .and(body_partial_json(json!({
            "query": {"term": {"name": "projects/rode/occurrences/o1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[json!({
                "name": "projects/rode/occurrences/o1",
                "kind": "VULNERABILITY",
                "createTime": "2024-01-01T00:00:00Z",
                "remediation": "none"
            })],
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/grafeas-rode-occurrences/_doc/doc-0"))
        .and(query_param("refresh", "true"))
        .and(body_partial_json(json!({
            "name": "projects/rode/occurrences/o1",
            "kind": "VULNERABILITY",
            "remediation": "upgrade"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "updated"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut patch = Occurrence {
        kind: Some("BUILD".to_string()),
        ..Occurrence::default()
    };
    patch
        .fields
        .insert("remediation".to_string(), json!("upgrade"));

    let updated = storage(&server)
        .update_occurrence(
            &CancellationToken::new(),
            "rode",
            "o1",
            patch,
            &FieldMask::new(["remediation"]),
        )
        .await
        .unwrap();

    assert_eq!(updated.kind.as_deref(), Some("VULNERABILITY"));
    assert_eq!(updated.fields["remediation"], json!("upgrade"));
    assert!(updated.create_time.is_some());
    assert!(updated.update_time.is_some());
}

#[tokio::test]
async fn test_get_occurrence_note_follows_note_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-occurrences/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[json!({
                "name": "projects/rode/occurrences/o1",
                "noteName": "projects/security/notes/cve-1"
            })],
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/grafeas-security-notes/_search"))
        .and(body_partial_json(json!({
            "query": {"term": {"name": "projects/security/notes/cve-1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[json!({"name": "projects/security/notes/cve-1", "kind": "VULNERABILITY"})],
            1,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let note = storage(&server)
        .get_occurrence_note(&CancellationToken::new(), "rode", "o1")
        .await
        .unwrap();
    assert_eq!(note.name, "projects/security/notes/cve-1");
}

#[tokio::test]
async fn test_list_note_occurrences_searches_every_project() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-*-occurrences/_search"))
        .and(body_partial_json(json!({
            "query": {"term": {"noteName": "projects/security/notes/cve-1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[
                json!({"name": "projects/a/occurrences/1", "noteName": "projects/security/notes/cve-1"}),
                json!({"name": "projects/b/occurrences/2", "noteName": "projects/security/notes/cve-1"}),
            ],
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let page = storage(&server)
        .list_note_occurrences(&CancellationToken::new(), "security", "cve-1", "", 0, "")
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
}

#[tokio::test]
async fn test_engine_failure_is_internal_and_hides_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_search"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"type": "search_phase_execution_exception", "reason": "shard secrets"}
        })))
        .mount(&server)
        .await;

    let err = storage(&server)
        .get_project(&CancellationToken::new(), "rode")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!err.to_string().contains("shard secrets"));
}

#[tokio::test]
async fn test_cancelled_request_returns_cancelled() {
    let server = MockServer::start().await;
    let ctx = CancellationToken::new();
    ctx.cancel();

    let err = storage(&server).get_project(&ctx, "rode").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_new_storage_rejects_unknown_type_and_bad_config() {
    let ctx = CancellationToken::new();
    let config = ElasticsearchConfig::new("http://localhost:9200", RefreshOption::True);

    let err = new_storage(&ctx, "memstore", &config).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut config = config;
    config.refresh = "eventually".to_string();
    let err = new_storage(&ctx, STORAGE_TYPE, &config).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_new_storage_creates_projects_index_and_runs_migrations() {
    let server = MockServer::start().await;
    let mappings = tempfile::tempdir().unwrap();
    std::fs::write(
        mappings.path().join("projects.json"),
        json!({"version": "v3", "mappings": {"properties": {"name": {"type": "keyword"}}}})
            .to_string(),
    )
    .unwrap();

    Mock::given(method("HEAD"))
        .and(path("/grafeas-projects"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/grafeas-v3-projects"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/grafeas-v3-projects"))
        .and(body_partial_json(json!({
            "mappings": {"_meta": {"type": "grafeas"}},
            "aliases": {"grafeas-projects": {}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/_mapping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "grafeas-v3-projects": {"mappings": {"_meta": {"type": "grafeas"}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ElasticsearchConfig::new(server.uri(), RefreshOption::WaitFor)
        .with_mappings_dir(mappings.path());
    let result = new_storage(&CancellationToken::new(), STORAGE_TYPE, &config).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_delete_project_removes_indexes_behind_aliases() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_delete_by_query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 1})))
        .mount(&server)
        .await;
    for kind in ["occurrences", "notes"] {
        let alias = format!("grafeas-rode-{}", kind);
        let old = format!("grafeas-v1-rode-{}", kind);
        Mock::given(method("GET"))
            .and(path(format!("/_alias/{}", alias)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ old.clone(): {"aliases": { alias.clone(): {} }} })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/{}", old)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/grafeas-v2-rode-{}", kind)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(0)
            .mount(&server)
            .await;
    }

    storage_with(&server, v2_indexes(), RefreshOption::True)
        .delete_project(&CancellationToken::new(), "rode")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_list_projects_returns_every_project() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-projects/_search"))
        .and(query_param("size", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[
                json!({"name": "projects/alpha"}),
                json!({"name": "projects/beta"}),
            ],
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let page = storage(&server)
        .list_projects(&CancellationToken::new(), "", 0, "")
        .await
        .unwrap();
    let names: Vec<&str> = page.items.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["projects/alpha", "projects/beta"]);
    assert!(page.next_page_token.is_empty());
}

#[tokio::test]
async fn test_create_note_with_existing_id_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_search"))
        .and(body_partial_json(json!({
            "query": {"term": {"name": "projects/rode/notes/cve-1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[json!({"name": "projects/rode/notes/cve-1"})],
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_doc"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let err = storage(&server)
        .create_note(&CancellationToken::new(), "rode", "cve-1", Note::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[tokio::test]
async fn test_update_note_without_mask_replaces_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(
            &[json!({
                "name": "projects/rode/notes/cve-1",
                "kind": "VULNERABILITY",
                "createTime": "2024-01-01T00:00:00Z",
                "shortDescription": "old"
            })],
            1,
        )))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/grafeas-rode-notes/_doc/doc-0"))
        .and(body_partial_json(json!({
            "name": "projects/rode/notes/cve-1",
            "kind": "BUILD",
            "createTime": "2024-01-01T00:00:00Z"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "updated"})))
        .expect(1)
        .mount(&server)
        .await;

    let patch = Note {
        kind: Some("BUILD".to_string()),
        ..Note::default()
    };
    let updated = storage(&server)
        .update_note(
            &CancellationToken::new(),
            "rode",
            "cve-1",
            patch,
            &FieldMask::default(),
        )
        .await
        .unwrap();

    assert_eq!(updated.kind.as_deref(), Some("BUILD"));
    assert!(!updated.fields.contains_key("shortDescription"));
    assert!(updated.create_time.is_some());
    assert!(updated.update_time.is_some());
}

#[tokio::test]
async fn test_update_missing_note_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[], 0)))
        .mount(&server)
        .await;

    let err = storage(&server)
        .update_note(
            &CancellationToken::new(),
            "rode",
            "cve-1",
            Note::default(),
            &FieldMask::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_occurrence_coerces_wait_for_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-occurrences/_delete_by_query"))
        .and(query_param("refresh", "true"))
        .and(body_partial_json(json!({
            "query": {"term": {"name": "projects/rode/occurrences/o1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 1})))
        .expect(1)
        .mount(&server)
        .await;

    storage_with(
        &server,
        IndexManager::new(HashMap::new()).unwrap(),
        RefreshOption::WaitFor,
    )
    .delete_occurrence(&CancellationToken::new(), "rode", "o1")
    .await
    .unwrap();
}

#[tokio::test]
async fn test_delete_note() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_delete_by_query"))
        .and(body_partial_json(json!({
            "query": {"term": {"name": "projects/rode/notes/cve-1"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 1})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_delete_by_query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 0})))
        .mount(&server)
        .await;

    let storage = storage(&server);
    let ctx = CancellationToken::new();
    storage.delete_note(&ctx, "rode", "cve-1").await.unwrap();

    let err = storage.delete_note(&ctx, "rode", "cve-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_vulnerability_summary_is_empty_and_validates_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let storage = storage(&server);
    let ctx = CancellationToken::new();

    let summary = storage
        .get_vulnerability_occurrences_summary(&ctx, "rode", r#"kind == "VULNERABILITY""#)
        .await
        .unwrap();
    assert!(summary.counts.is_empty());

    let err = storage
        .get_vulnerability_occurrences_summary(&ctx, "rode", "kind ==")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_get_document_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/grafeas-rode-notes/_doc/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "a/b",
            "found": true,
            "_source": {"name": "projects/rode/notes/b"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grafeas-rode-notes/_doc/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "_id": "missing",
            "found": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/grafeas-gone-notes/_doc/x"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "index_not_found_exception", "reason": "no such index"},
            "status": 404
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let ctx = CancellationToken::new();

    let found = client.get(&ctx, "grafeas-rode-notes", "a/b").await.unwrap();
    assert!(found.found);
    assert_eq!(found.source, Some(json!({"name": "projects/rode/notes/b"})));

    let missing = client.get(&ctx, "grafeas-rode-notes", "missing").await.unwrap();
    assert!(!missing.found);
    assert_eq!(missing.id, "missing");
    assert_eq!(missing.source, None);

    let err = client.get(&ctx, "grafeas-gone-notes", "x").await.unwrap_err();
    assert!(matches!(err, EngineError::ResponseError { status: 404, .. }));
    assert!(err.has_error_type("index_not_found_exception"));
}

#[tokio::test]
async fn test_multi_get_returns_one_entry_per_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/grafeas-rode-notes/_mget"))
        .and(body_partial_json(json!({"ids": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "docs": [
                {"_id": "a", "found": true, "_source": {"name": "projects/rode/notes/a"}},
                {"_id": "b", "found": false}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let ctx = CancellationToken::new();

    let docs = client
        .multi_get(&ctx, "grafeas-rode-notes", &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);
    assert!(docs[0].found);
    assert!(!docs[1].found);

    assert!(client
        .multi_get(&ctx, "grafeas-rode-notes", &[])
        .await
        .unwrap()
        .is_empty());
}
