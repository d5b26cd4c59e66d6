//! Elasticsearch storage facade.
//!
//! Implements [`ProjectStorage`] and [`GrafeasStorage`] on top of a
//! [`SearchEngineClient`]. Documents are addressed by their `name` attribute
//! through the collection aliases; engine document ids stay internal.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use grafeas_elasticsearch_shared::{
    BatchCreateResult, FieldMask, Note, Occurrence, Page, Project, VulnerabilityOccurrencesSummary,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::field_mask::apply_field_mask;
use crate::config::RefreshOption;
use crate::dsl::{Query, Sort, SortOrder};
use crate::elasticsearch::pagination::DEFAULT_PAGE_SIZE;
use crate::elasticsearch::{
    BulkCreateItem, BulkCreateRequest, CreateRequest, DeleteRequest, Pagination, SearchRequest,
    UpdateRequest,
};
use crate::errors::{EngineError, ErrorKind, StorageError};
use crate::filter::Filterer;
use crate::index::{all_projects_pattern, DocumentKind, IndexManager};
use crate::interfaces::{GrafeasStorage, ProjectStorage, SearchEngineClient};

const NAME_FIELD: &str = "name";
const NOTE_NAME_FIELD: &str = "noteName";
const CREATE_TIME_FIELD: &str = "createTime";

/// Storage backend for projects, occurrences and notes.
pub struct ElasticsearchStorage {
    client: Arc<dyn SearchEngineClient>,
    indexes: Arc<IndexManager>,
    filterer: Filterer,
    refresh: RefreshOption,
}

impl ElasticsearchStorage {
    /// Create a storage facade over an engine client and loaded mappings.
    ///
    /// # Arguments
    ///
    /// * `client` - Engine client shared with the migrator
    /// * `indexes` - Loaded index mappings
    /// * `refresh` - Refresh policy applied to every write
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        indexes: Arc<IndexManager>,
        refresh: RefreshOption,
    ) -> Self {
        Self {
            client,
            indexes,
            filterer: Filterer::new(),
            refresh,
        }
    }

    fn projects_alias(&self) -> String {
        self.indexes.projects_index().alias
    }

    fn occurrences_alias(&self, project_id: &str) -> String {
        self.indexes.occurrences_index(project_id).alias
    }

    fn notes_alias(&self, project_id: &str) -> String {
        self.indexes.notes_index(project_id).alias
    }

    /// Find the document named `name` in `index`, with its engine id.
    async fn find_by_name<T: DeserializeOwned + Send>(
        &self,
        ctx: &CancellationToken,
        index: &str,
        name: &str,
    ) -> Result<Option<(String, T)>, StorageError> {
        let request = SearchRequest::new(index).with_query(Some(Query::term(NAME_FIELD, name)));
        let response = self
            .client
            .search(ctx, request)
            .await
            .map_err(|e| StorageError::from_engine(format!("error searching for {}", name), e))?;

        match response.hits.into_iter().next() {
            Some(hit) => Ok(Some((hit.id, from_source(hit.source)?))),
            None => Ok(None),
        }
    }

    async fn exists(
        &self,
        ctx: &CancellationToken,
        index: &str,
        name: &str,
    ) -> Result<bool, StorageError> {
        Ok(self.find_by_name::<Value>(ctx, index, name).await?.is_some())
    }

    async fn list<T: DeserializeOwned + Send>(
        &self,
        ctx: &CancellationToken,
        index: &str,
        filter: &str,
        scope: Option<Query>,
        sort: Sort,
        paging: Option<Pagination>,
    ) -> Result<Page<T>, StorageError> {
        let filter = self.filterer.parse_expression(filter)?;
        let query = match (scope, filter) {
            (Some(scope), Some(filter)) => Some(Query::must(vec![scope, filter])),
            (scope, filter) => scope.or(filter),
        };

        let request = SearchRequest::new(index)
            .with_query(query)
            .with_sort(sort)
            .with_pagination(paging);
        let response = self
            .client
            .search(ctx, request)
            .await
            .map_err(|e| StorageError::from_engine(format!("error listing {}", index), e))?;

        let items = response
            .hits
            .into_iter()
            .map(|hit| from_source(hit.source))
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Page::new(items, response.next_page_token))
    }

    /// Delete the document named `name`, reporting a missing document as not found.
    async fn delete_by_name(
        &self,
        ctx: &CancellationToken,
        index: &str,
        name: &str,
    ) -> Result<(), StorageError> {
        let request = DeleteRequest {
            index: index.to_string(),
            query: Query::term(NAME_FIELD, name),
            refresh: self.refresh,
        };
        match self.client.delete(ctx, request).await {
            Ok(_) => Ok(()),
            Err(EngineError::NothingDeleted(_)) => {
                Err(StorageError::not_found(format!("{} not found", name)))
            }
            Err(e) => Err(StorageError::from_engine(format!("error deleting {}", name), e)),
        }
    }

    async fn create_document<T: Serialize + Sync>(
        &self,
        ctx: &CancellationToken,
        index: &str,
        name: &str,
        entity: &T,
    ) -> Result<String, StorageError> {
        let request = CreateRequest::new(index, to_document(entity)?, self.refresh);
        self.client
            .create(ctx, request)
            .await
            .map_err(|e| StorageError::from_engine(format!("error creating {}", name), e))
    }

    async fn replace_document<T: Serialize + Sync>(
        &self,
        ctx: &CancellationToken,
        index: &str,
        id: String,
        name: &str,
        entity: &T,
    ) -> Result<(), StorageError> {
        let request = UpdateRequest {
            index: index.to_string(),
            document_id: id,
            document: to_document(entity)?,
            refresh: self.refresh,
        };
        self.client
            .update(ctx, request)
            .await
            .map_err(|e| StorageError::from_engine(format!("error updating {}", name), e))
    }

    async fn bulk_create<T: Serialize + Sync>(
        &self,
        ctx: &CancellationToken,
        index: &str,
        entities: &[T],
    ) -> Result<Vec<Result<(), StorageError>>, StorageError> {
        let items = entities
            .iter()
            .map(|entity| to_document(entity).map(BulkCreateItem::new))
            .collect::<Result<Vec<_>, _>>()?;
        let request = BulkCreateRequest {
            index: index.to_string(),
            items,
            refresh: self.refresh,
        };
        let results = self
            .client
            .bulk_create(ctx, request)
            .await
            .map_err(|e| StorageError::from_engine(format!("error bulk creating in {}", index), e))?;

        Ok(results
            .into_iter()
            .map(|result| {
                if result.is_success() {
                    return Ok(());
                }
                let reason = result
                    .error
                    .as_ref()
                    .map(|e| format!("{}: {}", e.error_type, e.reason))
                    .unwrap_or_default();
                error!(index = %index, status = result.status, reason = %reason, "Bulk item failed");
                Err(StorageError::internal(format!(
                    "error creating document: engine returned status {}",
                    result.status
                )))
            })
            .collect())
    }

    /// Load a document for update, merge the patch and store it back.
    async fn patch_document<T>(
        &self,
        ctx: &CancellationToken,
        index: &str,
        name: &str,
        patch: &T,
        mask: &FieldMask,
    ) -> Result<T, StorageError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
    {
        let (id, current) = self
            .find_by_name::<Value>(ctx, index, name)
            .await?
            .ok_or_else(|| StorageError::not_found(format!("{} not found", name)))?;

        let patch = to_document(patch)?;
        let mut merged = if mask.is_empty() {
            let mut replaced = patch;
            if let Value::Object(map) = &mut replaced {
                if let Some(create_time) = current.get(CREATE_TIME_FIELD) {
                    map.insert(CREATE_TIME_FIELD.to_string(), create_time.clone());
                }
            }
            replaced
        } else {
            apply_field_mask(&current, &patch, mask)?
        };
        if let Value::Object(map) = &mut merged {
            map.insert(NAME_FIELD.to_string(), Value::String(name.to_string()));
            map.insert(
                "updateTime".to_string(),
                serde_json::to_value(Utc::now())
                    .map_err(|e| StorageError::internal(e.to_string()))?,
            );
        }

        let updated: T = from_source(merged)?;
        self.replace_document(ctx, index, id, name, &updated).await?;
        Ok(updated)
    }
}

/// Page size and token as sent to the engine.
///
/// No size and no token means a single unpaginated page.
fn pagination(page_size: usize, page_token: &str) -> Option<Pagination> {
    if page_size == 0 && page_token.is_empty() {
        return None;
    }
    Some(Pagination {
        size: if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        },
        token: page_token.to_string(),
    })
}

fn newest_first() -> Sort {
    Sort::by(CREATE_TIME_FIELD, SortOrder::Desc)
}

fn to_document<T: Serialize>(entity: &T) -> Result<Value, StorageError> {
    serde_json::to_value(entity).map_err(|e| {
        error!(error = %e, "Failed to serialize document");
        StorageError::internal("error serializing document")
    })
}

fn from_source<T: DeserializeOwned>(source: Value) -> Result<T, StorageError> {
    serde_json::from_value(source).map_err(|e| {
        error!(error = %e, "Failed to decode stored document");
        StorageError::internal("error decoding stored document")
    })
}

fn require_id(kind: &str, id: &str) -> Result<(), StorageError> {
    if id.is_empty() {
        return Err(StorageError::invalid_argument(format!("{} id is required", kind)));
    }
    Ok(())
}

#[async_trait]
impl ProjectStorage for ElasticsearchStorage {
    #[instrument(skip(self, ctx, project))]
    async fn create_project(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        mut project: Project,
    ) -> Result<Project, StorageError> {
        require_id("project", project_id)?;
        let name = Project::name_for(project_id);
        let alias = self.projects_alias();

        if self.exists(ctx, &alias, &name).await? {
            return Err(StorageError::already_exists(format!(
                "project {} already exists",
                name
            )));
        }

        project.name = name.clone();
        self.create_document(ctx, &alias, &name, &project).await?;

        for info in [
            self.indexes.occurrences_index(project_id),
            self.indexes.notes_index(project_id),
        ] {
            self.indexes
                .create_index(ctx, self.client.as_ref(), &info, false)
                .await?;
        }

        info!(project = %name, "Project created");
        Ok(project)
    }

    #[instrument(skip(self, ctx))]
    async fn get_project(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
    ) -> Result<Project, StorageError> {
        let name = Project::name_for(project_id);
        self.find_by_name(ctx, &self.projects_alias(), &name)
            .await?
            .map(|(_, project)| project)
            .ok_or_else(|| StorageError::not_found(format!("project {} not found", name)))
    }

    #[instrument(skip(self, ctx))]
    async fn list_projects(
        &self,
        ctx: &CancellationToken,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Project>, StorageError> {
        self.list(
            ctx,
            &self.projects_alias(),
            filter,
            None,
            Sort::default(),
            pagination(page_size, page_token),
        )
        .await
    }

    #[instrument(skip(self, ctx))]
    async fn delete_project(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
    ) -> Result<(), StorageError> {
        let name = Project::name_for(project_id);
        self.delete_by_name(ctx, &self.projects_alias(), &name)
            .await?;

        for info in [
            self.indexes.occurrences_index(project_id),
            self.indexes.notes_index(project_id),
        ] {
            // The alias may still point at an index from an older mapping version.
            let mut targets = self
                .client
                .get_alias(ctx, &info.alias)
                .await
                .map_err(|e| {
                    StorageError::from_engine(format!("error resolving alias {}", info.alias), e)
                })?;
            if targets.is_empty() {
                targets.push(info.index);
            }
            for index in targets {
                self.client.delete_index(ctx, &index).await.map_err(|e| {
                    StorageError::from_engine(format!("error deleting index {}", index), e)
                })?;
            }
        }

        info!(project = %name, "Project deleted");
        Ok(())
    }
}

#[async_trait]
impl GrafeasStorage for ElasticsearchStorage {
    #[instrument(skip(self, ctx))]
    async fn get_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
    ) -> Result<Occurrence, StorageError> {
        let name = Occurrence::name_for(project_id, occurrence_id);
        self.find_by_name(ctx, &self.occurrences_alias(project_id), &name)
            .await?
            .map(|(_, occurrence)| occurrence)
            .ok_or_else(|| StorageError::not_found(format!("occurrence {} not found", name)))
    }

    #[instrument(skip(self, ctx))]
    async fn list_occurrences(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Occurrence>, StorageError> {
        self.list(
            ctx,
            &self.occurrences_alias(project_id),
            filter,
            None,
            newest_first(),
            pagination(page_size, page_token),
        )
        .await
    }

    #[instrument(skip(self, ctx, occurrence))]
    async fn create_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        mut occurrence: Occurrence,
    ) -> Result<Occurrence, StorageError> {
        occurrence.name = Occurrence::name_for(project_id, &Uuid::new_v4().to_string());
        occurrence.create_time.get_or_insert_with(Utc::now);

        let name = occurrence.name.clone();
        self.create_document(ctx, &self.occurrences_alias(project_id), &name, &occurrence)
            .await?;
        debug!(occurrence = %name, "Occurrence created");
        Ok(occurrence)
    }

    #[instrument(skip(self, ctx, occurrences), fields(count = occurrences.len()))]
    async fn batch_create_occurrences(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        mut occurrences: Vec<Occurrence>,
    ) -> Result<BatchCreateResult<Occurrence, StorageError>, StorageError> {
        if occurrences.is_empty() {
            return Ok(BatchCreateResult::default());
        }

        let now = Utc::now();
        for occurrence in &mut occurrences {
            occurrence.name = Occurrence::name_for(project_id, &Uuid::new_v4().to_string());
            occurrence.create_time.get_or_insert(now);
        }

        let results = match self
            .bulk_create(ctx, &self.occurrences_alias(project_id), &occurrences)
            .await
        {
            Ok(results) => results,
            Err(err) if err.kind() == ErrorKind::Cancelled => return Err(err),
            Err(err) => return Ok(BatchCreateResult::failed(err)),
        };

        let mut batch = BatchCreateResult::default();
        for (occurrence, result) in occurrences.into_iter().zip(results) {
            match result {
                Ok(()) => batch.created.push(occurrence),
                Err(err) => batch.errors.push(err),
            }
        }
        debug!(
            created = batch.created.len(),
            failed = batch.errors.len(),
            "Occurrences batch created"
        );
        Ok(batch)
    }

    #[instrument(skip(self, ctx, patch, mask))]
    async fn update_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
        patch: Occurrence,
        mask: &FieldMask,
    ) -> Result<Occurrence, StorageError> {
        let name = Occurrence::name_for(project_id, occurrence_id);
        self.patch_document(ctx, &self.occurrences_alias(project_id), &name, &patch, mask)
            .await
    }

    #[instrument(skip(self, ctx))]
    async fn delete_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
    ) -> Result<(), StorageError> {
        let name = Occurrence::name_for(project_id, occurrence_id);
        self.delete_by_name(ctx, &self.occurrences_alias(project_id), &name)
            .await
    }

    #[instrument(skip(self, ctx))]
    async fn get_occurrence_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
    ) -> Result<Note, StorageError> {
        let occurrence = self.get_occurrence(ctx, project_id, occurrence_id).await?;
        let note_name = occurrence.note_name.unwrap_or_default();
        let Some((note_project, note_id)) = Note::parse_name(&note_name) else {
            error!(occurrence = %occurrence.name, note = %note_name, "Occurrence has an invalid note name");
            return Err(StorageError::internal(format!(
                "occurrence {} has an invalid note name",
                occurrence.name
            )));
        };
        self.get_note(ctx, note_project, note_id).await
    }

    #[instrument(skip(self, ctx))]
    async fn get_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
    ) -> Result<Note, StorageError> {
        let name = Note::name_for(project_id, note_id);
        self.find_by_name(ctx, &self.notes_alias(project_id), &name)
            .await?
            .map(|(_, note)| note)
            .ok_or_else(|| StorageError::not_found(format!("note {} not found", name)))
    }

    #[instrument(skip(self, ctx))]
    async fn list_notes(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Note>, StorageError> {
        self.list(
            ctx,
            &self.notes_alias(project_id),
            filter,
            None,
            newest_first(),
            pagination(page_size, page_token),
        )
        .await
    }

    #[instrument(skip(self, ctx, note))]
    async fn create_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
        mut note: Note,
    ) -> Result<Note, StorageError> {
        require_id("note", note_id)?;
        let name = Note::name_for(project_id, note_id);
        let alias = self.notes_alias(project_id);

        if self.exists(ctx, &alias, &name).await? {
            return Err(StorageError::already_exists(format!(
                "note {} already exists",
                name
            )));
        }

        note.name = name.clone();
        note.create_time.get_or_insert_with(Utc::now);
        self.create_document(ctx, &alias, &name, &note).await?;
        debug!(note = %name, "Note created");
        Ok(note)
    }

    #[instrument(skip(self, ctx, notes), fields(count = notes.len()))]
    async fn batch_create_notes(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        notes: Vec<(String, Note)>,
    ) -> Result<BatchCreateResult<Note, StorageError>, StorageError> {
        if notes.is_empty() {
            return Ok(BatchCreateResult::default());
        }
        let alias = self.notes_alias(project_id);
        let now = Utc::now();

        let mut named = Vec::with_capacity(notes.len());
        for (note_id, mut note) in notes {
            require_id("note", &note_id)?;
            note.name = Note::name_for(project_id, &note_id);
            note.create_time.get_or_insert(now);
            named.push(note);
        }

        let queries: Vec<Option<Query>> = named
            .iter()
            .map(|note| Some(Query::term(NAME_FIELD, note.name.as_str())))
            .collect();
        let existing = match self.client.multi_search(ctx, &alias, &queries).await {
            Ok(responses) => responses,
            Err(EngineError::Cancelled) => {
                return Err(StorageError::cancelled("batch note creation cancelled"))
            }
            Err(e) => {
                return Ok(BatchCreateResult::failed(StorageError::from_engine(
                    "error checking for existing notes",
                    e,
                )))
            }
        };

        let mut batch = BatchCreateResult::default();
        let mut seen = HashSet::new();
        let mut survivors = Vec::new();
        for (note, response) in named.into_iter().zip(existing) {
            if !response.hits.is_empty() || !seen.insert(note.name.clone()) {
                warn!(note = %note.name, "Skipping note that already exists");
                batch.errors.push(StorageError::already_exists(format!(
                    "note {} already exists",
                    note.name
                )));
                continue;
            }
            survivors.push(note);
        }
        if survivors.is_empty() {
            return Ok(batch);
        }

        let results = match self.bulk_create(ctx, &alias, &survivors).await {
            Ok(results) => results,
            Err(err) if err.kind() == ErrorKind::Cancelled => return Err(err),
            Err(err) => {
                batch.errors.push(err);
                return Ok(batch);
            }
        };
        for (note, result) in survivors.into_iter().zip(results) {
            match result {
                Ok(()) => batch.created.push(note),
                Err(err) => batch.errors.push(err),
            }
        }
        debug!(
            created = batch.created.len(),
            failed = batch.errors.len(),
            "Notes batch created"
        );
        Ok(batch)
    }

    #[instrument(skip(self, ctx, patch, mask))]
    async fn update_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
        patch: Note,
        mask: &FieldMask,
    ) -> Result<Note, StorageError> {
        let name = Note::name_for(project_id, note_id);
        self.patch_document(ctx, &self.notes_alias(project_id), &name, &patch, mask)
            .await
    }

    #[instrument(skip(self, ctx))]
    async fn delete_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
    ) -> Result<(), StorageError> {
        let name = Note::name_for(project_id, note_id);
        self.delete_by_name(ctx, &self.notes_alias(project_id), &name)
            .await
    }

    #[instrument(skip(self, ctx))]
    async fn list_note_occurrences(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Occurrence>, StorageError> {
        let note_name = Note::name_for(project_id, note_id);
        self.list(
            ctx,
            &all_projects_pattern(DocumentKind::Occurrences),
            filter,
            Some(Query::term(NOTE_NAME_FIELD, note_name)),
            newest_first(),
            pagination(page_size, page_token),
        )
        .await
    }

    #[instrument(skip(self, _ctx))]
    async fn get_vulnerability_occurrences_summary(
        &self,
        _ctx: &CancellationToken,
        _project_id: &str,
        filter: &str,
    ) -> Result<VulnerabilityOccurrencesSummary, StorageError> {
        self.filterer.parse_expression(filter)?;
        Ok(VulnerabilityOccurrencesSummary::default())
    }
}
