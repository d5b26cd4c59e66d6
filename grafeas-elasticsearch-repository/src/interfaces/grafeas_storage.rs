//! Grafeas storage trait definition.

use async_trait::async_trait;
use grafeas_elasticsearch_shared::{
    BatchCreateResult, FieldMask, Note, Occurrence, Page, VulnerabilityOccurrencesSummary,
};
use tokio_util::sync::CancellationToken;

use crate::errors::StorageError;

/// Persistence contract for occurrences and notes.
///
/// Every list operation takes a filter expression, a page size and a page
/// token. An empty filter matches everything; a page size of zero with an
/// empty token returns a single unpaginated page of at most 1000 entries.
#[async_trait]
pub trait GrafeasStorage: Send + Sync {
    /// Fetch an occurrence.
    async fn get_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
    ) -> Result<Occurrence, StorageError>;

    /// List the occurrences of a project, newest first.
    async fn list_occurrences(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Occurrence>, StorageError>;

    /// Store a new occurrence under a generated id.
    ///
    /// # Returns
    ///
    /// * `Ok(Occurrence)` - The stored occurrence with its `name` and `createTime` set
    /// * `Err(StorageError)` - If the engine rejects the document
    async fn create_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence: Occurrence,
    ) -> Result<Occurrence, StorageError>;

    /// Store several occurrences in one request.
    ///
    /// Items the engine rejects are reported in `errors`; the rest are
    /// returned in `created`. A request-level failure yields no successes and
    /// a single error.
    async fn batch_create_occurrences(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrences: Vec<Occurrence>,
    ) -> Result<BatchCreateResult<Occurrence, StorageError>, StorageError>;

    /// Merge the fields named by `mask` from `patch` into a stored occurrence.
    ///
    /// An empty mask replaces every field except `name` and `createTime`.
    ///
    /// # Returns
    ///
    /// * `Ok(Occurrence)` - The updated occurrence
    /// * `Err(StorageError::NotFound)` - If no such occurrence exists
    /// * `Err(StorageError::InvalidArgument)` - If the mask contains a malformed path
    async fn update_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
        patch: Occurrence,
        mask: &FieldMask,
    ) -> Result<Occurrence, StorageError>;

    /// Delete an occurrence.
    async fn delete_occurrence(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
    ) -> Result<(), StorageError>;

    /// Fetch the note an occurrence refers to through its `noteName`.
    async fn get_occurrence_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        occurrence_id: &str,
    ) -> Result<Note, StorageError>;

    /// Fetch a note.
    async fn get_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
    ) -> Result<Note, StorageError>;

    /// List the notes of a project, newest first.
    async fn list_notes(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Note>, StorageError>;

    /// Store a note under a caller-chosen id.
    ///
    /// # Returns
    ///
    /// * `Ok(Note)` - The stored note
    /// * `Err(StorageError::AlreadyExists)` - If a note with this id exists
    async fn create_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
        note: Note,
    ) -> Result<Note, StorageError>;

    /// Store several notes, skipping ids that already exist.
    ///
    /// Created notes are returned in input order. Every note that was not
    /// created contributes one error.
    async fn batch_create_notes(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        notes: Vec<(String, Note)>,
    ) -> Result<BatchCreateResult<Note, StorageError>, StorageError>;

    /// Merge the fields named by `mask` from `patch` into a stored note.
    async fn update_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
        patch: Note,
        mask: &FieldMask,
    ) -> Result<Note, StorageError>;

    /// Delete a note.
    async fn delete_note(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
    ) -> Result<(), StorageError>;

    /// List the occurrences of a note across every project.
    async fn list_note_occurrences(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        note_id: &str,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Occurrence>, StorageError>;

    /// Summarize the vulnerability occurrences of a project.
    async fn get_vulnerability_occurrences_summary(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        filter: &str,
    ) -> Result<VulnerabilityOccurrencesSummary, StorageError>;
}
