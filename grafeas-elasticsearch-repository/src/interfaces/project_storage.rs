//! Project storage trait definition.

use async_trait::async_trait;
use grafeas_elasticsearch_shared::{Page, Project};
use tokio_util::sync::CancellationToken;

use crate::errors::StorageError;

/// Persistence contract for projects.
///
/// A project owns one occurrences collection and one notes collection, which
/// exist exactly as long as the project does.
#[async_trait]
pub trait ProjectStorage: Send + Sync {
    /// Create a project and its dependent collections.
    ///
    /// # Returns
    ///
    /// * `Ok(Project)` - The stored project, named `projects/{project_id}`
    /// * `Err(StorageError::AlreadyExists)` - If the project already exists
    async fn create_project(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
        project: Project,
    ) -> Result<Project, StorageError>;

    /// Fetch a project.
    ///
    /// # Returns
    ///
    /// * `Ok(Project)` - The stored project
    /// * `Err(StorageError::NotFound)` - If no such project exists
    async fn get_project(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
    ) -> Result<Project, StorageError>;

    /// List projects matching `filter`.
    ///
    /// A `page_size` of zero with an empty `page_token` returns a single
    /// unpaginated page.
    async fn list_projects(
        &self,
        ctx: &CancellationToken,
        filter: &str,
        page_size: usize,
        page_token: &str,
    ) -> Result<Page<Project>, StorageError>;

    /// Delete a project and its dependent collections.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the project was deleted
    /// * `Err(StorageError::NotFound)` - If no such project exists
    async fn delete_project(
        &self,
        ctx: &CancellationToken,
        project_id: &str,
    ) -> Result<(), StorageError>;
}
