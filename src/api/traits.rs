//! Traits for Azure DevOps API operations.
//!
//! These traits abstract the Azure DevOps REST calls the adapter makes so that:
//! - the service logic can be tested against in-memory mocks
//! - the generated client models stay confined to this module
//!
//! Each trait covers one REST area. [`AzureDevOpsOperations`] combines them and is
//! implemented for every type implementing all of them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::http::Method;
use azure_devops_rust_api::git::models as git_models;
use azure_devops_rust_api::graph::models as graph_models;

use super::client::AzureDevOpsClient;
use super::records::{
    ConnectionDataRecord, GraphSubjectRecord, IdentityRecord, ListEnvelope, ProjectRecord,
    ProjectState, PullRequestCreate, PullRequestQuery, PullRequestRecord, PullRequestUpdate,
    RefRecord, RefUpdate, RepositoryRecord, ReviewerRecord, SubjectQuery, TagRecord, reshape,
    reshape_body,
};

/// Project listing.
#[async_trait]
pub trait ProjectOperations: Send + Sync {
    /// Lists the projects of the organization in the given state.
    async fn list_projects(&self, state_filter: ProjectState) -> Result<Vec<ProjectRecord>>;
}

/// Repository listing.
#[async_trait]
pub trait RepositoryOperations: Send + Sync {
    async fn list_repositories(&self, project: &str) -> Result<Vec<RepositoryRecord>>;
}

/// Pull request lookup, creation and updates.
#[async_trait]
pub trait PullRequestOperations: Send + Sync {
    /// Lists pull requests of a whole project whose source ref is `source_ref_name`.
    async fn list_project_pull_requests(
        &self,
        project: &str,
        source_ref_name: &str,
    ) -> Result<Vec<PullRequestRecord>>;

    async fn list_repository_pull_requests(
        &self,
        project: &str,
        repository: &str,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestRecord>>;

    /// Creates a pull request without reviewers.
    async fn create_pull_request(
        &self,
        project: &str,
        repository: &str,
        pull_request: &PullRequestCreate,
    ) -> Result<PullRequestRecord>;

    async fn update_pull_request(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        update: &PullRequestUpdate,
    ) -> Result<PullRequestRecord>;
}

/// Pull request labels.
#[async_trait]
pub trait LabelOperations: Send + Sync {
    async fn list_labels(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
    ) -> Result<Vec<TagRecord>>;

    async fn create_label(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        name: &str,
    ) -> Result<()>;

    async fn delete_label(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        name: &str,
    ) -> Result<()>;
}

/// Pull request reviewers.
#[async_trait]
pub trait ReviewerOperations: Send + Sync {
    async fn list_reviewers(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
    ) -> Result<Vec<ReviewerRecord>>;

    async fn create_reviewer(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        reviewer: &ReviewerRecord,
    ) -> Result<()>;

    async fn delete_reviewer(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        reviewer_id: &str,
    ) -> Result<()>;
}

/// Git refs.
#[async_trait]
pub trait RefOperations: Send + Sync {
    /// Lists refs whose name (without `refs/`) starts with `filter`.
    async fn list_refs(
        &self,
        project: &str,
        repository: &str,
        filter: &str,
        top: i32,
    ) -> Result<Vec<RefRecord>>;

    async fn update_refs(
        &self,
        project: &str,
        repository: &str,
        updates: &[RefUpdate],
    ) -> Result<()>;
}

/// Graph subject queries (current identity API).
#[async_trait]
pub trait GraphOperations: Send + Sync {
    async fn query_subjects(&self, query: &SubjectQuery) -> Result<Vec<GraphSubjectRecord>>;
}

/// Legacy identity service.
#[async_trait]
pub trait IdentityOperations: Send + Sync {
    /// General search of identities by free text.
    async fn read_identities(&self, filter_value: &str) -> Result<Vec<IdentityRecord>>;

    /// Translates graph subject descriptors to legacy identities.
    async fn read_identity_batch(
        &self,
        subject_descriptors: &[String],
    ) -> Result<Vec<IdentityRecord>>;
}

/// Connection metadata.
#[async_trait]
pub trait LocationOperations: Send + Sync {
    async fn connection_data(&self) -> Result<ConnectionDataRecord>;
}

/// Combined trait for every operation the adapter needs.
pub trait AzureDevOpsOperations:
    ProjectOperations
    + RepositoryOperations
    + PullRequestOperations
    + LabelOperations
    + ReviewerOperations
    + RefOperations
    + GraphOperations
    + IdentityOperations
    + LocationOperations
    + Send
    + Sync
{
}

impl<T> AzureDevOpsOperations for T where
    T: ProjectOperations
        + RepositoryOperations
        + PullRequestOperations
        + LabelOperations
        + ReviewerOperations
        + RefOperations
        + GraphOperations
        + IdentityOperations
        + LocationOperations
        + Send
        + Sync
{
}

#[async_trait]
impl ProjectOperations for AzureDevOpsClient {
    async fn list_projects(&self, state_filter: ProjectState) -> Result<Vec<ProjectRecord>> {
        let response = self
            .core_client
            .projects_client()
            .list(&self.organization)
            .state_filter(state_filter.as_str())
            .await?;
        let list: ListEnvelope<ProjectRecord> = reshape(&response)?;
        Ok(list.value)
    }
}

#[async_trait]
impl RepositoryOperations for AzureDevOpsClient {
    async fn list_repositories(&self, project: &str) -> Result<Vec<RepositoryRecord>> {
        let response = self
            .git_client
            .repositories_client()
            .list(&self.organization, project)
            .await?;
        let list: ListEnvelope<RepositoryRecord> = reshape(&response)?;
        Ok(list.value)
    }
}

#[async_trait]
impl PullRequestOperations for AzureDevOpsClient {
    async fn list_project_pull_requests(
        &self,
        project: &str,
        source_ref_name: &str,
    ) -> Result<Vec<PullRequestRecord>> {
        let response = self
            .git_client
            .pull_requests_client()
            .get_pull_requests_by_project(&self.organization, project)
            .search_criteria_source_ref_name(source_ref_name)
            .await?;
        let list: ListEnvelope<PullRequestRecord> = reshape(&response)?;
        Ok(list.value)
    }

    async fn list_repository_pull_requests(
        &self,
        project: &str,
        repository: &str,
        query: &PullRequestQuery,
    ) -> Result<Vec<PullRequestRecord>> {
        let mut request = self
            .git_client
            .pull_requests_client()
            .get_pull_requests(&self.organization, repository, project);
        if let Some(status) = query.status {
            request = request.search_criteria_status(status.as_str());
        }
        if let Some(source_ref_name) = &query.source_ref_name {
            request = request.search_criteria_source_ref_name(source_ref_name.as_str());
        }
        if let Some(top) = query.top {
            request = request.top(top);
        }

        let response = request.await?;
        let list: ListEnvelope<PullRequestRecord> = reshape(&response)?;
        Ok(list.value)
    }

    async fn create_pull_request(
        &self,
        project: &str,
        repository: &str,
        pull_request: &PullRequestCreate,
    ) -> Result<PullRequestRecord> {
        let body: git_models::GitPullRequestCreateOptions = reshape_body(pull_request)?;
        let created = self
            .git_client
            .pull_requests_client()
            .create(&self.organization, repository, project, body)
            .supports_iterations(true)
            .await?;
        reshape(&created)
    }

    async fn update_pull_request(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        update: &PullRequestUpdate,
    ) -> Result<PullRequestRecord> {
        // Sent as plain JSON: the generated update model drops the retarget and merge fields.
        let url = self.rest_client.url(&format!(
            "{}/{project}/_apis/git/repositories/{repository}/pullrequests/{pull_request_id}",
            self.organization
        ))?;
        let request = self.rest_client.request(Method::Patch, url, Some(update))?;
        self.rest_client
            .send(request)
            .await
            .with_context(|| format!("Failed to update pull request {pull_request_id}"))
    }
}

#[async_trait]
impl LabelOperations for AzureDevOpsClient {
    async fn list_labels(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
    ) -> Result<Vec<TagRecord>> {
        let response = self
            .git_client
            .pull_request_labels_client()
            .list(&self.organization, repository, pull_request_id, project)
            .await?;
        let list: ListEnvelope<TagRecord> = reshape(&response)?;
        Ok(list.value)
    }

    async fn create_label(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        name: &str,
    ) -> Result<()> {
        let label_data = git_models::WebApiCreateTagRequestData {
            name: name.to_string(),
        };

        self.git_client
            .pull_request_labels_client()
            .create(
                &self.organization,
                label_data,
                repository,
                pull_request_id,
                project,
            )
            .await?;
        Ok(())
    }

    async fn delete_label(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        name: &str,
    ) -> Result<()> {
        self.git_client
            .pull_request_labels_client()
            .delete(
                &self.organization,
                repository,
                pull_request_id,
                name,
                project,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewerOperations for AzureDevOpsClient {
    async fn list_reviewers(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
    ) -> Result<Vec<ReviewerRecord>> {
        let response = self
            .git_client
            .pull_request_reviewers_client()
            .list(&self.organization, repository, pull_request_id, project)
            .await?;
        let list: ListEnvelope<ReviewerRecord> = reshape(&response)?;
        Ok(list.value)
    }

    async fn create_reviewer(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        reviewer: &ReviewerRecord,
    ) -> Result<()> {
        let body: git_models::IdentityRefWithVote = reshape_body(reviewer)?;
        self.git_client
            .pull_request_reviewers_client()
            .create_pull_request_reviewer(
                &self.organization,
                body,
                repository,
                pull_request_id,
                &reviewer.id,
                project,
            )
            .await?;
        Ok(())
    }

    async fn delete_reviewer(
        &self,
        project: &str,
        repository: &str,
        pull_request_id: i32,
        reviewer_id: &str,
    ) -> Result<()> {
        self.git_client
            .pull_request_reviewers_client()
            .delete(
                &self.organization,
                repository,
                pull_request_id,
                reviewer_id,
                project,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RefOperations for AzureDevOpsClient {
    async fn list_refs(
        &self,
        project: &str,
        repository: &str,
        filter: &str,
        top: i32,
    ) -> Result<Vec<RefRecord>> {
        let response = self
            .git_client
            .refs_client()
            .list(&self.organization, repository, project)
            .filter(filter)
            .top(top)
            .await?;
        let list: ListEnvelope<RefRecord> = reshape(&response)?;
        Ok(list.value)
    }

    async fn update_refs(
        &self,
        project: &str,
        repository: &str,
        updates: &[RefUpdate],
    ) -> Result<()> {
        let body: Vec<git_models::GitRefUpdate> = reshape_body(updates)?;
        self.git_client
            .refs_client()
            .update_refs(&self.organization, body, repository, project)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl GraphOperations for AzureDevOpsClient {
    async fn query_subjects(&self, query: &SubjectQuery) -> Result<Vec<GraphSubjectRecord>> {
        let body: graph_models::GraphSubjectQuery = reshape_body(query)?;
        let response = self
            .graph_client
            .subject_query_client()
            .query(&self.organization, body)
            .await?;
        let list: ListEnvelope<GraphSubjectRecord> = reshape(&response)?;
        Ok(list.value)
    }
}

#[async_trait]
impl IdentityOperations for AzureDevOpsClient {
    async fn read_identities(&self, filter_value: &str) -> Result<Vec<IdentityRecord>> {
        let response = self
            .ims_client
            .identities_client()
            .read_identities(&self.organization)
            .search_filter("General")
            .filter_value(filter_value)
            .query_membership("none")
            .await?;
        let list: ListEnvelope<IdentityRecord> = reshape(&response)?;
        Ok(list.value)
    }

    async fn read_identity_batch(
        &self,
        subject_descriptors: &[String],
    ) -> Result<Vec<IdentityRecord>> {
        let response = self
            .ims_client
            .identities_client()
            .read_identities(&self.organization)
            .subject_descriptors(subject_descriptors.join(","))
            .query_membership("none")
            .await?;
        let list: ListEnvelope<IdentityRecord> = reshape(&response)?;
        Ok(list.value)
    }
}

#[async_trait]
impl LocationOperations for AzureDevOpsClient {
    async fn connection_data(&self) -> Result<ConnectionDataRecord> {
        let url = self
            .rest_client
            .url(&format!("{}/_apis/connectionData", self.organization))?;
        let request = self.rest_client.request::<()>(Method::Get, url, None)?;
        self.rest_client
            .send(request)
            .await
            .context("Failed to fetch connection data")
    }
}
