//! Provider-agnostic pull request automation abstraction.
//!
//! The automation pipeline iterates repositories and drives pull requests through the
//! [`ScmService`] trait without knowing which hosting provider sits behind it. A provider
//! adapter supplies its own repository and pull request types, exposed through the
//! [`Repository`] and [`PullRequest`] traits.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Status of a pull request as seen by the automation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestStatus {
    /// The provider reported a state that cannot be interpreted.
    #[default]
    Unknown,
    /// Open, with checks or merge evaluation still running.
    Pending,
    /// Open and ready to merge.
    Success,
    /// Open but cannot be merged (conflicts, failed policies).
    Error,
    /// Closed without merging.
    Closed,
    /// Merged into the target branch.
    Merged,
}

impl fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
            Self::Closed => "closed",
            Self::Merged => "merged",
        };
        f.write_str(name)
    }
}

/// A repository the pipeline can clone and open pull requests against.
pub trait Repository: fmt::Debug + Clone + Send + Sync {
    /// URL used to clone the repository.
    fn clone_url(&self) -> &str;

    /// Short name of the default branch (without `refs/heads/`).
    fn default_branch(&self) -> &str;

    /// Human-readable `owner/name` identifier.
    fn full_name(&self) -> String;
}

/// A pull request previously created or found by a provider.
pub trait PullRequest: fmt::Debug + fmt::Display + Clone + Send + Sync {
    fn status(&self) -> PullRequestStatus;

    /// Web URL where the pull request can be viewed.
    fn url(&self) -> &str;
}

/// Description of a pull request to open, or of the desired state of an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// Branch carrying the changes.
    pub head: String,
    /// Branch the changes should be merged into.
    pub base: String,
    pub reviewers: Vec<String>,
    pub team_reviewers: Vec<String>,
    pub assignees: Vec<String>,
    pub draft: bool,
    pub labels: Vec<String>,
}

impl NewPullRequest {
    /// Whether any reviewer, team reviewer or assignee was requested.
    #[must_use]
    pub fn requests_reviewers(&self) -> bool {
        !self.reviewers.is_empty() || !self.team_reviewers.is_empty() || !self.assignees.is_empty()
    }
}

/// Operations a hosting provider adapter offers to the automation pipeline.
#[async_trait]
pub trait ScmService: Send + Sync {
    type Repository: Repository;
    type PullRequest: PullRequest;

    /// Lists every repository selected by the adapter's configuration.
    async fn get_repositories(&self) -> Result<Vec<Self::Repository>>;

    /// Lists pull requests opened from `branch_name` across all selected repositories.
    async fn get_pull_requests(&self, branch_name: &str) -> Result<Vec<Self::PullRequest>>;

    /// Returns the open pull request from `branch_name` in `repo`, if any.
    async fn get_open_pull_request(
        &self,
        repo: &Self::Repository,
        branch_name: &str,
    ) -> Result<Option<Self::PullRequest>>;

    /// Opens a pull request in `repo`. `pr_repo` is the repository holding the head branch,
    /// which differs from `repo` only for fork-based workflows.
    async fn create_pull_request(
        &self,
        repo: &Self::Repository,
        pr_repo: &Self::Repository,
        new_pr: &NewPullRequest,
    ) -> Result<Self::PullRequest>;

    /// Brings an existing pull request in line with `updated_pr`.
    async fn update_pull_request(
        &self,
        repo: &Self::Repository,
        pull_request: &Self::PullRequest,
        updated_pr: &NewPullRequest,
    ) -> Result<Self::PullRequest>;

    async fn merge_pull_request(&self, pull_request: &Self::PullRequest) -> Result<()>;

    async fn close_pull_request(&self, pull_request: &Self::PullRequest) -> Result<()>;

    /// Forks `repo`, optionally under `new_owner`.
    async fn fork_repository(
        &self,
        repo: &Self::Repository,
        new_owner: Option<&str>,
    ) -> Result<Self::Repository>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// # Status Display
    ///
    /// Tests the lowercase rendering of every pull request status.
    ///
    /// ## Test Scenario
    /// - Formats each status variant
    ///
    /// ## Expected Outcome
    /// - Rendered names match their serde names
    #[test]
    fn test_status_display_matches_serde() {
        for status in [
            PullRequestStatus::Unknown,
            PullRequestStatus::Pending,
            PullRequestStatus::Success,
            PullRequestStatus::Error,
            PullRequestStatus::Closed,
            PullRequestStatus::Merged,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    /// # Reviewer Request Detection
    ///
    /// Tests which fields count as a reviewer request.
    ///
    /// ## Test Scenario
    /// - Checks an empty request, then requests with each reviewer kind
    /// - Labels alone must not count
    ///
    /// ## Expected Outcome
    /// - Only reviewers, team reviewers and assignees trigger reconciliation
    #[test]
    fn test_requests_reviewers() {
        let empty = NewPullRequest::default();
        assert!(!empty.requests_reviewers());

        let labels_only = NewPullRequest {
            labels: vec!["automated".to_string()],
            ..NewPullRequest::default()
        };
        assert!(!labels_only.requests_reviewers());

        let with_team = NewPullRequest {
            team_reviewers: vec!["platform".to_string()],
            ..NewPullRequest::default()
        };
        assert!(with_team.requests_reviewers());

        let with_assignee = NewPullRequest {
            assignees: vec!["jane".to_string()],
            ..NewPullRequest::default()
        };
        assert!(with_assignee.requests_reviewers());
    }
}
