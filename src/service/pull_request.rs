//! Pull request translation and mutations.

use std::fmt;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use super::AzureDevOpsService;
use super::identity::IdentityCache;
use super::reconcile::{LabelTarget, ReviewerTarget, reconcile};
use super::repository::AdoRepository;
use crate::api::AzureDevOpsOperations;
use crate::api::records::{
    CommitRef, CompletionOptions, IdentityReference, MergeStatus, PullRequestCreate,
    PullRequestLifecycle, PullRequestQuery, PullRequestRecord, PullRequestUpdate, RefUpdate,
    TagRecord, ZERO_OBJECT_ID,
};
use crate::scm::{self, NewPullRequest, PullRequestStatus};

const HEADS_PREFIX: &str = "refs/heads/";

/// An Azure DevOps pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdoPullRequest {
    pub id: i32,
    pub project_id: String,
    pub project_name: String,
    pub repository_id: String,
    pub repository_name: String,
    pub title: String,
    pub status: PullRequestStatus,
    pub is_draft: bool,
    /// Empty when the provider response did not include the repository web URL.
    pub web_url: String,
    pub source_ref: String,
    pub target_ref: String,
    /// Absent while the provider has not evaluated a merge yet.
    pub last_merge_source_commit: Option<String>,
}

impl fmt::Display for AdoPullRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} #{}",
            self.project_name, self.repository_name, self.id
        )
    }
}

impl scm::PullRequest for AdoPullRequest {
    fn status(&self) -> PullRequestStatus {
        self.status
    }

    fn url(&self) -> &str {
        &self.web_url
    }
}

/// Full ref of a branch name. Names that already are a full branch ref are kept.
pub fn branch_ref(branch: &str) -> String {
    let short = branch.strip_prefix(HEADS_PREFIX).unwrap_or(branch);
    format!("{HEADS_PREFIX}{short}")
}

/// Branch name of a full branch ref.
pub fn short_branch_name(full_ref: &str) -> &str {
    full_ref.strip_prefix(HEADS_PREFIX).unwrap_or(full_ref)
}

/// Translates the provider lifecycle and merge evaluation into a generic status.
pub fn convert_pull_request_status(
    lifecycle: PullRequestLifecycle,
    merge_status: Option<MergeStatus>,
) -> PullRequestStatus {
    match lifecycle {
        PullRequestLifecycle::Active => match merge_status {
            None | Some(MergeStatus::NotSet) | Some(MergeStatus::Queued) => {
                PullRequestStatus::Pending
            }
            Some(MergeStatus::Succeeded) => PullRequestStatus::Success,
            Some(MergeStatus::Conflicts)
            | Some(MergeStatus::Failure)
            | Some(MergeStatus::RejectedByPolicy) => PullRequestStatus::Error,
            Some(MergeStatus::Unrecognized) => PullRequestStatus::Unknown,
        },
        PullRequestLifecycle::Abandoned => PullRequestStatus::Closed,
        PullRequestLifecycle::Completed => PullRequestStatus::Merged,
        PullRequestLifecycle::NotSet
        | PullRequestLifecycle::All
        | PullRequestLifecycle::Unrecognized => PullRequestStatus::Unknown,
    }
}

pub fn convert_pull_request(record: &PullRequestRecord) -> AdoPullRequest {
    let repository = &record.repository;
    let web_url = repository
        .web_url
        .as_deref()
        .map(|url| format!("{}/pullrequest/{}", url.trim_end_matches('/'), record.pull_request_id))
        .unwrap_or_default();

    AdoPullRequest {
        id: record.pull_request_id,
        project_id: repository.project.id.clone(),
        project_name: repository.project.name.clone(),
        repository_id: repository.id.clone(),
        repository_name: repository.name.clone(),
        title: record.title.clone().unwrap_or_default(),
        status: convert_pull_request_status(record.status, record.merge_status),
        is_draft: record.is_draft,
        web_url,
        source_ref: record.source_ref_name.clone(),
        target_ref: record.target_ref_name.clone(),
        last_merge_source_commit: record
            .last_merge_source_commit
            .as_ref()
            .and_then(|commit| commit.commit_id.clone()),
    }
}

impl<O: AzureDevOpsOperations> AzureDevOpsService<O> {
    /// Pull requests from `branch` in the selected repositories of every selected project.
    pub(crate) async fn find_pull_requests(&self, branch: &str) -> Result<Vec<AdoPullRequest>> {
        let source_ref = branch_ref(branch);
        let listing = &self.config.listing;
        let mut pull_requests = Vec::new();

        for project in self.get_projects().await? {
            let records = self
                .ops
                .list_project_pull_requests(&project.id, &source_ref)
                .await
                .with_context(|| format!("Failed to list pull requests of {}", project.name))?;

            for record in &records {
                let pr = convert_pull_request(record);
                if !listing.includes_repository(&project.name, &pr.repository_name) {
                    debug!(pull_request = %pr, "Skipping pull request of an unselected repository");
                    continue;
                }
                debug!(pull_request = %pr, status = %pr.status, "Found pull request");
                pull_requests.push(pr);
            }
        }

        Ok(pull_requests)
    }

    pub(crate) async fn find_open_pull_request(
        &self,
        repository: &AdoRepository,
        branch: &str,
    ) -> Result<Option<AdoPullRequest>> {
        let query = PullRequestQuery {
            status: Some(PullRequestLifecycle::Active),
            source_ref_name: Some(branch_ref(branch)),
            top: Some(1),
        };
        let records = self
            .ops
            .list_repository_pull_requests(&repository.project_id, &repository.id, &query)
            .await
            .with_context(|| format!("Failed to look up open pull requests of {repository}"))?;

        Ok(records.first().map(convert_pull_request))
    }

    pub(crate) async fn open_pull_request(
        &self,
        repository: &AdoRepository,
        new_pr: &NewPullRequest,
    ) -> Result<AdoPullRequest> {
        let identities = self.identity_cache(new_pr).await?;

        let body = PullRequestCreate {
            source_ref_name: branch_ref(&new_pr.head),
            target_ref_name: branch_ref(&new_pr.base),
            title: new_pr.title.clone(),
            description: new_pr.body.clone(),
            is_draft: new_pr.draft,
            labels: new_pr.labels.iter().map(TagRecord::named).collect(),
        };

        let created = self
            .ops
            .create_pull_request(&repository.project_id, &repository.id, &body)
            .await
            .with_context(|| format!("Failed to create pull request in {repository}"))?;
        let pull_request = convert_pull_request(&created);
        info!(pull_request = %pull_request, "Created pull request");

        for reviewer in identities.combined_reviewers() {
            self.ops
                .create_reviewer(
                    &pull_request.project_id,
                    &pull_request.repository_id,
                    pull_request.id,
                    &reviewer,
                )
                .await
                .inspect_err(|e| error!(pull_request = %pull_request, reviewer = %reviewer.id, error = %e, "Failed to add reviewer"))
                .with_context(|| format!("Failed to add reviewer {} to {pull_request}", reviewer.id))?;
            debug!(pull_request = %pull_request, reviewer = %reviewer.id, required = reviewer.is_required, "Added reviewer");
        }

        if !new_pr.draft {
            self.set_auto_complete(identities, &pull_request).await;
        }

        Ok(pull_request)
    }

    pub(crate) async fn refresh_pull_request(
        &self,
        pull_request: &AdoPullRequest,
        updated_pr: &NewPullRequest,
    ) -> Result<AdoPullRequest> {
        let identities = self.identity_cache(updated_pr).await?;

        // The provider rejects an update that sets the target branch it already has.
        let target_ref = branch_ref(&updated_pr.base);
        let update = PullRequestUpdate {
            title: Some(updated_pr.title.clone()),
            description: Some(updated_pr.body.clone()),
            target_ref_name: (target_ref != pull_request.target_ref).then_some(target_ref),
            ..PullRequestUpdate::default()
        };

        let updated = self
            .ops
            .update_pull_request(
                &pull_request.project_id,
                &pull_request.repository_id,
                pull_request.id,
                &update,
            )
            .await
            .inspect_err(|e| error!(pull_request = %pull_request, error = %e, "Failed to update pull request"))
            .with_context(|| format!("Failed to update pull request {pull_request}"))?;
        let updated_pull_request = convert_pull_request(&updated);

        if updated_pr.requests_reviewers() {
            reconcile(
                &ReviewerTarget::new(&self.ops, &updated_pull_request),
                &identities.combined_reviewers(),
            )
            .await
            .inspect_err(|e| error!(pull_request = %pull_request, error = %e, "Failed to update reviewers"))
            .with_context(|| format!("Failed to update reviewers of {pull_request}"))?;
        }

        if !updated_pr.draft {
            self.set_auto_complete(identities, &updated_pull_request)
                .await;
        }

        if !updated_pr.labels.is_empty() {
            let labels = reconcile(
                &LabelTarget::new(&self.ops, &updated_pull_request),
                &updated_pr.labels,
            )
            .await;
            if let Err(e) = labels {
                error!(pull_request = %pull_request, error = %e, "Failed to update labels");
            }
        }

        Ok(updated_pull_request)
    }

    /// Completes the pull request at its last evaluated merge source commit.
    pub(crate) async fn complete_pull_request(&self, pull_request: &AdoPullRequest) -> Result<()> {
        let Some(commit_id) = &pull_request.last_merge_source_commit else {
            bail!("Pull request {pull_request} has no evaluated merge source commit yet");
        };

        let update = PullRequestUpdate {
            status: Some(PullRequestLifecycle::Completed),
            last_merge_source_commit: Some(CommitRef {
                commit_id: Some(commit_id.clone()),
            }),
            ..PullRequestUpdate::default()
        };
        self.ops
            .update_pull_request(
                &pull_request.project_id,
                &pull_request.repository_id,
                pull_request.id,
                &update,
            )
            .await
            .with_context(|| format!("Failed to complete pull request {pull_request}"))?;

        info!(pull_request = %pull_request, "Completed pull request");
        Ok(())
    }

    /// Abandons the pull request, then deletes its source branch.
    pub(crate) async fn abandon_pull_request(&self, pull_request: &AdoPullRequest) -> Result<()> {
        let update = PullRequestUpdate {
            status: Some(PullRequestLifecycle::Abandoned),
            ..PullRequestUpdate::default()
        };
        self.ops
            .update_pull_request(
                &pull_request.project_id,
                &pull_request.repository_id,
                pull_request.id,
                &update,
            )
            .await
            .with_context(|| format!("Failed to abandon pull request {pull_request}"))?;
        info!(pull_request = %pull_request, "Abandoned pull request");

        // The ref filter matches on a prefix of the name without its leading "refs/".
        let filter = pull_request.source_ref.replacen("refs/", "", 1);
        let refs = self
            .ops
            .list_refs(&pull_request.project_id, &pull_request.repository_id, &filter, 1)
            .await
            .with_context(|| format!("Failed to look up source branch of {pull_request}"))?;

        let Some(source) = refs.into_iter().find(|r| r.name == pull_request.source_ref) else {
            error!(
                pull_request = %pull_request,
                source_ref = %pull_request.source_ref,
                "Failed to find the branch to delete"
            );
            return Ok(());
        };

        let deletion = RefUpdate {
            name: source.name,
            old_object_id: source.object_id,
            new_object_id: ZERO_OBJECT_ID.to_string(),
        };
        self.ops
            .update_refs(
                &pull_request.project_id,
                &pull_request.repository_id,
                &[deletion],
            )
            .await
            .with_context(|| format!("Failed to delete source branch of {pull_request}"))?;

        info!(pull_request = %pull_request, branch = %short_branch_name(&pull_request.source_ref), "Deleted source branch");
        Ok(())
    }

    /// Lets the pull request complete by itself once its policies pass. Failures are logged.
    async fn set_auto_complete(&self, identities: &IdentityCache, pull_request: &AdoPullRequest) {
        let Some(author_id) = identities.author.legacy_id.clone() else {
            warn!(pull_request = %pull_request, "Cannot set auto-complete without the author's identity");
            return;
        };

        let options = &self.config.auto_complete;
        let update = PullRequestUpdate {
            auto_complete_set_by: Some(IdentityReference { id: author_id }),
            completion_options: Some(CompletionOptions {
                delete_source_branch: options.delete_source_branch,
                merge_strategy: options.merge_strategy,
                transition_work_items: options.transition_work_items,
                merge_commit_message: format!(
                    "Merged PR {}: {}",
                    pull_request.id, pull_request.title
                ),
            }),
            ..PullRequestUpdate::default()
        };

        let result = self
            .ops
            .update_pull_request(
                &pull_request.project_id,
                &pull_request.repository_id,
                pull_request.id,
                &update,
            )
            .await;
        match result {
            Ok(_) => debug!(pull_request = %pull_request, strategy = %options.merge_strategy, "Set auto-complete"),
            Err(e) => warn!(pull_request = %pull_request, error = %e, "Failed to set auto-complete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::records::{CommitRef, RepositoryRecord};
    use crate::api::traits::mocks::sample_repository;

    fn record(status: PullRequestLifecycle, merge: Option<MergeStatus>) -> PullRequestRecord {
        PullRequestRecord {
            pull_request_id: 7,
            title: Some("Bump".to_string()),
            repository: sample_repository("p-1", "platform", "api"),
            status,
            merge_status: merge,
            is_draft: false,
            source_ref_name: "refs/heads/bump".to_string(),
            target_ref_name: "refs/heads/main".to_string(),
            last_merge_source_commit: Some(CommitRef {
                commit_id: Some("abc".to_string()),
            }),
        }
    }

    /// # Status Mapping
    ///
    /// Tests the translation of every lifecycle and merge status combination.
    ///
    /// ## Test Scenario
    /// - Maps active pull requests with each merge status, and every other lifecycle
    ///
    /// ## Expected Outcome
    /// - Active: queued, not-set and absent are pending; succeeded is success;
    ///   conflicts, failure and rejected-by-policy are error
    /// - Abandoned is closed, completed is merged, everything else unknown
    #[test]
    fn test_status_mapping() {
        use MergeStatus::*;
        use PullRequestLifecycle as L;

        let cases = [
            (L::Active, None, PullRequestStatus::Pending),
            (L::Active, Some(NotSet), PullRequestStatus::Pending),
            (L::Active, Some(Queued), PullRequestStatus::Pending),
            (L::Active, Some(Succeeded), PullRequestStatus::Success),
            (L::Active, Some(Conflicts), PullRequestStatus::Error),
            (L::Active, Some(Failure), PullRequestStatus::Error),
            (L::Active, Some(RejectedByPolicy), PullRequestStatus::Error),
            (L::Active, Some(Unrecognized), PullRequestStatus::Unknown),
            (L::Abandoned, Some(Conflicts), PullRequestStatus::Closed),
            (L::Completed, Some(Succeeded), PullRequestStatus::Merged),
            (L::NotSet, None, PullRequestStatus::Unknown),
            (L::All, None, PullRequestStatus::Unknown),
            (L::Unrecognized, Some(Succeeded), PullRequestStatus::Unknown),
        ];

        for (lifecycle, merge, expected) in cases {
            assert_eq!(
                convert_pull_request_status(lifecycle, merge),
                expected,
                "{lifecycle:?} / {merge:?}"
            );
        }
    }

    /// # Pull Request Conversion
    ///
    /// Tests conversion of a provider pull request.
    ///
    /// ## Test Scenario
    /// - Converts a pull request whose repository carries a web URL
    /// - Converts one from a project-scoped listing without web URL or merge commit
    ///
    /// ## Expected Outcome
    /// - The URL is the repository URL plus /pullrequest/{id}, or empty
    /// - Display renders project/repository #id
    #[test]
    fn test_pull_request_conversion() {
        let pr = convert_pull_request(&record(
            PullRequestLifecycle::Active,
            Some(MergeStatus::Succeeded),
        ));
        assert_eq!(
            scm::PullRequest::url(&pr),
            "https://dev.azure.com/org/platform/_git/api/pullrequest/7"
        );
        assert_eq!(pr.to_string(), "platform/api #7");
        assert_eq!(pr.last_merge_source_commit.as_deref(), Some("abc"));
        assert_eq!(scm::PullRequest::status(&pr), PullRequestStatus::Success);

        let mut bare = record(PullRequestLifecycle::Active, None);
        bare.repository = RepositoryRecord {
            web_url: None,
            ..bare.repository
        };
        bare.last_merge_source_commit = None;
        let pr = convert_pull_request(&bare);
        assert_eq!(pr.web_url, "");
        assert_eq!(pr.last_merge_source_commit, None);
    }

    /// # Branch Refs
    ///
    /// Tests conversion between branch names and full refs.
    ///
    /// ## Test Scenario
    /// - Builds refs from short names, nested names and full refs
    ///
    /// ## Expected Outcome
    /// - Short names get the heads prefix exactly once
    #[test]
    fn test_branch_refs() {
        assert_eq!(branch_ref("main"), "refs/heads/main");
        assert_eq!(branch_ref("feature/x"), "refs/heads/feature/x");
        assert_eq!(branch_ref("refs/heads/main"), "refs/heads/main");
        assert_eq!(short_branch_name("refs/heads/feature/x"), "feature/x");
        assert_eq!(short_branch_name("refs/tags/v1"), "refs/tags/v1");
    }
}
