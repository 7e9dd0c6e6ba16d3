//! Repository discovery and translation.

use std::fmt;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::AzureDevOpsService;
use super::pull_request::short_branch_name;
use crate::api::AzureDevOpsOperations;
use crate::api::records::RepositoryRecord;
use crate::error::ApiError;
use crate::scm;

/// An Azure DevOps Git repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdoRepository {
    pub id: String,
    pub name: String,
    pub project_id: String,
    pub project_name: String,
    pub clone_url: String,
    /// Short name of the default branch.
    pub default_branch: String,
    /// Full ref of the default branch.
    pub default_branch_ref: String,
}

impl fmt::Display for AdoRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_name, self.name)
    }
}

impl scm::Repository for AdoRepository {
    fn clone_url(&self) -> &str {
        &self.clone_url
    }

    fn default_branch(&self) -> &str {
        &self.default_branch
    }

    fn full_name(&self) -> String {
        self.to_string()
    }
}

/// Converts a provider repository, picking the SSH or HTTPS clone URL.
///
/// Fails with [`ApiError::UninitializedRepository`] when the repository has no default
/// branch yet. A missing clone URL is logged and leaves the URL empty.
pub fn convert_repository(
    record: &RepositoryRecord,
    ssh_auth: bool,
) -> Result<AdoRepository, ApiError> {
    let Some(default_branch_ref) = record.default_branch.clone() else {
        return Err(ApiError::UninitializedRepository {
            project: record.project.name.clone(),
            repository: record.name.clone(),
        });
    };

    let clone_url = if ssh_auth {
        record.ssh_url.clone()
    } else {
        record.remote_url.clone()
    };
    if clone_url.is_none() {
        warn!(
            project = %record.project.name,
            repository = %record.name,
            ssh = ssh_auth,
            "Repository has no clone URL"
        );
    }

    Ok(AdoRepository {
        id: record.id.clone(),
        name: record.name.clone(),
        project_id: record.project.id.clone(),
        project_name: record.project.name.clone(),
        clone_url: clone_url.unwrap_or_default(),
        default_branch: short_branch_name(&default_branch_ref).to_string(),
        default_branch_ref,
    })
}

impl<O: AzureDevOpsOperations> AzureDevOpsService<O> {
    /// Every selected repository of every selected project.
    ///
    /// A failure to list the repositories of one project fails the whole listing.
    pub(crate) async fn list_selected_repositories(&self) -> Result<Vec<AdoRepository>> {
        let listing = &self.config.listing;
        let mut repositories = Vec::new();

        for project in self.get_projects().await? {
            let records = self
                .ops
                .list_repositories(&project.id)
                .await
                .with_context(|| format!("Failed to list repositories of {}", project.name))?;

            for record in &records {
                if !listing.includes_repository(&project.name, &record.name) {
                    continue;
                }
                if listing.skip_disabled && record.is_disabled.unwrap_or(false) {
                    debug!(project = %project.name, repository = %record.name, "Skipping disabled repository");
                    continue;
                }
                if listing.skip_forks && record.is_fork.unwrap_or(false) {
                    debug!(project = %project.name, repository = %record.name, "Skipping fork");
                    continue;
                }

                match convert_repository(record, self.config.ssh_auth) {
                    Ok(repository) => repositories.push(repository),
                    Err(e) => warn!(error = %e, "Excluding repository"),
                }
            }
        }

        info!(count = repositories.len(), "Listed repositories");
        Ok(repositories)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::api::PatCredential;
    use crate::api::records::ProjectState;
    use crate::api::traits::mocks::{MockAzureDevOps, sample_repository};
    use crate::models::{RepositoryListing, ServiceConfig};

    fn service(
        ops: MockAzureDevOps,
        listing: RepositoryListing,
        ssh_auth: bool,
    ) -> AzureDevOpsService<MockAzureDevOps> {
        let mut config = ServiceConfig::new("org", PatCredential::from_string("pat".to_string()));
        config.listing = listing;
        config.ssh_auth = ssh_auth;
        AzureDevOpsService::with_operations(config, ops)
    }

    fn names(repositories: &[AdoRepository]) -> Vec<String> {
        repositories.iter().map(|r| r.to_string()).collect()
    }

    /// Log lines written while `f` runs.
    fn captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        #[derive(Clone, Default)]
        struct Buffer(Arc<Mutex<Vec<u8>>>);

        impl Write for Buffer {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        (result, logs)
    }

    /// # Clone URL Selection
    ///
    /// Tests that the clone URL follows the SSH setting.
    ///
    /// ## Test Scenario
    /// - Converts the same repository with and without SSH
    ///
    /// ## Expected Outcome
    /// - SSH uses the SSH URL, HTTPS the remote URL
    /// - The default branch is reported without its ref prefix
    #[test]
    fn test_clone_url_selection() {
        let record = sample_repository("p-1", "platform", "api");

        let https = convert_repository(&record, false).unwrap();
        assert_eq!(
            scm::Repository::clone_url(&https),
            "https://org@dev.azure.com/org/platform/_git/api"
        );
        assert_eq!(scm::Repository::default_branch(&https), "main");
        assert_eq!(https.default_branch_ref, "refs/heads/main");
        assert_eq!(scm::Repository::full_name(&https), "platform/api");

        let ssh = convert_repository(&record, true).unwrap();
        assert_eq!(
            scm::Repository::clone_url(&ssh),
            "git@ssh.dev.azure.com:v3/org/platform/api"
        );
    }

    /// # Missing Clone URL
    ///
    /// Tests conversion of a repository without the clone URL for the configured protocol.
    ///
    /// ## Test Scenario
    /// - Converts a repository that has only an HTTPS URL, with SSH and then with HTTPS
    ///
    /// ## Expected Outcome
    /// - The SSH conversion succeeds with an empty URL and logs a warning naming the repository
    /// - The HTTPS conversion logs nothing
    #[test]
    fn test_missing_clone_url_is_logged() {
        let record = RepositoryRecord {
            ssh_url: None,
            ..sample_repository("p-1", "platform", "api")
        };

        let (ssh, logs) = captured_logs(|| convert_repository(&record, true));
        assert_eq!(ssh.unwrap().clone_url, "");
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("Repository has no clone URL"), "{logs}");
        assert!(logs.contains("repository=api"), "{logs}");

        let (https, logs) = captured_logs(|| convert_repository(&record, false));
        assert!(!https.unwrap().clone_url.is_empty());
        assert!(logs.is_empty(), "{logs}");
    }

    /// # Uninitialized Repository
    ///
    /// Tests conversion of a repository that has never been pushed to.
    ///
    /// ## Test Scenario
    /// - Converts a repository without default branch
    ///
    /// ## Expected Outcome
    /// - An UninitializedRepository error naming project and repository
    #[test]
    fn test_uninitialized_repository() {
        let record = RepositoryRecord {
            default_branch: None,
            ..sample_repository("p-1", "platform", "empty")
        };

        assert_eq!(
            convert_repository(&record, false),
            Err(ApiError::UninitializedRepository {
                project: "platform".to_string(),
                repository: "empty".to_string(),
            })
        );
    }

    /// # Repository Listing Filters
    ///
    /// Tests which repositories the listing keeps.
    ///
    /// ## Test Scenario
    /// - Project "platform" selected whole, with a disabled, a forked and an empty repository
    /// - Project "web" selected with a single repository out of two
    /// - Forks are skipped
    ///
    /// ## Expected Outcome
    /// - Disabled, forked, uninitialized and unselected repositories are excluded
    #[tokio::test]
    async fn test_repository_listing_filters() {
        let ops = MockAzureDevOps::new()
            .with_project("p-1", "platform", ProjectState::WellFormed)
            .with_project("p-2", "web", ProjectState::WellFormed)
            .with_repository("p-1", sample_repository("p-1", "platform", "api"))
            .with_repository(
                "p-1",
                RepositoryRecord {
                    is_disabled: Some(true),
                    ..sample_repository("p-1", "platform", "archived")
                },
            )
            .with_repository(
                "p-1",
                RepositoryRecord {
                    is_fork: Some(true),
                    ..sample_repository("p-1", "platform", "api-fork")
                },
            )
            .with_repository(
                "p-1",
                RepositoryRecord {
                    default_branch: None,
                    ..sample_repository("p-1", "platform", "empty")
                },
            )
            .with_repository("p-2", sample_repository("p-2", "web", "frontend"))
            .with_repository("p-2", sample_repository("p-2", "web", "docs"));
        let mut listing =
            RepositoryListing::from_references(["platform"], ["web/frontend"]).unwrap();
        listing.skip_forks = true;

        let repositories = service(ops, listing, false)
            .list_selected_repositories()
            .await
            .unwrap();

        assert_eq!(names(&repositories), vec!["platform/api", "web/frontend"]);
    }

    /// # Disabled Repositories On Request
    ///
    /// Tests that disabled repositories and forks are listed when not skipped.
    ///
    /// ## Test Scenario
    /// - One disabled repository and one fork, with both skip settings off
    ///
    /// ## Expected Outcome
    /// - Both repositories are listed
    #[tokio::test]
    async fn test_disabled_repositories_on_request() {
        let ops = MockAzureDevOps::new()
            .with_project("p-1", "platform", ProjectState::WellFormed)
            .with_repository(
                "p-1",
                RepositoryRecord {
                    is_disabled: Some(true),
                    ..sample_repository("p-1", "platform", "archived")
                },
            )
            .with_repository(
                "p-1",
                RepositoryRecord {
                    is_fork: Some(true),
                    ..sample_repository("p-1", "platform", "api-fork")
                },
            );
        let mut listing =
            RepositoryListing::from_references(["platform"], Vec::<String>::new()).unwrap();
        listing.skip_disabled = false;

        let repositories = service(ops, listing, true)
            .list_selected_repositories()
            .await
            .unwrap();

        assert_eq!(
            names(&repositories),
            vec!["platform/archived", "platform/api-fork"]
        );
        assert!(repositories[0].clone_url.starts_with("git@"));
    }

    /// # Project Listing Failure
    ///
    /// Tests that a failing project aborts the listing.
    ///
    /// ## Test Scenario
    /// - Two selected projects; listing the second one's repositories fails
    ///
    /// ## Expected Outcome
    /// - The whole operation fails and names the project
    #[tokio::test]
    async fn test_project_listing_failure() {
        let ops = MockAzureDevOps::new()
            .with_project("p-1", "platform", ProjectState::WellFormed)
            .with_project("p-2", "web", ProjectState::WellFormed)
            .with_repository("p-1", sample_repository("p-1", "platform", "api"))
            .with_failing_project("p-2");
        let listing =
            RepositoryListing::from_references(["platform", "web"], Vec::<String>::new()).unwrap();

        let err = service(ops, listing, false)
            .list_selected_repositories()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("web"));
    }
}
