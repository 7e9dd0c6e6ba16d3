//! Project discovery.

use anyhow::{Context, Result};
use tracing::debug;

use super::AzureDevOpsService;
use crate::api::AzureDevOpsOperations;
use crate::api::records::ProjectState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl<O: AzureDevOpsOperations> AzureDevOpsService<O> {
    /// Well-formed projects that the repository listing selects.
    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        let records = self
            .ops
            .list_projects(ProjectState::WellFormed)
            .await
            .context("Failed to list projects")?;

        let listing = &self.config.listing;
        let projects = records
            .into_iter()
            .filter(|record| {
                let keep = record.state == ProjectState::WellFormed
                    && listing.includes_project(&record.name);
                if !keep {
                    debug!(project = %record.name, state = record.state.as_str(), "Skipping project");
                }
                keep
            })
            .map(|record| Project {
                id: record.id,
                name: record.name,
            })
            .collect();

        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PatCredential;
    use crate::api::traits::mocks::{Call, MockAzureDevOps};
    use crate::models::{RepositoryListing, ServiceConfig};

    /// # Project Filtering
    ///
    /// Tests that only well-formed, selected projects are returned.
    ///
    /// ## Test Scenario
    /// - P1 is well-formed, P2 is still being created, P3 is well-formed but not selected
    /// - The selection names P1 and P2
    ///
    /// ## Expected Outcome
    /// - Only P1 is returned
    /// - Projects are requested with the well-formed state filter
    #[tokio::test]
    async fn test_project_filtering() {
        let ops = MockAzureDevOps::new()
            .with_project("p-1", "P1", ProjectState::WellFormed)
            .with_project("p-2", "P2", ProjectState::CreatePending)
            .with_project("p-3", "P3", ProjectState::WellFormed);
        let mut config = ServiceConfig::new("org", PatCredential::from_string("pat".to_string()));
        config.listing = RepositoryListing::from_references(["P1", "P2"], Vec::<String>::new())
            .unwrap();
        let service = AzureDevOpsService::with_operations(config, ops);

        let projects = service.get_projects().await.unwrap();

        assert_eq!(
            projects,
            vec![Project {
                id: "p-1".to_string(),
                name: "P1".to_string()
            }]
        );
        assert_eq!(
            service.operations().calls().await,
            vec![Call::ListProjects(ProjectState::WellFormed)]
        );
    }
}
