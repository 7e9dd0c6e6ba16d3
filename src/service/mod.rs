//! The Azure DevOps implementation of [`ScmService`].
//!
//! [`AzureDevOpsService`] maps the provider-agnostic pull request workflow onto Azure
//! DevOps projects, Git repositories and pull requests. It is generic over the operation
//! traits of [`crate::api`], so the whole workflow runs against an in-memory organization
//! in tests.
//!
//! ## Submodules
//!
//! - [`project`]: project discovery
//! - [`repository`]: repository discovery and translation
//! - [`pull_request`]: pull request translation and mutations
//! - [`identity`]: resolution of reviewer names to Azure DevOps identities
//! - [`reconcile`]: convergence of reviewers and labels
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_gitter::api::PatCredential;
//! use ado_gitter::models::{RepositoryListing, ServiceConfig};
//! use ado_gitter::scm::ScmService;
//! use ado_gitter::service::AzureDevOpsService;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut config = ServiceConfig::new("my-org", PatCredential::from_string("my-pat".to_string()));
//! config.listing = RepositoryListing::from_references(["platform"], Vec::<String>::new())?;
//!
//! let service = AzureDevOpsService::new(config);
//! for pr in service.get_pull_requests("dependency-bump").await? {
//!     println!("{pr}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod identity;
pub mod project;
pub mod pull_request;
pub mod reconcile;
pub mod repository;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use self::identity::IdentityCache;
use self::pull_request::AdoPullRequest;
use self::repository::AdoRepository;
use crate::api::{AzureDevOpsClient, AzureDevOpsOperations};
use crate::error::ApiError;
use crate::models::ServiceConfig;
use crate::scm::{NewPullRequest, ScmService};

/// Azure DevOps adapter for one organization.
pub struct AzureDevOpsService<O = AzureDevOpsClient> {
    config: ServiceConfig,
    ops: O,
    identities: OnceCell<IdentityCache>,
}

impl AzureDevOpsService<AzureDevOpsClient> {
    /// Connects to the organization of `config` with its token.
    pub fn new(config: ServiceConfig) -> Self {
        let client = AzureDevOpsClient::new(config.organization.clone(), &config.pat);
        Self::with_operations(config, client)
    }
}

impl<O> AzureDevOpsService<O> {
    pub fn with_operations(config: ServiceConfig, ops: O) -> Self {
        Self {
            config,
            ops,
            identities: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn operations(&self) -> &O {
        &self.ops
    }
}

impl<O: AzureDevOpsOperations> AzureDevOpsService<O> {
    /// Identities of the first pull request mutation, resolved once.
    ///
    /// Later calls reuse them whatever reviewers they ask for. A failed resolution is not
    /// cached, so the next mutation tries again.
    async fn identity_cache(&self, pull_request: &NewPullRequest) -> Result<&IdentityCache> {
        self.identities
            .get_or_try_init(|| async {
                debug!(api = %self.config.identity_api, "Resolving identities");
                IdentityCache::populate(&self.ops, self.config.identity_api, pull_request).await
            })
            .await
    }
}

impl<O> std::fmt::Debug for AzureDevOpsService<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOpsService")
            .field("config", &self.config)
            .field("identities_resolved", &self.identities.initialized())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<O: AzureDevOpsOperations> ScmService for AzureDevOpsService<O> {
    type Repository = AdoRepository;
    type PullRequest = AdoPullRequest;

    async fn get_repositories(&self) -> Result<Vec<AdoRepository>> {
        self.list_selected_repositories().await
    }

    async fn get_pull_requests(&self, branch_name: &str) -> Result<Vec<AdoPullRequest>> {
        self.find_pull_requests(branch_name).await
    }

    async fn get_open_pull_request(
        &self,
        repo: &AdoRepository,
        branch_name: &str,
    ) -> Result<Option<AdoPullRequest>> {
        self.find_open_pull_request(repo, branch_name).await
    }

    /// Azure DevOps pull requests always live in the target repository, so `pr_repo` is
    /// not consulted.
    async fn create_pull_request(
        &self,
        repo: &AdoRepository,
        _pr_repo: &AdoRepository,
        new_pr: &NewPullRequest,
    ) -> Result<AdoPullRequest> {
        self.open_pull_request(repo, new_pr).await
    }

    async fn update_pull_request(
        &self,
        _repo: &AdoRepository,
        pull_request: &AdoPullRequest,
        updated_pr: &NewPullRequest,
    ) -> Result<AdoPullRequest> {
        self.refresh_pull_request(pull_request, updated_pr).await
    }

    async fn merge_pull_request(&self, pull_request: &AdoPullRequest) -> Result<()> {
        self.complete_pull_request(pull_request).await
    }

    async fn close_pull_request(&self, pull_request: &AdoPullRequest) -> Result<()> {
        self.abandon_pull_request(pull_request).await
    }

    async fn fork_repository(
        &self,
        _repo: &AdoRepository,
        _new_owner: Option<&str>,
    ) -> Result<AdoRepository> {
        Err(ApiError::Unsupported {
            operation: "fork_repository".to_string(),
        }
        .into())
    }
}
