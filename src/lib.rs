//! # Azure DevOps Gitter
//!
//! Azure DevOps adapter for multi-repository pull request automation. An automation
//! pipeline drives pull requests through the provider-agnostic [`scm::ScmService`] trait;
//! this library implements it on top of the Azure DevOps REST API:
//!
//! - Project and repository discovery with project and repository selection
//! - Pull request listing, creation, update, completion and abandonment
//! - Reviewer identity resolution and reviewer/label reconciliation
//! - Layered configuration (CLI, environment, config file) and structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ado_gitter::{AzureDevOpsService, PatCredential, ServiceConfig};
//! use ado_gitter::scm::{Repository, ScmService};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = ServiceConfig::new("my-org", PatCredential::from_string("my-pat".to_string()));
//! let service = AzureDevOpsService::new(config);
//!
//! for repo in service.get_repositories().await? {
//!     println!("{} ({})", repo.full_name(), repo.clone_url());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod parsed_property;
pub mod scm;
pub mod service;

// Re-export commonly used types for convenience
pub use api::{AzureDevOpsClient, PatCredential};
pub use config::Config;
pub use models::{Args, RepositoryListing, ServiceConfig};
pub use service::AzureDevOpsService;

/// Core result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short commit hash the library was built from, with a `-dirty` suffix for local changes.
pub const GIT_HASH: &str = env!("GIT_HASH");
