//! Azure DevOps API access.
//!
//! This module wraps the `azure_devops_rust_api` clients behind a set of operation traits
//! so the adapter logic in [`crate::service`] never touches generated models directly.
//!
//! ## Layout
//!
//! - [`AzureDevOpsClient`]: the authenticated bundle of REST clients for one organization
//! - [`traits`]: one async trait per REST area, implemented by the client
//! - [`records`]: the trimmed JSON records exchanged through those traits
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_gitter::api::{AzureDevOpsClient, PatCredential, ProjectOperations};
//! use ado_gitter::api::records::ProjectState;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let client = AzureDevOpsClient::new(
//!     "my-org".to_string(),
//!     &PatCredential::from_string("my-pat".to_string()),
//! );
//!
//! let projects = client.list_projects(ProjectState::WellFormed).await?;
//! println!("Found {} projects", projects.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod credential;
pub mod records;
pub mod traits;

pub use client::AzureDevOpsClient;
pub use credential::PatCredential;
pub use traits::{
    AzureDevOpsOperations, GraphOperations, IdentityOperations, LabelOperations,
    LocationOperations, ProjectOperations, PullRequestOperations, RefOperations,
    RepositoryOperations, ReviewerOperations,
};
