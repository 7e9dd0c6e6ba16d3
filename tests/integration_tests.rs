//! Integration tests for the ado-gitter library
//!
//! These tests exercise the public API the way a caller assembling the adapter would,
//! without network access.

use std::io::Write;

use ado_gitter::api::records::MergeStrategy;
use ado_gitter::error::{ApiError, ConfigError};
use ado_gitter::parsed_property::ParsedProperty;
use ado_gitter::scm::{Repository, ScmService};
use ado_gitter::service::identity::IdentityApi;
use ado_gitter::service::repository::AdoRepository;
use ado_gitter::{AzureDevOpsClient, AzureDevOpsService, Config, PatCredential, ServiceConfig};

/// # Layered Configuration
///
/// Tests resolving service settings from a config file overridden by explicit values.
///
/// ## Test Scenario
/// - Writes a config file with a base URL, projects and auto-complete settings
/// - Overrides the token and merge strategy on top
///
/// ## Expected Outcome
/// - The organization is derived from the base URL
/// - Later layers win, unset values keep their defaults
#[test]
fn test_layered_configuration() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
base_url = "https://dev.azure.com/contoso"
pat = "file-pat"
projects = ["platform"]
repositories = ["web/frontend"]
identity_api = "graph"
delete_source_branch = false
"#
    )
    .unwrap();

    let overrides = Config {
        merge_strategy: Some(ParsedProperty::Cli(
            "rebase".to_string(),
            "rebase".to_string(),
        )),
        ..Config::load_from_path(std::path::Path::new("/nonexistent/config.toml")).unwrap()
    };

    let settings = Config::default()
        .merge(Config::load_from_path(file.path()).unwrap())
        .merge(overrides)
        .resolve()
        .unwrap();

    assert_eq!(settings.organization, "contoso");
    assert!(settings.listing.includes_repository("platform", "anything"));
    assert!(settings.listing.includes_repository("web", "frontend"));
    assert!(!settings.listing.includes_repository("web", "docs"));
    assert!(settings.listing.skip_disabled);
    assert_eq!(settings.identity_api, IdentityApi::Graph);
    assert_eq!(settings.auto_complete.merge_strategy, MergeStrategy::Rebase);
    assert!(!settings.auto_complete.delete_source_branch);
    assert!(settings.auto_complete.transition_work_items);
}

/// # Missing Token
///
/// Tests that the token is required.
///
/// ## Test Scenario
/// - Resolves a configuration with an organization but no token
///
/// ## Expected Outcome
/// - A MissingRequired error naming the environment variable
#[test]
fn test_missing_token() {
    let config = Config {
        organization: Some(ParsedProperty::Cli("contoso".to_string(), "contoso".to_string())),
        ..Config::default()
    };

    match config.resolve() {
        Err(ConfigError::MissingRequired { field, env_var }) => {
            assert_eq!(field, "pat");
            assert_eq!(env_var, "ADO_GITTER_PAT");
        }
        other => panic!("expected missing pat, got {other:?}"),
    }
}

/// # Library Version
///
/// Tests the version constants.
///
/// ## Test Scenario
/// - Reads the crate version and build hash
///
/// ## Expected Outcome
/// - Both are non-empty, the version is dotted
#[test]
fn test_library_version() {
    assert!(ado_gitter::VERSION.contains('.'));
    assert!(!ado_gitter::GIT_HASH.is_empty());
}

/// # Fork Without Network
///
/// Tests the fork operation against a real client.
///
/// ## Test Scenario
/// - Builds the service for an organization and forks a repository
///
/// ## Expected Outcome
/// - The operation is rejected as unsupported before any request is sent
#[tokio::test]
async fn test_fork_without_network() {
    let config = ServiceConfig::new(
        "contoso",
        PatCredential::from_string("test-pat".to_string()),
    );
    let service = AzureDevOpsService::new(config);
    assert_eq!(service.operations().organization(), "contoso");

    let repo = AdoRepository {
        id: "r-1".to_string(),
        name: "api".to_string(),
        project_id: "p-1".to_string(),
        project_name: "platform".to_string(),
        clone_url: "https://contoso@dev.azure.com/contoso/platform/_git/api".to_string(),
        default_branch: "main".to_string(),
        default_branch_ref: "refs/heads/main".to_string(),
    };
    assert_eq!(repo.full_name(), "platform/api");

    let err = service
        .fork_repository(&repo, Some("someone"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Unsupported { .. })
    ));
}

/// # Client Creation
///
/// Tests building the client bundle directly.
///
/// ## Test Scenario
/// - Creates a client with a test organization and token
///
/// ## Expected Outcome
/// - No network call is needed and the token stays out of debug output
#[test]
fn test_client_creation() {
    let client = AzureDevOpsClient::new(
        "test-org".to_string(),
        &PatCredential::from_string("test-pat".to_string()),
    );

    assert_eq!(client.organization(), "test-org");
    assert!(!format!("{client:?}").contains("test-pat"));
}
