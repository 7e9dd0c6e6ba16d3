use std::collections::BTreeMap;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::api::PatCredential;
use crate::api::records::MergeStrategy;
use crate::error::ConfigError;
use crate::service::identity::IdentityApi;

/// Azure DevOps connection and repository selection arguments
#[derive(ClapArgs, Clone, Default, Debug)]
pub struct ConnectionArgs {
    // Azure DevOps Connection
    /// Azure DevOps organization name
    #[arg(short, long, help_heading = "Azure DevOps Connection")]
    pub organization: Option<String>,

    /// Organization URL, e.g. https://dev.azure.com/my-org (alternative to --organization)
    #[arg(long, help_heading = "Azure DevOps Connection")]
    pub base_url: Option<String>,

    /// Personal Access Token for Azure DevOps API authentication
    #[arg(short = 't', long, help_heading = "Azure DevOps Connection")]
    pub pat: Option<String>,

    // Repository Selection
    /// Project to include with all of its repositories (repeatable or comma-separated)
    #[arg(
        short,
        long = "project",
        value_delimiter = ',',
        help_heading = "Repository Selection"
    )]
    pub projects: Vec<String>,

    /// Single repository to include, as project/repository (repeatable or comma-separated)
    #[arg(
        short,
        long = "repo",
        value_delimiter = ',',
        help_heading = "Repository Selection"
    )]
    pub repos: Vec<String>,

    /// Skip repositories that are forks
    #[arg(long, help_heading = "Repository Selection")]
    pub skip_forks: bool,

    /// Include disabled repositories (skipped by default)
    #[arg(long, help_heading = "Repository Selection")]
    pub include_disabled: bool,

    /// Clone over SSH instead of HTTPS
    #[arg(long, help_heading = "Repository Selection")]
    pub ssh: bool,

    // Pull Request Options
    /// Identity lookup API: legacy or graph [default: legacy]
    #[arg(long, help_heading = "Pull Request Options")]
    pub identity_api: Option<String>,

    /// Merge strategy for auto-complete: squash, no-fast-forward, rebase, rebase-merge [default: squash]
    #[arg(long, help_heading = "Pull Request Options")]
    pub merge_strategy: Option<String>,

    /// Keep the source branch when a pull request auto-completes
    #[arg(long, help_heading = "Pull Request Options")]
    pub keep_source_branch: bool,
}

/// Available commands
#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// List the repositories selected by the configuration
    #[command(visible_alias = "r")]
    Repos,

    /// List pull requests opened from a branch across the selected repositories
    #[command(
        visible_alias = "p",
        after_help = "EXAMPLES:\n    \
            ado-gitter -o myorg -t <PAT> -p platform prs dependency-bump"
    )]
    Prs {
        /// Source branch of the pull requests
        branch: String,
    },

    /// Show the open pull request of a branch in one repository
    Open {
        /// Repository as project/repository
        repository: String,
        /// Source branch of the pull request
        branch: String,
    },

    /// Complete the open pull request of a branch
    Merge {
        /// Repository as project/repository
        repository: String,
        /// Source branch of the pull request
        branch: String,
    },

    /// Abandon the open pull request of a branch and delete the branch
    Close {
        /// Repository as project/repository
        repository: String,
        /// Source branch of the pull request
        branch: String,
    },
}

#[derive(Parser, Clone, Debug)]
#[command(
    author,
    version,
    about = "Drive Azure DevOps pull requests across many repositories",
    long_about = "Inspect and drive pull requests across the repositories of an Azure DevOps organization.\n\n\
        Configuration can be provided via CLI arguments, environment variables (ADO_GITTER_*),\n\
        or the config file (~/.config/ado-gitter/config.toml).",
    after_help = "EXAMPLES:\n    \
        # List every repository of two projects\n    \
        ado-gitter -o myorg -t <PAT> -p platform,web repos\n\n    \
        # Show the open pull request of a branch\n    \
        ado-gitter -o myorg -t <PAT> -r platform/api open platform/api dependency-bump\n\n    \
        # Create sample config file\n    \
        ado-gitter --create-config"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Create a sample configuration file at ~/.config/ado-gitter/config.toml
    #[arg(long)]
    pub create_config: bool,

    // Logging (read before argument parsing, declared here for --help)
    /// Log level: trace, debug, info, warn, error (logging is off by default)
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_file: Option<String>,

    /// Log format: text or json
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_format: Option<String>,
}

/// Which projects and repositories the service lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryListing {
    /// Project name to selected repository names. An empty list selects every repository.
    pub projects: BTreeMap<String, Vec<String>>,
    pub skip_forks: bool,
    pub skip_disabled: bool,
}

impl Default for RepositoryListing {
    fn default() -> Self {
        Self {
            projects: BTreeMap::new(),
            skip_forks: false,
            skip_disabled: true,
        }
    }
}

impl RepositoryListing {
    /// Builds the selection from whole-project names and `project/repository` references.
    ///
    /// A project named on its own selects all of its repositories, unless some of its
    /// repositories are also referenced individually: then only those are selected.
    pub fn from_references<P, R>(projects: P, repositories: R) -> Result<Self, ConfigError>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut selected: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for reference in repositories {
            let reference = reference.as_ref();
            let (project, repository) = parse_repository_reference(reference)?;
            selected
                .entry(project.to_string())
                .or_default()
                .push(repository.to_string());
        }

        for project in projects {
            let project = project.as_ref().trim();
            if project.is_empty() {
                continue;
            }
            selected.entry(project.to_string()).or_default();
        }

        Ok(Self {
            projects: selected,
            ..Self::default()
        })
    }

    pub fn includes_project(&self, project: &str) -> bool {
        self.projects.contains_key(project)
    }

    pub fn includes_repository(&self, project: &str, repository: &str) -> bool {
        self.projects
            .get(project)
            .is_some_and(|repos| repos.is_empty() || repos.iter().any(|r| r == repository))
    }
}

/// Splits `project/repository`.
pub fn parse_repository_reference(reference: &str) -> Result<(&str, &str), ConfigError> {
    let invalid = || ConfigError::InvalidRepositoryReference {
        reference: reference.to_string(),
    };

    let (project, repository) = reference.trim().split_once('/').ok_or_else(invalid)?;
    if project.is_empty() || repository.is_empty() || repository.contains('/') {
        return Err(invalid());
    }
    Ok((project, repository))
}

/// Completion settings applied when auto-complete is enabled on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoCompleteOptions {
    pub merge_strategy: MergeStrategy,
    pub delete_source_branch: bool,
    pub transition_work_items: bool,
}

impl Default for AutoCompleteOptions {
    fn default() -> Self {
        Self {
            merge_strategy: MergeStrategy::Squash,
            delete_source_branch: true,
            transition_work_items: true,
        }
    }
}

/// Fully resolved settings of an [`AzureDevOpsService`](crate::service::AzureDevOpsService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub organization: String,
    pub pat: PatCredential,
    /// Clone over SSH instead of HTTPS.
    pub ssh_auth: bool,
    pub listing: RepositoryListing,
    pub identity_api: IdentityApi,
    pub auto_complete: AutoCompleteOptions,
}

impl ServiceConfig {
    /// Settings with defaults for everything but the connection.
    pub fn new(organization: impl Into<String>, pat: PatCredential) -> Self {
        Self {
            organization: organization.into(),
            pat,
            ssh_auth: false,
            listing: RepositoryListing::default(),
            identity_api: IdentityApi::default(),
            auto_complete: AutoCompleteOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// # Repository Reference Parsing
    ///
    /// Tests parsing of `project/repository` references.
    ///
    /// ## Test Scenario
    /// - Parses a valid reference, one with surrounding whitespace, and malformed ones
    ///
    /// ## Expected Outcome
    /// - Valid references split into project and repository
    /// - Missing parts and extra segments are rejected
    #[test]
    fn test_parse_repository_reference() {
        assert_eq!(
            parse_repository_reference("platform/api").unwrap(),
            ("platform", "api")
        );
        assert_eq!(
            parse_repository_reference(" platform/api ").unwrap(),
            ("platform", "api")
        );

        for invalid in ["platform", "platform/", "/api", "a/b/c", ""] {
            assert!(
                matches!(
                    parse_repository_reference(invalid),
                    Err(ConfigError::InvalidRepositoryReference { .. })
                ),
                "{invalid} should be rejected"
            );
        }
    }

    /// # Listing From References
    ///
    /// Tests building the project and repository selection.
    ///
    /// ## Test Scenario
    /// - Selects two repositories of one project and one of another project
    /// - Names the second project on its own as well, and a third project only on its own
    ///
    /// ## Expected Outcome
    /// - Projects with referenced repositories select only those, even when also named
    /// - The project only named on its own selects everything
    /// - Unlisted projects are excluded; disabled repositories are skipped by default
    #[test]
    fn test_listing_from_references() {
        let listing = RepositoryListing::from_references(
            ["web", "mobile"],
            ["platform/api", "platform/worker", "web/frontend"],
        )
        .unwrap();

        assert_eq!(listing.projects.len(), 3);
        assert!(listing.includes_repository("platform", "api"));
        assert!(listing.includes_repository("platform", "worker"));
        assert!(!listing.includes_repository("platform", "docs"));
        assert!(listing.includes_repository("web", "frontend"));
        assert!(!listing.includes_repository("web", "anything"));
        assert!(listing.includes_repository("mobile", "app"));
        assert!(!listing.includes_project("desktop"));
        assert!(!listing.includes_repository("desktop", "app"));
        assert!(listing.skip_disabled);
        assert!(!listing.skip_forks);
    }

    /// # Listing Rejects Malformed References
    ///
    /// Tests that one bad reference fails the whole selection.
    ///
    /// ## Test Scenario
    /// - Builds a listing with a reference missing the repository part
    ///
    /// ## Expected Outcome
    /// - An InvalidRepositoryReference error naming the reference
    #[test]
    fn test_listing_rejects_malformed_reference() {
        let err = RepositoryListing::from_references(Vec::<String>::new(), ["platform"])
            .unwrap_err();
        assert!(err.to_string().contains("'platform'"));
    }

    /// # CLI Parsing
    ///
    /// Tests parsing of connection flags and subcommands.
    ///
    /// ## Test Scenario
    /// - Parses comma-separated projects, a repeated repo flag and the close subcommand
    /// - Verifies the clap definition itself
    ///
    /// ## Expected Outcome
    /// - Lists are split, flags and positional arguments land in their fields
    #[test]
    fn test_cli_parsing() {
        Args::command().debug_assert();

        let args = Args::try_parse_from([
            "ado-gitter",
            "-o",
            "org",
            "-p",
            "platform,web",
            "-r",
            "mobile/app",
            "--ssh",
            "--log-level",
            "debug",
            "close",
            "mobile/app",
            "feature/x",
        ])
        .unwrap();

        assert_eq!(args.connection.organization.as_deref(), Some("org"));
        assert_eq!(args.connection.projects, vec!["platform", "web"]);
        assert_eq!(args.connection.repos, vec!["mobile/app"]);
        assert!(args.connection.ssh);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        match args.command {
            Some(Command::Close { repository, branch }) => {
                assert_eq!(repository, "mobile/app");
                assert_eq!(branch, "feature/x");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
