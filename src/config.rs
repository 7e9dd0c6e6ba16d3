//! Configuration management for ado-gitter.
//!
//! Settings are layered, each value remembering where it came from:
//! - built-in defaults
//! - the TOML file at `$XDG_CONFIG_HOME/ado-gitter/config.toml`
//! - `ADO_GITTER_*` environment variables
//! - command line arguments
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_gitter::Config;
//!
//! # fn main() -> Result<(), ado_gitter::error::ConfigError> {
//! let config = Config::default()
//!     .merge(Config::load_from_file()?)
//!     .merge(Config::load_from_env());
//!
//! let service_config = config.resolve()?;
//! println!("Organization: {}", service_config.organization);
//! # Ok(())
//! # }
//! ```

use crate::api::PatCredential;
use crate::api::records::MergeStrategy;
use crate::error::ConfigError;
use crate::models::{AutoCompleteOptions, ConnectionArgs, RepositoryListing, ServiceConfig};
use crate::parsed_property::ParsedProperty;
use crate::service::identity::IdentityApi;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Prefix of every environment variable the configuration reads.
pub const ENV_PREFIX: &str = "ADO_GITTER_";

/// Shape of the TOML configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    pub organization: Option<String>,
    pub base_url: Option<String>,
    pub pat: Option<String>,
    pub projects: Option<Vec<String>>,
    pub repositories: Option<Vec<String>>,
    pub ssh_auth: Option<bool>,
    pub skip_forks: Option<bool>,
    pub skip_disabled: Option<bool>,
    pub identity_api: Option<String>,
    pub merge_strategy: Option<String>,
    pub delete_source_branch: Option<bool>,
    pub transition_work_items: Option<bool>,
}

/// Configuration assembled from CLI arguments, environment variables, config file, and defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Azure DevOps organization name.
    pub organization: Option<ParsedProperty<String>>,
    /// Organization URL the organization name is derived from when not given directly.
    pub base_url: Option<ParsedProperty<String>>,
    /// Personal access token for authenticating with Azure DevOps.
    pub pat: Option<ParsedProperty<String>>,
    /// Projects whose repositories are all selected.
    pub projects: Option<ParsedProperty<Vec<String>>>,
    /// Individual repositories, as `project/repository`.
    pub repositories: Option<ParsedProperty<Vec<String>>>,
    /// Clone over SSH instead of HTTPS.
    pub ssh_auth: Option<ParsedProperty<bool>>,
    pub skip_forks: Option<ParsedProperty<bool>>,
    pub skip_disabled: Option<ParsedProperty<bool>>,
    /// `legacy` or `graph`.
    pub identity_api: Option<ParsedProperty<String>>,
    /// Merge strategy used when auto-complete is set.
    pub merge_strategy: Option<ParsedProperty<String>>,
    pub delete_source_branch: Option<ParsedProperty<bool>>,
    pub transition_work_items: Option<ParsedProperty<bool>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization: None,
            base_url: None,
            pat: None,
            projects: None,
            repositories: None,
            ssh_auth: Some(ParsedProperty::Default(false)),
            skip_forks: Some(ParsedProperty::Default(false)),
            skip_disabled: Some(ParsedProperty::Default(true)),
            identity_api: Some(ParsedProperty::Default("legacy".to_string())),
            merge_strategy: Some(ParsedProperty::Default("squash".to_string())),
            delete_source_branch: Some(ParsedProperty::Default(true)),
            transition_work_items: Some(ParsedProperty::Default(true)),
        }
    }
}

/// An all-`None` configuration, the neutral element of [`Config::merge`].
fn empty() -> Config {
    Config {
        organization: None,
        base_url: None,
        pat: None,
        projects: None,
        repositories: None,
        ssh_auth: None,
        skip_forks: None,
        skip_disabled: None,
        identity_api: None,
        merge_strategy: None,
        delete_source_branch: None,
        transition_work_items: None,
    }
}

impl Config {
    /// Load configuration from the XDG config directory.
    ///
    /// A missing file yields an empty configuration.
    pub fn load_from_file() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::get_config_path()?)
    }

    /// Load configuration from a specific TOML file.
    pub fn load_from_path(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Ok(empty());
        }

        let config_content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::FileReadError {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let config_file: ConfigFile =
            toml::from_str(&config_content).map_err(|e| ConfigError::ParseError {
                path: config_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let path = config_path.to_path_buf();
        let text = |v: String| ParsedProperty::File(v.clone(), path.clone(), v);
        let flag = |v: bool| ParsedProperty::File(v, path.clone(), v.to_string());
        let list = |v: Vec<String>| {
            let original = v.join(",");
            ParsedProperty::File(v, path.clone(), original)
        };

        Ok(Self {
            organization: config_file.organization.map(text),
            base_url: config_file.base_url.map(text),
            pat: config_file.pat.map(text),
            projects: config_file.projects.map(list),
            repositories: config_file.repositories.map(list),
            ssh_auth: config_file.ssh_auth.map(flag),
            skip_forks: config_file.skip_forks.map(flag),
            skip_disabled: config_file.skip_disabled.map(flag),
            identity_api: config_file.identity_api.map(text),
            merge_strategy: config_file.merge_strategy.map(text),
            delete_source_branch: config_file.delete_source_branch.map(flag),
            transition_work_items: config_file.transition_work_items.map(flag),
        })
    }

    /// Load configuration from `ADO_GITTER_*` environment variables.
    ///
    /// List variables are comma-separated. Booleans that do not parse are ignored.
    pub fn load_from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(format!("{ENV_PREFIX}{name}"))
                .ok()
                .filter(|v| !v.trim().is_empty())
        }
        let text = |name: &str| var(name).map(|v| ParsedProperty::Env(v.clone(), v));
        let flag = |name: &str| {
            var(name).and_then(|s| {
                s.trim()
                    .parse::<bool>()
                    .ok()
                    .map(|v| ParsedProperty::Env(v, s.clone()))
            })
        };
        let list = |name: &str| var(name).map(|s| ParsedProperty::Env(split_list(&s), s));

        Self {
            organization: text("ORGANIZATION"),
            base_url: text("BASE_URL"),
            pat: text("PAT"),
            projects: list("PROJECTS"),
            repositories: list("REPOSITORIES"),
            ssh_auth: flag("SSH_AUTH"),
            skip_forks: flag("SKIP_FORKS"),
            skip_disabled: flag("SKIP_DISABLED"),
            identity_api: text("IDENTITY_API"),
            merge_strategy: text("MERGE_STRATEGY"),
            delete_source_branch: flag("DELETE_SOURCE_BRANCH"),
            transition_work_items: flag("TRANSITION_WORK_ITEMS"),
        }
    }

    /// Configuration from command line arguments. Unset flags stay `None`.
    pub fn from_cli(args: &ConnectionArgs) -> Self {
        let text = |v: &Option<String>| {
            v.as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), v.clone()))
        };
        let list = |v: &Vec<String>| {
            let values: Vec<String> = v
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            (!values.is_empty()).then(|| {
                let original = values.join(",");
                ParsedProperty::Cli(values, original)
            })
        };
        let switch = |set: bool, value: bool, flag: &str| {
            set.then(|| ParsedProperty::Cli(value, flag.to_string()))
        };

        Self {
            organization: text(&args.organization),
            base_url: text(&args.base_url),
            pat: text(&args.pat),
            projects: list(&args.projects),
            repositories: list(&args.repos),
            ssh_auth: switch(args.ssh, true, "--ssh"),
            skip_forks: switch(args.skip_forks, true, "--skip-forks"),
            skip_disabled: switch(args.include_disabled, false, "--include-disabled"),
            identity_api: text(&args.identity_api),
            merge_strategy: text(&args.merge_strategy),
            delete_source_branch: switch(args.keep_source_branch, false, "--keep-source-branch"),
            transition_work_items: None,
        }
    }

    /// Get the XDG config file path for ado-gitter
    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "config path".to_string(),
                    message: "could not determine the home directory".to_string(),
                })?
                .join(".config"),
        };

        Ok(config_dir.join("ado-gitter").join("config.toml"))
    }

    /// Merge this config with another, preferring values from other when they exist
    pub fn merge(self, other: Self) -> Self {
        Self {
            organization: other.organization.or(self.organization),
            base_url: other.base_url.or(self.base_url),
            pat: other.pat.or(self.pat),
            projects: other.projects.or(self.projects),
            repositories: other.repositories.or(self.repositories),
            ssh_auth: other.ssh_auth.or(self.ssh_auth),
            skip_forks: other.skip_forks.or(self.skip_forks),
            skip_disabled: other.skip_disabled.or(self.skip_disabled),
            identity_api: other.identity_api.or(self.identity_api),
            merge_strategy: other.merge_strategy.or(self.merge_strategy),
            delete_source_branch: other.delete_source_branch.or(self.delete_source_branch),
            transition_work_items: other.transition_work_items.or(self.transition_work_items),
        }
    }

    /// Validates the merged configuration into service settings.
    pub fn resolve(self) -> Result<ServiceConfig, ConfigError> {
        let organization = match (&self.organization, &self.base_url) {
            (Some(organization), _) => organization.value().trim().to_string(),
            (None, Some(base_url)) => organization_from_base_url(base_url.value())?,
            (None, None) => return Err(missing("organization")),
        };
        if organization.is_empty() {
            return Err(missing("organization"));
        }

        let pat = PatCredential::from_string(
            self.pat
                .ok_or_else(|| missing("pat"))?
                .into_value(),
        );
        if pat.is_blank() {
            return Err(missing("pat"));
        }

        let mut listing = RepositoryListing::from_references(
            self.projects.map(ParsedProperty::into_value).unwrap_or_default(),
            self.repositories
                .map(ParsedProperty::into_value)
                .unwrap_or_default(),
        )?;
        listing.skip_forks = flag_or(self.skip_forks, false);
        listing.skip_disabled = flag_or(self.skip_disabled, true);

        let identity_api = match &self.identity_api {
            Some(value) => value
                .value()
                .parse::<IdentityApi>()
                .map_err(|message| invalid("identity_api", message))?,
            None => IdentityApi::default(),
        };

        let merge_strategy = match &self.merge_strategy {
            Some(value) => value
                .value()
                .parse::<MergeStrategy>()
                .map_err(|message| invalid("merge_strategy", message))?,
            None => MergeStrategy::default(),
        };

        Ok(ServiceConfig {
            organization,
            pat,
            ssh_auth: flag_or(self.ssh_auth, false),
            listing,
            identity_api,
            auto_complete: AutoCompleteOptions {
                merge_strategy,
                delete_source_branch: flag_or(self.delete_source_branch, true),
                transition_work_items: flag_or(self.transition_work_items, true),
            },
        })
    }

    /// One `name = value (source)` line per setting. The token is masked.
    pub fn describe(&self) -> String {
        fn line<T>(name: &str, value: &Option<ParsedProperty<T>>, render: impl Fn(&T) -> String) -> String {
            match value {
                Some(property) => format!(
                    "{name} = {} ({})",
                    render(property.value()),
                    property.source_name()
                ),
                None => format!("{name} = <unset>"),
            }
        }
        let plain = |v: &String| v.clone();
        let flag = |v: &bool| v.to_string();
        let list = |v: &Vec<String>| v.join(",");

        [
            line("organization", &self.organization, plain),
            line("base_url", &self.base_url, plain),
            line("pat", &self.pat, |_| "***".to_string()),
            line("projects", &self.projects, list),
            line("repositories", &self.repositories, list),
            line("ssh_auth", &self.ssh_auth, flag),
            line("skip_forks", &self.skip_forks, flag),
            line("skip_disabled", &self.skip_disabled, flag),
            line("identity_api", &self.identity_api, plain),
            line("merge_strategy", &self.merge_strategy, plain),
            line("delete_source_branch", &self.delete_source_branch, flag),
            line("transition_work_items", &self.transition_work_items, flag),
        ]
        .join("\n")
    }

    /// Create a sample config file for user reference.
    ///
    /// An existing file is left untouched. Returns the config file path.
    pub fn create_sample_config() -> Result<PathBuf, ConfigError> {
        let config_path = Self::get_config_path()?;

        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::DirectoryCreationError {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
        }

        fs::write(&config_path, SAMPLE_CONFIG).map_err(|e| ConfigError::FileReadError {
            path: config_path.clone(),
            message: format!("failed to write sample config: {e}"),
        })?;

        Ok(config_path)
    }
}

const SAMPLE_CONFIG: &str = r#"# ado-gitter Configuration File
# Location: ~/.config/ado-gitter/config.toml (or $XDG_CONFIG_HOME/ado-gitter/config.toml)

# Azure DevOps organization (required unless base_url is set)
# organization = "your-organization"

# Organization URL, used to derive the organization name
# base_url = "https://dev.azure.com/your-organization"

# Personal Access Token (required, but consider using ADO_GITTER_PAT instead)
# pat = "your-pat-token"

# Projects whose repositories are all selected
# projects = ["platform"]

# Individual repositories, as "project/repository"
# repositories = ["web/frontend"]

# Clone over SSH instead of HTTPS (optional, defaults to false)
ssh_auth = false

# Skip forked repositories (optional, defaults to false)
skip_forks = false

# Skip disabled repositories (optional, defaults to true)
skip_disabled = true

# Identity lookup API: "legacy" or "graph" (optional, defaults to "legacy")
identity_api = "legacy"

# Auto-complete settings for non-draft pull requests
merge_strategy = "squash"
delete_source_branch = true
transition_work_items = true
"#;

fn missing(field: &str) -> ConfigError {
    ConfigError::MissingRequired {
        field: field.to_string(),
        env_var: format!("{ENV_PREFIX}{}", field.to_uppercase()),
    }
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

fn flag_or(value: Option<ParsedProperty<bool>>, default: bool) -> bool {
    value.map_or(default, ParsedProperty::into_value)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts the organization name from an Azure DevOps organization URL.
///
/// Accepts `https://dev.azure.com/{organization}` and `https://{organization}.visualstudio.com`.
pub fn organization_from_base_url(base_url: &str) -> Result<String, ConfigError> {
    let invalid_url = |message: &str| invalid("base_url", format!("{base_url}: {message}"));

    let url = Url::parse(base_url.trim()).map_err(|e| invalid_url(&e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid_url("missing host"))?
        .to_lowercase();

    let organization = if host == "dev.azure.com" {
        url.path_segments()
            .and_then(|mut segments| segments.find(|s| !s.is_empty()))
            .map(str::to_string)
    } else if let Some(subdomain) = host.strip_suffix(".visualstudio.com") {
        Some(subdomain.to_string())
    } else {
        return Err(invalid_url(
            "expected dev.azure.com/{organization} or {organization}.visualstudio.com",
        ));
    };

    organization
        .filter(|o| !o.is_empty())
        .ok_or_else(|| invalid_url("no organization in URL"))
}
