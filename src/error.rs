//! Typed errors for the Azure DevOps adapter.
//!
//! Operation code propagates `anyhow::Error` with context, like the API layer does. The
//! failures a caller may want to react to are typed here with `thiserror` and travel inside
//! those `anyhow` errors, so they can be recovered with `downcast_ref`.
//!
//! ## Error Categories
//!
//! - [`ApiError`]: provider data the adapter cannot work with, and unsupported operations
//! - [`ConfigError`]: configuration loading and validation
//!
//! ## Example
//!
//! ```rust
//! use ado_gitter::error::{AdoError, ConfigError};
//!
//! fn example() -> Result<(), AdoError> {
//!     Err(ConfigError::MissingRequired {
//!         field: "pat".to_string(),
//!         env_var: "ADO_GITTER_PAT".to_string(),
//!     })?;
//!     Ok(())
//! }
//!
//! assert!(matches!(example(), Err(AdoError::Config(_))));
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The umbrella error type of the crate.
#[derive(Error, Debug)]
pub enum AdoError {
    /// The provider returned data the adapter cannot use, or refused an operation.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An error occurred while loading or validating configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport and any other propagated failure.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Errors raised by the adapter while interpreting Azure DevOps data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The repository has no default branch, which happens until the first push.
    #[error("Repository {project}/{repository} has no default branch (is it initialized?)")]
    UninitializedRepository {
        /// Name of the project holding the repository.
        project: String,
        /// Name of the repository.
        repository: String,
    },

    /// Azure DevOps offers no equivalent for the requested operation.
    #[error("{operation} is not supported by Azure DevOps")]
    Unsupported {
        /// Name of the operation.
        operation: String,
    },
}

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration field is missing.
    #[error("{field} is required (use --{field}, {env_var} env var, or config file)")]
    MissingRequired {
        /// Name of the missing field.
        field: String,
        /// Environment variable name for this field.
        env_var: String,
    },

    /// Failed to read the configuration file.
    #[error("Failed to read config file at {path}: {message}")]
    FileReadError {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file at {path}: {message}")]
    ParseError {
        /// Path to the config file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// An invalid value was provided for a configuration field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// A repository reference is neither `project` nor `project/repository`.
    #[error("Invalid repository reference '{reference}' (expected 'project/repository')")]
    InvalidRepositoryReference {
        /// The reference as written.
        reference: String,
    },

    /// Failed to create config directory.
    #[error("Failed to create config directory at {path}: {message}")]
    DirectoryCreationError {
        /// Path where directory creation failed.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

/// Type alias for Results using AdoError.
///
/// Not re-exported from the crate root to avoid shadowing `anyhow::Result`.
pub type AdoResult<T> = std::result::Result<T, AdoError>;
