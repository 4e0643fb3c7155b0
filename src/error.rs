//! Unified error handling for the ado-migrator library.
//!
//! This module provides the error hierarchy using `thiserror`. The variants
//! are chosen so that the orchestrator can tell fatal setup failures apart
//! from per-item failures that only skip one repository, pull request or
//! work item.
//!
//! ## Error Categories
//!
//! - [`ApiError`]: Errors from Azure DevOps REST calls
//! - [`GitError`]: Errors from local git mirror operations
//! - [`ConfigError`]: Errors from configuration loading and validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_migrator::error::{MigratorError, ApiError};
//!
//! fn example() -> Result<(), MigratorError> {
//!     // Errors are automatically converted via From trait
//!     Err(ApiError::Unauthorized)?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the ado-migrator library.
#[derive(Error, Debug)]
pub enum MigratorError {
    /// An error occurred while interacting with the Azure DevOps API.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An error occurred during a git operation.
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// An error occurred while loading or validating configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A generic error for cases not covered by specific error types.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MigratorError {
    /// Returns true when the error is an authentication or authorization
    /// failure against either organization.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, MigratorError::Api(api) if api.is_auth_failure())
    }
}

/// Errors that can occur when interacting with the Azure DevOps API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The API request was unauthorized (401, or the 203 sign-in page Azure
    /// DevOps serves for an invalid PAT).
    #[error("Unauthorized: invalid or expired Personal Access Token")]
    Unauthorized,

    /// The PAT is valid but lacks the required scope (403).
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message from the API.
        message: String,
    },

    /// The requested resource was not found (404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the resource that was not found.
        resource: String,
    },

    /// The resource already exists (409).
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message from the API.
        message: String,
    },

    /// The API rate limit was exceeded (429).
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Number of seconds to wait before retrying.
        retry_after_seconds: u64,
    },

    /// The API returned an error response.
    #[error("API request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Failed to parse the API response.
    #[error("Failed to parse API response: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// A request URL could not be built from the configured endpoint.
    #[error("Invalid API URL: {message}")]
    InvalidUrl {
        /// Description of the problem.
        message: String,
    },

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Exceeded maximum pagination requests.
    #[error("Exceeded maximum requests ({max}) while fetching data, retrieved {retrieved} items")]
    PaginationLimitExceeded {
        /// Maximum allowed requests.
        max: usize,
        /// Number of items retrieved before the limit was hit.
        retrieved: usize,
    },
}

impl ApiError {
    /// Returns true for 401/403 style failures.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Forbidden { .. })
    }

    /// Returns true when the resource already exists on the server.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }
}

/// Errors that can occur during git operations.
#[derive(Error, Debug, Clone)]
pub enum GitError {
    /// The specified path is not a valid git repository.
    #[error("Not a valid git repository: {path}")]
    NotARepository {
        /// Path that was expected to be a repository.
        path: PathBuf,
    },

    /// A mirror clone failed.
    #[error("Failed to mirror-clone repository: {message}")]
    CloneFailed {
        /// Error message from git.
        message: String,
    },

    /// Pushing refs to the target remote failed.
    #[error("Failed to push to target remote: {message}")]
    PushFailed {
        /// Error message from git.
        message: String,
    },

    /// The target remote does not hold the refs that were pushed.
    #[error("Target refs differ from source after push: {}", mismatched.join(", "))]
    VerificationFailed {
        /// Ref names that are missing or point at a different object.
        mismatched: Vec<String>,
    },

    /// A git command execution failed.
    #[error("Git command failed: {command} - {message}")]
    CommandFailed {
        /// The git command that failed.
        command: String,
        /// Error message from git.
        message: String,
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

    /// The home/config directory could not be determined or created.
    #[error("Failed to prepare config directory at {path}: {message}")]
    DirectoryCreationError {
        /// Path where directory creation failed.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

/// Type alias for Results using MigratorError.
///
/// Note: This is not re-exported from the crate root to avoid shadowing `anyhow::Result`.
pub type MigratorResult<T> = std::result::Result<T, MigratorError>;
