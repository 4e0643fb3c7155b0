//! # Azure DevOps Project Migrator
//!
//! Copies an Azure DevOps project into another project, possibly in another
//! organization:
//!
//! - Git repositories, mirrored with all branches and tags
//! - Pull requests, recreated with a `[MIGRATED]` marker and their comments
//! - Optionally work items, with links rebuilt between the new items
//!
//! Re-running a migration is safe: entities that were migrated before are
//! recognized and skipped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ado_migrator::{AzureDevOpsClient, Endpoint, MigrationConfig, Orchestrator};
//! use ado_migrator::core::output::NullReporter;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Endpoint::new("old-org", "Legacy", "source-pat", "https://dev.azure.com");
//! let target = Endpoint::new("new-org", "Platform", "target-pat", "https://dev.azure.com");
//!
//! let orchestrator = Orchestrator::new(
//!     MigrationConfig::new(source.clone(), target.clone()),
//!     Arc::new(AzureDevOpsClient::new(&source)?),
//!     Arc::new(AzureDevOpsClient::new(&target)?),
//!     Arc::new(NullReporter),
//! );
//! let report = orchestrator.run().await?;
//! println!("{:?}", report.summary().result);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod logging;
pub mod migration;
pub mod models;
pub mod parsed_property;

// Re-export commonly used types for convenience
pub use api::{AdoApi, AzureDevOpsClient};
pub use config::Config;
pub use error::{ApiError, MigratorError};
pub use migration::{IdMap, MigrationReport, Orchestrator};
pub use models::{Args, Endpoint, MigrationConfig};

/// Core result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
