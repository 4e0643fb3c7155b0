//! Azure DevOps API access.
//!
//! The migrators depend on the [`AdoApi`] trait only. [`AzureDevOpsClient`]
//! implements it over the REST API 7.1 with PAT Basic authentication, and
//! [`fake::FakeAdo`] implements it in memory for tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_migrator::api::{AdoApi, AzureDevOpsClient};
//! use ado_migrator::models::Endpoint;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = Endpoint::new("my-org", "my-project", "my-pat", "https://dev.azure.com");
//! let client = AzureDevOpsClient::new(&endpoint)?;
//!
//! let project = client.get_project().await?;
//! println!("Connected to {} ({})", project.name, project.id);
//! # Ok(())
//! # }
//! ```

mod client;
mod credential;
pub mod fake;
mod mappers;
mod traits;
mod wire;

pub use client::AzureDevOpsClient;
pub use credential::PatCredential;
pub use mappers::extract_work_item_id;
pub use traits::{
    AdoApi, NewCommentThread, NewPullRequest, PatchOperation, PullRequestStatusUpdate,
};
