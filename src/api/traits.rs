//! Trait for the Azure DevOps operations the migrators need.
//!
//! One implementation is bound to one organization/project pair. The
//! migrators only ever talk to `dyn AdoApi`, which lets them run against the
//! REST client in production and against [`super::fake::FakeAdo`] in tests.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{
    Comment, CommentThread, PrStatusFilter, ProjectInfo, PullRequest, Repository, WorkItem,
};

/// Input for creating a pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPullRequest {
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub title: String,
    pub description: String,
    pub is_draft: bool,
}

/// Input for creating a comment thread with its first comment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommentThread {
    pub content: String,
    pub status: Option<String>,
}

/// Final state to apply to a recreated pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullRequestStatusUpdate {
    Abandon,
    Complete { last_merge_source_commit: String },
}

/// A single JSON Patch operation for the work item endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchOperation {
    pub op: &'static str,
    pub path: String,
    pub value: serde_json::Value,
}

impl PatchOperation {
    /// `add` operation on a work item field, e.g. `System.Title`.
    pub fn add_field(field: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            op: "add",
            path: format!("/fields/{}", field),
            value: value.into(),
        }
    }

    /// Appends a relation (`rel`, `url`, optional comment).
    pub fn add_relation(rel: &str, url: &str, comment: Option<&str>) -> Self {
        let mut value = serde_json::json!({ "rel": rel, "url": url });
        if let Some(comment) = comment {
            value["attributes"] = serde_json::json!({ "comment": comment });
        }
        Self {
            op: "add",
            path: "/relations/-".to_string(),
            value,
        }
    }

    /// Returns the field name for `/fields/<name>` paths.
    pub fn field_name(&self) -> Option<&str> {
        self.path.strip_prefix("/fields/")
    }
}

/// Operations against one Azure DevOps project.
#[async_trait]
pub trait AdoApi: Send + Sync {
    /// `org/project` label used in logs.
    fn label(&self) -> String;

    /// Reads the project. Used to validate the PAT before migrating.
    async fn get_project(&self) -> Result<ProjectInfo, ApiError>;

    async fn list_repositories(&self) -> Result<Vec<Repository>, ApiError>;

    /// Looks a repository up by name; `Ok(None)` when it does not exist.
    async fn get_repository(&self, name: &str) -> Result<Option<Repository>, ApiError>;

    /// Creates an empty repository. Fails with [`ApiError::Conflict`] when
    /// the name is taken.
    async fn create_repository(&self, project_id: &str, name: &str)
    -> Result<Repository, ApiError>;

    async fn set_default_branch(&self, repository_id: &str, ref_name: &str)
    -> Result<(), ApiError>;

    /// Lists every pull request of a repository, following pagination.
    async fn list_pull_requests(
        &self,
        repository_id: &str,
        status: PrStatusFilter,
    ) -> Result<Vec<PullRequest>, ApiError>;

    async fn list_threads(
        &self,
        repository_id: &str,
        pull_request_id: i32,
    ) -> Result<Vec<CommentThread>, ApiError>;

    async fn create_pull_request(
        &self,
        repository_id: &str,
        pull_request: &NewPullRequest,
    ) -> Result<PullRequest, ApiError>;

    async fn create_thread(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        thread: &NewCommentThread,
    ) -> Result<CommentThread, ApiError>;

    /// Adds a reply to an existing thread.
    async fn add_comment(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        thread_id: i32,
        parent_comment_id: i32,
        content: &str,
    ) -> Result<Comment, ApiError>;

    async fn update_pull_request_status(
        &self,
        repository_id: &str,
        pull_request_id: i32,
        update: &PullRequestStatusUpdate,
    ) -> Result<(), ApiError>;

    /// Runs a WIQL query and returns the matching work item ids.
    async fn query_work_item_ids(&self, wiql: &str) -> Result<Vec<i32>, ApiError>;

    /// Reads work items with their relations. Ids that no longer exist are
    /// silently left out.
    async fn get_work_items(&self, ids: &[i32]) -> Result<Vec<WorkItem>, ApiError>;

    async fn create_work_item(
        &self,
        work_item_type: &str,
        patch: &[PatchOperation],
    ) -> Result<WorkItem, ApiError>;

    async fn update_work_item(
        &self,
        id: i32,
        patch: &[PatchOperation],
    ) -> Result<WorkItem, ApiError>;

    /// API URL identifying a work item, as used in relation targets.
    fn work_item_url(&self, id: i32) -> String;
}
