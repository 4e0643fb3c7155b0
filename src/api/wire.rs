//! Serde representations of the Azure DevOps REST payloads.
//!
//! Only the fields the migrator reads or writes are declared; everything
//! else in the responses is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope used by every list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub value: Vec<T>,
}

/// Body of an error response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    pub id: String,
    pub name: String,
    pub default_branch: Option<String>,
    pub remote_url: Option<String>,
    pub is_disabled: Option<bool>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    pub display_name: Option<String>,
    pub unique_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommitRef {
    pub commit_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitPullRequest {
    pub pull_request_id: i32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub status: Option<String>,
    pub created_by: Option<IdentityRef>,
    pub creation_date: Option<DateTime<Utc>>,
    pub is_draft: Option<bool>,
    pub last_merge_source_commit: Option<GitCommitRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilePosition {
    pub line: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadContext {
    pub file_path: Option<String>,
    pub right_file_start: Option<FilePosition>,
    pub left_file_start: Option<FilePosition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i32,
    #[serde(default)]
    pub parent_comment_id: i32,
    pub author: Option<IdentityRef>,
    pub content: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub comment_type: Option<String>,
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: i32,
    pub status: Option<String>,
    pub thread_context: Option<CommentThreadContext>,
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub is_deleted: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkItemRelation {
    pub rel: String,
    pub url: String,
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkItem {
    pub id: i32,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub relations: Option<Vec<WorkItemRelation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkItemReference {
    pub id: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WiqlResult {
    #[serde(default)]
    pub work_items: Vec<WorkItemReference>,
}

// ----------------------------------------------------------------------------
// Request bodies
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ProjectReference {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRepository {
    pub name: String,
    pub project: ProjectReference,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRepository {
    pub default_branch: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePullRequest {
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub title: String,
    pub description: String,
    pub is_draft: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePullRequest {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_merge_source_commit: Option<GitCommitRef>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub parent_comment_id: i32,
    pub content: String,
    /// 1 = text
    pub comment_type: i32,
}

#[derive(Debug, Serialize)]
pub struct CreateThread {
    pub comments: Vec<CreateComment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WiqlQuery {
    pub query: String,
}
