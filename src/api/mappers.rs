//! Conversions from the REST wire types to the domain models.

use super::wire;
use crate::models::{
    Comment, CommentThread, CommentType, IdentityRef, ProjectInfo, PullRequest,
    PullRequestStatus, Repository, ThreadContext, WorkItem, WorkItemRelation,
};

impl From<wire::TeamProject> for ProjectInfo {
    fn from(project: wire::TeamProject) -> Self {
        ProjectInfo {
            id: project.id,
            name: project.name,
        }
    }
}

impl From<wire::GitRepository> for Repository {
    fn from(repo: wire::GitRepository) -> Self {
        Repository {
            id: repo.id,
            name: repo.name,
            default_branch: repo.default_branch,
            remote_url: repo.remote_url.unwrap_or_default(),
            is_disabled: repo.is_disabled.unwrap_or(false),
            size: repo.size.unwrap_or(0),
        }
    }
}

impl From<wire::IdentityRef> for IdentityRef {
    fn from(identity: wire::IdentityRef) -> Self {
        IdentityRef {
            display_name: identity
                .display_name
                .unwrap_or_else(|| "Unknown".to_string()),
            unique_name: identity.unique_name,
        }
    }
}

/// Maps the REST status string; unknown values become `NotSet`.
pub fn parse_pull_request_status(status: Option<&str>) -> PullRequestStatus {
    match status.map(str::to_ascii_lowercase).as_deref() {
        Some("active") => PullRequestStatus::Active,
        Some("completed") => PullRequestStatus::Completed,
        Some("abandoned") => PullRequestStatus::Abandoned,
        _ => PullRequestStatus::NotSet,
    }
}

impl From<wire::GitPullRequest> for PullRequest {
    fn from(pr: wire::GitPullRequest) -> Self {
        PullRequest {
            id: pr.pull_request_id,
            title: pr.title.unwrap_or_default(),
            description: pr.description,
            source_ref_name: pr.source_ref_name,
            target_ref_name: pr.target_ref_name,
            status: parse_pull_request_status(pr.status.as_deref()),
            created_by: pr.created_by.unwrap_or_default().into(),
            creation_date: pr.creation_date,
            is_draft: pr.is_draft.unwrap_or(false),
            last_merge_source_commit: pr.last_merge_source_commit.map(|c| c.commit_id),
        }
    }
}

fn parse_comment_type(comment_type: Option<&str>) -> CommentType {
    match comment_type.map(str::to_ascii_lowercase).as_deref() {
        Some("text") | None => CommentType::Text,
        Some("codechange") => CommentType::CodeChange,
        Some("system") => CommentType::System,
        Some(_) => CommentType::Unknown,
    }
}

impl From<wire::Comment> for Comment {
    fn from(comment: wire::Comment) -> Self {
        Comment {
            id: comment.id,
            parent_comment_id: comment.parent_comment_id,
            author: comment.author.unwrap_or_default().into(),
            content: comment.content.unwrap_or_default(),
            published_date: comment.published_date,
            comment_type: parse_comment_type(comment.comment_type.as_deref()),
            is_deleted: comment.is_deleted.unwrap_or(false),
        }
    }
}

impl From<wire::CommentThread> for CommentThread {
    fn from(thread: wire::CommentThread) -> Self {
        let context = thread.thread_context.and_then(|ctx| {
            let line = ctx
                .right_file_start
                .or(ctx.left_file_start)
                .map(|pos| pos.line);
            ctx.file_path
                .map(|file_path| ThreadContext { file_path, line })
        });

        CommentThread {
            id: thread.id,
            status: thread.status,
            context,
            published_date: thread.published_date,
            comments: thread.comments.into_iter().map(Comment::from).collect(),
        }
    }
}

impl From<wire::WorkItemRelation> for WorkItemRelation {
    fn from(relation: wire::WorkItemRelation) -> Self {
        WorkItemRelation {
            rel: relation.rel,
            url: relation.url,
            comment: relation
                .attributes
                .as_ref()
                .and_then(|attrs| attrs.get("comment"))
                .and_then(|c| c.as_str())
                .filter(|c| !c.is_empty())
                .map(String::from),
        }
    }
}

impl From<wire::WorkItem> for WorkItem {
    fn from(item: wire::WorkItem) -> Self {
        WorkItem {
            id: item.id,
            fields: item.fields,
            relations: item
                .relations
                .unwrap_or_default()
                .into_iter()
                .map(WorkItemRelation::from)
                .collect(),
        }
    }
}

/// Extracts the work item id from a work item API URL such as
/// `https://dev.azure.com/org/_apis/wit/workItems/123`.
///
/// Returns `None` for anything that is not a work item URL.
pub fn extract_work_item_id(url: &str) -> Option<i32> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let id = segments.next()?.parse().ok()?;
    segments
        .next()
        .filter(|s| s.eq_ignore_ascii_case("workitems"))
        .map(|_| id)
}
