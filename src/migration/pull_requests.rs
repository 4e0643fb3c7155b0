//! Pull request phase.
//!
//! Source pull requests are recreated in the same-named target repository
//! with a `[MIGRATED]` title and a provenance footer. Review threads are
//! replayed in chronological order with the original author and time in a
//! header, and the final status of closed pull requests is mirrored.
//!
//! Target pull requests are listed once per repository. A source pull
//! request that already has a marked counterpart is not created again: its
//! replayed comments are compared with the source and whatever an
//! interrupted run left out is posted, along with a status that was never
//! mirrored. A counterpart with nothing missing is skipped, which makes a
//! second run a no-op.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::marker::{self, PullRequestOrigin};
use super::{MigrationContext, ensure_target_repository, item_failure};
use crate::api::{NewCommentThread, NewPullRequest, PullRequestStatusUpdate};
use crate::core::output::{ItemOutcome, Phase, ProgressEvent, SummaryCounts};
use crate::error::ApiError;
use crate::models::{
    Comment, CommentThread, PrStatusFilter, ProjectInfo, PullRequest, PullRequestStatus,
    Repository, ThreadContext,
};

const PHASE: Phase = Phase::PullRequests;

/// Migrates the pull requests of every selected, enabled repository.
pub async fn migrate_pull_requests(
    ctx: &MigrationContext,
    target_project: &ProjectInfo,
) -> Result<Vec<ItemOutcome>, ApiError> {
    let repositories: Vec<Repository> = ctx
        .source_repositories()
        .await?
        .into_iter()
        .filter(|r| !r.is_disabled)
        .collect();
    ctx.report(ProgressEvent::PhaseStart {
        phase: PHASE,
        total: repositories.len(),
    });

    let mut outcomes = Vec::new();
    for repo in &repositories {
        migrate_repository(ctx, &target_project.id, repo, &mut outcomes).await?;
    }

    ctx.report(ProgressEvent::PhaseComplete {
        phase: PHASE,
        counts: SummaryCounts::from_outcomes(&outcomes),
    });
    Ok(outcomes)
}

async fn migrate_repository(
    ctx: &MigrationContext,
    target_project_id: &str,
    repo: &Repository,
    outcomes: &mut Vec<ItemOutcome>,
) -> Result<(), ApiError> {
    let mut source_prs = match ctx
        .source
        .list_pull_requests(&repo.id, *ctx.config.pr_status)
        .await
    {
        Ok(prs) => prs,
        Err(e) => {
            warn!(repository = %repo.name, error = %e, "Failed to list source pull requests");
            outcomes.push(ctx.complete(item_failure(PHASE, &repo.name, e)?));
            return Ok(());
        }
    };
    if source_prs.is_empty() {
        debug!(repository = %repo.name, "No pull requests to migrate");
        return Ok(());
    }
    source_prs.sort_by_key(|pr| pr.id);

    let target_repo =
        match ensure_target_repository(ctx.target.as_ref(), target_project_id, &repo.name).await {
            Ok((target_repo, _)) => target_repo,
            Err(e) => {
                warn!(repository = %repo.name, error = %e, "Failed to prepare target repository");
                outcomes.push(ctx.complete(item_failure(PHASE, &repo.name, e)?));
                return Ok(());
            }
        };

    let existing = match ctx
        .target
        .list_pull_requests(&target_repo.id, PrStatusFilter::All)
        .await
    {
        Ok(prs) => prs,
        Err(e) => {
            warn!(repository = %repo.name, error = %e, "Failed to list target pull requests");
            outcomes.push(ctx.complete(item_failure(PHASE, &repo.name, e)?));
            return Ok(());
        }
    };

    let mut migrator = RepositoryPullRequests {
        ctx,
        source_repo: repo,
        target_repo: &target_repo,
        existing,
    };
    for pr in &source_prs {
        let outcome = migrator.migrate(pr).await?;
        outcomes.push(ctx.complete(outcome));
    }
    Ok(())
}

/// Pull request migration inside one repository pair.
struct RepositoryPullRequests<'a> {
    ctx: &'a MigrationContext,
    source_repo: &'a Repository,
    target_repo: &'a Repository,
    /// Target pull requests, including the ones created by this run.
    existing: Vec<PullRequest>,
}

impl RepositoryPullRequests<'_> {
    fn item(&self, pr: &PullRequest) -> String {
        format!("{} !{}", self.source_repo.name, pr.id)
    }

    fn origin(&self, pr: &PullRequest) -> PullRequestOrigin {
        PullRequestOrigin {
            organization: self.ctx.config.source.organization.value().clone(),
            project: self.ctx.config.source.project.value().clone(),
            repository: self.source_repo.name.clone(),
            pull_request_id: pr.id,
        }
    }

    fn find_migrated(&self, pr: &PullRequest) -> Option<&PullRequest> {
        let origin = self.origin(pr);
        self.existing
            .iter()
            .find(|t| marker::is_migration_of(t, pr, &origin))
    }

    async fn migrate(&mut self, pr: &PullRequest) -> Result<ItemOutcome, ApiError> {
        let item = self.item(pr);
        if let Some(existing) = self.find_migrated(pr).cloned() {
            return self.resume(pr, item, &existing).await;
        }

        let created = match self.create(pr).await {
            Ok(created) => created,
            Err(e) if e.is_conflict() => return self.resolve_conflict(pr, item, e).await,
            Err(e) => {
                warn!(pull_request = %item, error = %e, "Failed to create pull request");
                return item_failure(PHASE, item, e);
            }
        };
        info!(pull_request = %item, target = created.id, "Created pull request");
        self.existing.push(created.clone());

        let comments = match self.replay_threads(pr, created.id, Vec::new()).await {
            Ok(count) => count,
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(e) => {
                warn!(pull_request = %item, error = %e, "Comment replay failed");
                return Ok(ItemOutcome::failed(
                    PHASE,
                    item,
                    format!(
                        "created as !{} but comment replay failed, a rerun resumes it: {}",
                        created.id, e
                    ),
                ));
            }
        };

        let mut detail = format!("created as !{} with {} comments", created.id, comments);
        detail.push_str(&self.mirror_status(pr, &created).await?);
        Ok(ItemOutcome::migrated(PHASE, item, detail))
    }

    /// Completes the migration of `pr` into `existing`, created by an
    /// earlier run: posts the comments that are missing and mirrors the
    /// final status if the target is still active.
    async fn resume(
        &self,
        pr: &PullRequest,
        item: String,
        existing: &PullRequest,
    ) -> Result<ItemOutcome, ApiError> {
        let replayed = match self
            .ctx
            .target
            .list_threads(&self.target_repo.id, existing.id)
            .await
        {
            Ok(threads) => threads,
            Err(e) => return item_failure(PHASE, item, e),
        };
        let posted = match self.replay_threads(pr, existing.id, replayed).await {
            Ok(posted) => posted,
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(e) => {
                warn!(pull_request = %item, target = existing.id, error = %e, "Comment replay failed");
                return Ok(ItemOutcome::failed(
                    PHASE,
                    item,
                    format!("comment replay on !{} failed again: {}", existing.id, e),
                ));
            }
        };
        let status_pending = existing.status == PullRequestStatus::Active
            && matches!(
                pr.status,
                PullRequestStatus::Completed | PullRequestStatus::Abandoned
            );

        if posted == 0 && !status_pending {
            info!(pull_request = %item, target = existing.id, "Already migrated, skipping");
            return Ok(ItemOutcome::skipped(
                PHASE,
                item,
                format!("already migrated as !{}", existing.id),
            ));
        }

        info!(pull_request = %item, target = existing.id, posted, "Resumed migration");
        let mut detail = format!("resumed on !{}, {} missing comments posted", existing.id, posted);
        if status_pending {
            detail.push_str(&self.mirror_status(pr, existing).await?);
        }
        Ok(ItemOutcome::migrated(PHASE, item, detail))
    }

    async fn create(&self, pr: &PullRequest) -> Result<PullRequest, ApiError> {
        let origin = self.origin(pr);
        let request = NewPullRequest {
            source_ref_name: pr.source_ref_name.clone(),
            target_ref_name: pr.target_ref_name.clone(),
            title: marker::marked_title(&pr.title),
            description: marker::marked_description(pr.description.as_deref(), &origin),
            is_draft: pr.is_draft,
        };
        self.ctx
            .target
            .create_pull_request(&self.target_repo.id, &request)
            .await
    }

    /// A 409 on create means an active pull request for the same branches
    /// exists. If it is this pull request's migration, created concurrently,
    /// the pull request counts as already migrated.
    async fn resolve_conflict(
        &mut self,
        pr: &PullRequest,
        item: String,
        conflict: ApiError,
    ) -> Result<ItemOutcome, ApiError> {
        match self
            .ctx
            .target
            .list_pull_requests(&self.target_repo.id, PrStatusFilter::All)
            .await
        {
            Ok(refreshed) => self.existing = refreshed,
            Err(e) => return item_failure(PHASE, item, e),
        }
        match self.find_migrated(pr) {
            Some(existing) => Ok(ItemOutcome::skipped(
                PHASE,
                item,
                format!("already migrated as !{}", existing.id),
            )),
            None => {
                warn!(pull_request = %item, error = %conflict, "Failed to create pull request");
                item_failure(PHASE, item, conflict)
            }
        }
    }

    /// Replays user comments thread by thread. `replayed` holds the target
    /// threads already posted; comments found there are not posted again.
    /// Returns the number of comments posted.
    async fn replay_threads(
        &self,
        source_pr: &PullRequest,
        target_pr_id: i32,
        mut replayed: Vec<CommentThread>,
    ) -> Result<usize, ApiError> {
        let mut threads = self
            .ctx
            .source
            .list_threads(&self.source_repo.id, source_pr.id)
            .await?;
        threads.sort_by(|a, b| {
            a.published_date
                .cmp(&b.published_date)
                .then(a.id.cmp(&b.id))
        });

        let mut posted = 0;
        for thread in &threads {
            posted += self.replay_thread(thread, target_pr_id, &mut replayed).await?;
        }
        Ok(posted)
    }

    async fn replay_thread(
        &self,
        thread: &CommentThread,
        target_pr_id: i32,
        replayed: &mut Vec<CommentThread>,
    ) -> Result<usize, ApiError> {
        let mut comments: Vec<&Comment> = thread
            .comments
            .iter()
            .filter(|c| c.is_replayable())
            .collect();
        comments.sort_by(|a, b| {
            a.published_date
                .cmp(&b.published_date)
                .then(a.id.cmp(&b.id))
        });
        let Some((first, replies)) = comments.split_first() else {
            return Ok(0);
        };

        let opening = render_comment(first, thread.context.as_ref());
        let mut posted = 0;
        let target_thread = match replayed
            .iter()
            .position(|t| t.comments.first().is_some_and(|c| c.content == opening))
        {
            Some(index) => replayed.swap_remove(index),
            None => {
                let status = thread
                    .status
                    .as_deref()
                    .filter(|s| !s.eq_ignore_ascii_case("unknown"))
                    .map(String::from);
                posted += 1;
                self.ctx
                    .target
                    .create_thread(
                        &self.target_repo.id,
                        target_pr_id,
                        &NewCommentThread {
                            content: opening,
                            status,
                        },
                    )
                    .await?
            }
        };
        let thread_id = target_thread.id;
        let root_id = target_thread.comments.first().map(|c| c.id).unwrap_or(1);
        // Replies an earlier run already posted, matched by rendered text.
        let mut present: Vec<Comment> = target_thread.comments.into_iter().skip(1).collect();

        // Source comment id to target comment id, for reply chains.
        let mut posted_ids: HashMap<i32, i32> = HashMap::from([(first.id, root_id)]);
        for reply in replies {
            let content = render_comment(reply, None);
            if let Some(index) = present.iter().position(|c| c.content == content) {
                posted_ids.insert(reply.id, present.remove(index).id);
                continue;
            }
            let parent = posted_ids
                .get(&reply.parent_comment_id)
                .copied()
                .unwrap_or(root_id);
            let comment = self
                .ctx
                .target
                .add_comment(
                    &self.target_repo.id,
                    target_pr_id,
                    thread_id,
                    parent,
                    &content,
                )
                .await?;
            posted_ids.insert(reply.id, comment.id);
            posted += 1;
        }
        Ok(posted)
    }

    /// Applies the final status of a closed source pull request. Returns a
    /// note for the outcome detail; failures only produce warnings.
    async fn mirror_status(
        &self,
        source: &PullRequest,
        created: &PullRequest,
    ) -> Result<String, ApiError> {
        let update = match source.status {
            PullRequestStatus::Completed => match &created.last_merge_source_commit {
                Some(commit) => PullRequestStatusUpdate::Complete {
                    last_merge_source_commit: commit.clone(),
                },
                None => PullRequestStatusUpdate::Abandon,
            },
            PullRequestStatus::Abandoned => PullRequestStatusUpdate::Abandon,
            PullRequestStatus::Active | PullRequestStatus::NotSet => return Ok(String::new()),
        };

        match self.update_status(created.id, &update).await {
            Ok(()) => Ok(format!(", {}", status_label(&update))),
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            Err(e) if matches!(update, PullRequestStatusUpdate::Complete { .. }) => {
                warn!(pull_request = created.id, error = %e, "Completion rejected, abandoning instead");
                match self
                    .update_status(created.id, &PullRequestStatusUpdate::Abandon)
                    .await
                {
                    Ok(()) => Ok(", abandoned (completion rejected)".to_string()),
                    Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
                    Err(e) => {
                        warn!(pull_request = created.id, error = %e, "Failed to mirror status");
                        Ok(format!(", status not mirrored: {}", e))
                    }
                }
            }
            Err(e) => {
                warn!(pull_request = created.id, error = %e, "Failed to mirror status");
                Ok(format!(", status not mirrored: {}", e))
            }
        }
    }

    async fn update_status(
        &self,
        pull_request_id: i32,
        update: &PullRequestStatusUpdate,
    ) -> Result<(), ApiError> {
        self.ctx
            .target
            .update_pull_request_status(&self.target_repo.id, pull_request_id, update)
            .await
    }
}

fn status_label(update: &PullRequestStatusUpdate) -> &'static str {
    match update {
        PullRequestStatusUpdate::Abandon => "abandoned",
        PullRequestStatusUpdate::Complete { .. } => "completed",
    }
}

/// Comment text with a header naming the original author and time. The
/// file context of a review thread goes on its first comment.
pub fn render_comment(comment: &Comment, context: Option<&ThreadContext>) -> String {
    let posted = comment
        .published_date
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "an unknown date".to_string());
    let mut text = format!(
        "**{}** Originally posted by **{}** on {}\n",
        marker::TITLE_PREFIX,
        comment.author.display_name,
        posted
    );
    if let Some(context) = context {
        match context.line {
            Some(line) => text.push_str(&format!("*File: `{}`, line {}*\n", context.file_path, line)),
            None => text.push_str(&format!("*File: `{}`*\n", context.file_path)),
        }
    }
    text.push('\n');
    text.push_str(&comment.content);
    text
}
