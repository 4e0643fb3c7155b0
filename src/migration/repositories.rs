//! Repository phase.
//!
//! Every source repository gets a same-named target repository. Branches
//! and tags are copied by mirror-cloning the source into the work directory
//! and force-pushing `refs/heads/*` and `refs/tags/*` to the target, after
//! which the target refs are compared with the mirror.

use futures::{StreamExt, TryStreamExt, stream};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{MigrationContext, ensure_target_repository, item_failure};
use crate::core::output::{ItemOutcome, Phase, ProgressEvent, SummaryCounts};
use crate::error::{ApiError, GitError};
use crate::git::{self, GitAuth};
use crate::models::{ProjectInfo, Repository};

const PHASE: Phase = Phase::Repositories;

/// Migrates all selected repositories with at most `max_concurrent_repos`
/// in flight. Returns one outcome per repository.
pub async fn migrate_repositories(
    ctx: &MigrationContext,
    target_project: &ProjectInfo,
    work_dir: &Path,
) -> Result<Vec<ItemOutcome>, ApiError> {
    let repositories = ctx.source_repositories().await?;
    let missing = ctx.missing_requested(&repositories);
    ctx.report(ProgressEvent::PhaseStart {
        phase: PHASE,
        total: repositories.len() + missing.len(),
    });

    let mut outcomes: Vec<ItemOutcome> = missing
        .into_iter()
        .map(|name| {
            warn!(repository = %name, "Requested repository does not exist in source");
            ctx.complete(ItemOutcome::failed(
                PHASE,
                name,
                "repository not found in source project",
            ))
        })
        .collect();

    let max_concurrent = (*ctx.config.max_concurrent_repos).max(1);
    let migrated: Vec<ItemOutcome> = stream::iter(repositories.iter())
        .map(|repo| migrate_repository(ctx, &target_project.id, repo, work_dir))
        .buffer_unordered(max_concurrent)
        .try_collect()
        .await?;
    outcomes.extend(migrated);

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
    work_dir: &Path,
) -> Result<ItemOutcome, ApiError> {
    if repo.is_disabled {
        info!(repository = %repo.name, "Skipping disabled repository");
        return Ok(ctx.complete(ItemOutcome::skipped(
            PHASE,
            &repo.name,
            "source repository is disabled",
        )));
    }

    let target_repo =
        match ensure_target_repository(ctx.target.as_ref(), target_project_id, &repo.name).await {
            Ok((target_repo, _)) => target_repo,
            Err(e) => {
                tracing::error!(repository = %repo.name, error = %e, "Failed to prepare target repository");
                return item_failure(PHASE, &repo.name, e).map(|o| ctx.complete(o));
            }
        };

    let Some(default_branch) = repo.default_branch.clone() else {
        info!(repository = %repo.name, "Source repository is empty, nothing to push");
        return Ok(ctx.complete(ItemOutcome::migrated(
            PHASE,
            &repo.name,
            "empty repository created without push",
        )));
    };

    let job = MirrorJob {
        source_url: repo.remote_url.clone(),
        target_url: target_repo.remote_url.clone(),
        mirror_path: work_dir.join(mirror_dir_name(&repo.name)),
        source_auth: ctx.source_git.clone(),
        target_auth: ctx.target_git.clone(),
    };
    info!(repository = %repo.name, size = repo.size, "Mirroring repository");
    let pushed = match tokio::task::spawn_blocking(move || job.run()).await {
        Ok(Ok(pushed)) => pushed,
        Ok(Err(e)) => {
            tracing::error!(repository = %repo.name, error = %e, "Repository mirror failed");
            return Ok(ctx.complete(ItemOutcome::failed(PHASE, &repo.name, e)));
        }
        Err(e) => {
            tracing::error!(repository = %repo.name, error = %e, "Mirror task aborted");
            return Ok(ctx.complete(ItemOutcome::failed(
                PHASE,
                &repo.name,
                format!("mirror task aborted: {}", e),
            )));
        }
    };

    let mut detail = format!("{} refs pushed", pushed);
    if pushed > 0 && target_repo.default_branch.as_deref() != Some(default_branch.as_str()) {
        match ctx
            .target
            .set_default_branch(&target_repo.id, &default_branch)
            .await
        {
            Ok(()) => {}
            Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
            Err(e) => {
                warn!(repository = %repo.name, error = %e, "Failed to set default branch");
                detail.push_str(&format!(", default branch not set: {}", e));
            }
        }
    }

    info!(repository = %repo.name, refs = pushed, "Repository migrated");
    Ok(ctx.complete(ItemOutcome::migrated(PHASE, &repo.name, detail)))
}

/// Directory name of a mirror inside the work directory.
fn mirror_dir_name(repository: &str) -> String {
    let safe: String = repository
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}.git", safe)
}

/// Blocking git work for one repository.
struct MirrorJob {
    source_url: String,
    target_url: String,
    mirror_path: PathBuf,
    source_auth: GitAuth,
    target_auth: GitAuth,
}

impl MirrorJob {
    /// Clones, pushes and verifies. Returns the number of refs pushed.
    ///
    /// The mirror is removed afterwards, whether or not the push worked.
    fn run(self) -> Result<usize, GitError> {
        if self.mirror_path.exists() {
            remove_mirror(&self.mirror_path)?;
        }
        git::mirror_clone(&self.source_url, &self.mirror_path, &self.source_auth)?;

        let result = self.push_and_verify();
        if let Err(e) = remove_mirror(&self.mirror_path) {
            warn!(path = %self.mirror_path.display(), error = %e, "Failed to remove mirror");
        }
        result
    }

    fn push_and_verify(&self) -> Result<usize, GitError> {
        let local = git::list_local_refs(&self.mirror_path)?;
        if local.is_empty() {
            return Ok(0);
        }

        git::push_refs(&self.mirror_path, &self.target_url, &self.target_auth)?;
        let remote = git::list_remote_refs(&self.target_url, &self.target_auth)?;
        git::verify_pushed_refs(&local, &remote)?;
        Ok(local.len())
    }
}

fn remove_mirror(path: &Path) -> Result<(), GitError> {
    std::fs::remove_dir_all(path).map_err(|e| GitError::CommandFailed {
        command: format!("remove {}", path.display()),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AdoApi;
    use crate::api::fake::FakeAdo;
    use crate::core::output::{ItemStatus, NullReporter};
    use crate::models::{Endpoint, MigrationConfig};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        work_dir: TempDir,
        source: Arc<FakeAdo>,
        target: Arc<FakeAdo>,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let source = Arc::new(FakeAdo::new("old-org", "Legacy").with_git_root(root.path()));
            let target = Arc::new(FakeAdo::new("new-org", "Platform").with_git_root(root.path()));
            Self {
                _root: root,
                work_dir: TempDir::new().unwrap(),
                source,
                target,
            }
        }

        fn context(&self, configure: impl FnOnce(&mut MigrationConfig)) -> MigrationContext {
            let mut config = MigrationConfig::new(
                Endpoint::new("old-org", "Legacy", "source-pat", "https://ado.fake"),
                Endpoint::new("new-org", "Platform", "target-pat", "https://ado.fake"),
            );
            configure(&mut config);
            MigrationContext::new(
                config,
                self.source.clone(),
                self.target.clone(),
                Arc::new(NullReporter),
            )
        }

        async fn run(&self, ctx: &MigrationContext) -> Vec<ItemOutcome> {
            let project = self.target.get_project().await.unwrap();
            migrate_repositories(ctx, &project, self.work_dir.path())
                .await
                .unwrap()
        }
    }

    /// # Mirror Three Commits
    ///
    /// Tests copying a repository with history and a tag.
    ///
    /// ## Test Scenario
    /// - Source `svc-a` has 3 commits on main and a tag
    ///
    /// ## Expected Outcome
    /// - Target `svc-a` has the same commits in the same order
    /// - Tag and default branch are carried over, the mirror is cleaned up
    #[tokio::test]
    async fn test_mirror_three_commits() {
        let fixture = Fixture::new();
        fixture.source.add_repository("svc-a", None);
        let commits = fixture
            .source
            .seed_commits("svc-a", "main", &["first", "second", "third"]);
        fixture.source.seed_tag("svc-a", "v1.0", "refs/heads/main");

        let ctx = fixture.context(|_| {});
        let outcomes = fixture.run(&ctx).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, ItemStatus::Migrated);
        assert_eq!(outcomes[0].detail.as_deref(), Some("2 refs pushed"));

        let target_path = fixture.target.git_path("svc-a").unwrap();
        assert_eq!(git::list_commits(&target_path).unwrap(), commits);
        let target_refs = git::list_local_refs(&target_path).unwrap();
        assert!(target_refs.contains_key("refs/tags/v1.0"));

        let target_repo = fixture.target.repository("svc-a").unwrap();
        assert_eq!(target_repo.default_branch.as_deref(), Some("refs/heads/main"));
        assert!(!fixture.work_dir.path().join("svc-a.git").exists());
    }

    /// # Disabled And Empty Repositories
    ///
    /// Tests the two repository kinds that are not pushed.
    ///
    /// ## Test Scenario
    /// - One disabled source repository, one without any commit
    ///
    /// ## Expected Outcome
    /// - The disabled one is skipped and not created
    /// - The empty one is created in the target without a push
    #[tokio::test]
    async fn test_disabled_and_empty_repositories() {
        let fixture = Fixture::new();
        fixture.source.add_repository("archived", None);
        fixture.source.disable_repository("archived");
        fixture.source.add_repository("empty", None);

        let ctx = fixture.context(|_| {});
        let outcomes = fixture.run(&ctx).await;

        let status_of = |name: &str| {
            outcomes
                .iter()
                .find(|o| o.item == name)
                .map(|o| o.status)
        };
        assert_eq!(status_of("archived"), Some(ItemStatus::Skipped));
        assert_eq!(status_of("empty"), Some(ItemStatus::Migrated));
        assert!(fixture.target.repository("archived").is_none());
        assert!(fixture.target.repository("empty").is_some());
    }

    /// # Repository Filter And Concurrency
    ///
    /// Tests `--repos` filtering with parallel migration.
    ///
    /// ## Test Scenario
    /// - Three source repositories, filter on two of them plus a missing name
    /// - Two repositories in flight
    ///
    /// ## Expected Outcome
    /// - Only the filtered repositories are migrated
    /// - The missing name is reported as failed
    #[tokio::test]
    async fn test_repository_filter_and_concurrency() {
        let fixture = Fixture::new();
        for name in ["svc-a", "svc-b", "svc-c"] {
            fixture.source.add_repository(name, None);
            fixture.source.seed_commits(name, "main", &["init"]);
        }

        let ctx = fixture.context(|config| {
            config.repos = Some(
                vec!["svc-a".to_string(), "SVC-C".to_string(), "ghost".to_string()].into(),
            );
            config.max_concurrent_repos = 2.into();
        });
        let outcomes = fixture.run(&ctx).await;

        assert_eq!(outcomes.len(), 3);
        assert!(fixture.target.repository("svc-a").is_some());
        assert!(fixture.target.repository("svc-b").is_none());
        assert!(fixture.target.repository("svc-c").is_some());
        let ghost = outcomes.iter().find(|o| o.item == "ghost").unwrap();
        assert_eq!(ghost.status, ItemStatus::Failed);
    }

    /// # Rerun Is Idempotent
    ///
    /// Tests migrating into a target that already has the repository.
    ///
    /// ## Test Scenario
    /// - Runs the phase twice, adding a commit in between
    ///
    /// ## Expected Outcome
    /// - No duplicate repository, the new commit reaches the target
    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let fixture = Fixture::new();
        fixture.source.add_repository("svc-a", None);
        fixture.source.seed_commits("svc-a", "main", &["first"]);

        let ctx = fixture.context(|_| {});
        fixture.run(&ctx).await;
        let commits = fixture.source.seed_commits("svc-a", "main", &["second"]);
        let outcomes = fixture.run(&ctx).await;

        assert_eq!(outcomes[0].status, ItemStatus::Migrated);
        assert_eq!(fixture.target.repositories().len(), 1);
        let target_path = fixture.target.git_path("svc-a").unwrap();
        assert_eq!(git::list_commits(&target_path).unwrap(), commits);
    }

    /// # Clone Failure Is Isolated
    ///
    /// Tests that one broken repository does not stop the others.
    ///
    /// ## Test Scenario
    /// - `broken` claims a default branch but its bare repository is gone
    ///
    /// ## Expected Outcome
    /// - `broken` fails, `svc-a` is still migrated
    #[tokio::test]
    async fn test_clone_failure_is_isolated() {
        let fixture = Fixture::new();
        fixture.source.add_repository("broken", Some("refs/heads/main"));
        std::fs::remove_dir_all(fixture.source.git_path("broken").unwrap()).unwrap();
        fixture.source.add_repository("svc-a", None);
        fixture.source.seed_commits("svc-a", "main", &["init"]);

        let ctx = fixture.context(|_| {});
        let outcomes = fixture.run(&ctx).await;

        let broken = outcomes.iter().find(|o| o.item == "broken").unwrap();
        assert_eq!(broken.status, ItemStatus::Failed);
        let svc_a = outcomes.iter().find(|o| o.item == "svc-a").unwrap();
        assert_eq!(svc_a.status, ItemStatus::Migrated);
    }

    /// # Mirror Directory Names
    ///
    /// Tests mapping repository names to directory names.
    ///
    /// ## Test Scenario
    /// - Plain name and names with separators
    ///
    /// ## Expected Outcome
    /// - Separators are replaced and `.git` is appended
    #[test]
    fn test_mirror_dir_name() {
        assert_eq!(mirror_dir_name("svc-a"), "svc-a.git");
        assert_eq!(mirror_dir_name("team/svc"), "team_svc.git");
        assert_eq!(mirror_dir_name("a\\b"), "a_b.git");
    }
}
