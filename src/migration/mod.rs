//! Migration phases and the orchestrator that sequences them.
//!
//! Each phase works through a shared [`MigrationContext`] and produces one
//! [`ItemOutcome`] per entity. Per-entity failures are recorded and the
//! phase moves on; only a rejected PAT stops a phase early.

pub mod marker;
pub mod orchestrator;
pub mod pull_requests;
pub mod report;
pub mod repositories;
pub mod work_items;

use std::sync::Arc;

use crate::api::AdoApi;
use crate::core::output::{ItemOutcome, Phase, ProgressEvent, ProgressReporter};
use crate::error::ApiError;
use crate::git::GitAuth;
use crate::models::{MigrationConfig, Repository};

pub use orchestrator::Orchestrator;
pub use report::MigrationReport;
pub use work_items::IdMap;

/// Everything a phase needs: both projects, the run configuration, git
/// credentials and the progress sink.
pub struct MigrationContext {
    pub config: MigrationConfig,
    pub source: Arc<dyn AdoApi>,
    pub target: Arc<dyn AdoApi>,
    pub source_git: GitAuth,
    pub target_git: GitAuth,
    reporter: Arc<dyn ProgressReporter>,
}

impl MigrationContext {
    pub fn new(
        config: MigrationConfig,
        source: Arc<dyn AdoApi>,
        target: Arc<dyn AdoApi>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        let source_git = GitAuth::from_pat(&config.source.pat);
        let target_git = GitAuth::from_pat(&config.target.pat);
        Self {
            config,
            source,
            target,
            source_git,
            target_git,
            reporter,
        }
    }

    pub fn report(&self, event: ProgressEvent) {
        self.reporter.report(&event);
    }

    /// Emits the outcome as a progress event and hands it back.
    pub fn complete(&self, outcome: ItemOutcome) -> ItemOutcome {
        self.reporter
            .report(&ProgressEvent::ItemComplete(outcome.clone()));
        outcome
    }

    /// Provenance tag naming this run's source project.
    pub fn source_project_tag(&self) -> String {
        marker::project_tag(
            self.config.source.organization.value(),
            self.config.source.project.value(),
        )
    }

    /// Source repositories passing the `--repos` filter, sorted by name.
    pub async fn source_repositories(&self) -> Result<Vec<Repository>, ApiError> {
        let mut repositories: Vec<Repository> = self
            .source
            .list_repositories()
            .await?
            .into_iter()
            .filter(|r| self.config.includes_repository(&r.name))
            .collect();
        repositories.sort_by_key(|r| r.name.to_lowercase());
        Ok(repositories)
    }

    /// Names given in `--repos` that do not exist in the source.
    pub fn missing_requested(&self, found: &[Repository]) -> Vec<String> {
        let Some(requested) = &self.config.repos else {
            return Vec::new();
        };
        requested
            .iter()
            .filter(|name| !found.iter().any(|r| r.name.eq_ignore_ascii_case(name)))
            .cloned()
            .collect()
    }
}

/// Turns a per-entity API error into a failed outcome.
///
/// A rejected PAT (401) is returned as the error instead: it would fail
/// every following call too, so the phase stops.
pub(crate) fn item_failure(
    phase: Phase,
    item: impl Into<String>,
    error: ApiError,
) -> Result<ItemOutcome, ApiError> {
    if matches!(error, ApiError::Unauthorized) {
        return Err(error);
    }
    Ok(ItemOutcome::failed(phase, item, error))
}

/// Looks up a target repository by name and creates it when missing.
///
/// A 409 on create means someone else created it in the meantime, so the
/// repository is read again instead of failing.
pub async fn ensure_target_repository(
    target: &dyn AdoApi,
    project_id: &str,
    name: &str,
) -> Result<(Repository, bool), ApiError> {
    if let Some(existing) = target.get_repository(name).await? {
        return Ok((existing, false));
    }

    match target.create_repository(project_id, name).await {
        Ok(created) => {
            tracing::info!(repository = name, "Created target repository");
            Ok((created, true))
        }
        Err(e) if e.is_conflict() => {
            tracing::debug!(repository = name, "Repository created concurrently, re-reading");
            target
                .get_repository(name)
                .await?
                .map(|r| (r, false))
                .ok_or(e)
        }
        Err(e) => Err(e),
    }
}
