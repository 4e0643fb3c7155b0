//! Runs the migration phases in order.
//!
//! Both projects are validated first; failing that is the only error
//! [`Orchestrator::run`] returns. After that every problem ends up in the
//! [`MigrationReport`]: per-entity failures as outcomes, a phase that could
//! not even start as a failed outcome named after the phase, and a PAT
//! rejected mid-run as [`MigrationReport::aborted`], which also skips the
//! remaining phases.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{error, info, warn};

use super::work_items::{self, IdMap};
use super::{MigrationContext, MigrationReport, pull_requests, repositories};
use crate::api::AdoApi;
use crate::core::output::{ItemOutcome, Phase, ProgressEvent, ProgressReporter};
use crate::error::{ApiError, MigratorError};
use crate::models::{MigrationConfig, ProjectInfo};

pub struct Orchestrator {
    ctx: MigrationContext,
}

/// Keeps a temporary work directory alive for the duration of a run.
enum WorkDir {
    Configured(PathBuf),
    Temporary(TempDir),
}

impl WorkDir {
    fn path(&self) -> &Path {
        match self {
            WorkDir::Configured(path) => path,
            WorkDir::Temporary(dir) => dir.path(),
        }
    }
}

impl Orchestrator {
    pub fn new(
        config: MigrationConfig,
        source: Arc<dyn AdoApi>,
        target: Arc<dyn AdoApi>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            ctx: MigrationContext::new(config, source, target, reporter),
        }
    }

    /// Phases this run executes, in order.
    pub fn phases(&self) -> Vec<Phase> {
        let config = &self.ctx.config;
        Phase::ALL
            .into_iter()
            .filter(|phase| match phase {
                Phase::Repositories => !config.skip_repos,
                Phase::PullRequests => !config.skip_pull_requests,
                Phase::WorkItems | Phase::Relations => *config.work_items.value(),
            })
            .collect()
    }

    /// Validates both projects and runs every enabled phase.
    pub async fn run(&self) -> Result<MigrationReport, MigratorError> {
        let source_project = self.validate(self.ctx.source.as_ref(), "source").await?;
        let target_project = self.validate(self.ctx.target.as_ref(), "target").await?;
        info!(
            source = %self.ctx.source.label(),
            source_project = %source_project.name,
            target = %self.ctx.target.label(),
            target_project = %target_project.name,
            "Both projects reachable"
        );

        let work_dir = self.prepare_work_dir()?;
        let mut report = MigrationReport::new(self.ctx.source.label(), self.ctx.target.label());
        let phases = self.phases();
        self.ctx.report(ProgressEvent::Start {
            source: report.source.clone(),
            target: report.target.clone(),
            phases: phases.clone(),
        });

        self.run_phases(&phases, &target_project, work_dir.path(), &mut report)
            .await;

        report.finish();
        info!(
            outcomes = report.outcomes.len(),
            failed = report.has_failures(),
            aborted = report.aborted.is_some(),
            "Migration finished"
        );
        Ok(report)
    }

    async fn validate(&self, api: &dyn AdoApi, side: &str) -> Result<ProjectInfo, MigratorError> {
        api.get_project().await.map_err(|e| {
            error!(side, project = %api.label(), error = %e, "Project validation failed");
            MigratorError::from(e)
        })
    }

    fn prepare_work_dir(&self) -> Result<WorkDir, MigratorError> {
        match &self.ctx.config.work_dir {
            Some(dir) => {
                let path = dir.value().clone();
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create work directory {}", path.display())
                })?;
                Ok(WorkDir::Configured(path))
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("ado-migrator-")
                    .tempdir()
                    .context("Failed to create temporary work directory")?;
                Ok(WorkDir::Temporary(dir))
            }
        }
    }

    async fn run_phases(
        &self,
        phases: &[Phase],
        target_project: &ProjectInfo,
        work_dir: &Path,
        report: &mut MigrationReport,
    ) {
        let ctx = &self.ctx;
        let mut source_items = Vec::new();
        let mut id_map = IdMap::new();
        let mut items_loaded = false;

        for &phase in phases {
            let result = match phase {
                Phase::Repositories => {
                    repositories::migrate_repositories(ctx, target_project, work_dir).await
                }
                Phase::PullRequests => {
                    pull_requests::migrate_pull_requests(ctx, target_project).await
                }
                Phase::WorkItems => match load_work_items(ctx, &mut id_map).await {
                    Ok(items) => {
                        source_items = items;
                        items_loaded = true;
                        work_items::migrate_work_items(ctx, &source_items, &mut id_map).await
                    }
                    Err(e) => Err(e),
                },
                Phase::Relations if !items_loaded => {
                    warn!("Work items could not be loaded, skipping relations");
                    continue;
                }
                Phase::Relations => {
                    work_items::migrate_relations(ctx, &source_items, &id_map).await
                }
            };

            if !self.record(report, phase, result) {
                break;
            }
        }
    }

    /// Adds a phase result to the report. Returns false when the run has to
    /// stop.
    fn record(
        &self,
        report: &mut MigrationReport,
        phase: Phase,
        result: Result<Vec<ItemOutcome>, ApiError>,
    ) -> bool {
        match result {
            Ok(outcomes) => {
                report.extend(outcomes);
                true
            }
            Err(ApiError::Unauthorized) => {
                let message = format!(
                    "{} phase stopped: a Personal Access Token was rejected",
                    phase.title()
                );
                error!(%phase, "{}", message);
                self.ctx.report(ProgressEvent::Error {
                    message: message.clone(),
                    code: Some("authentication_failed".to_string()),
                });
                report.aborted = Some(message);
                false
            }
            Err(e) => {
                error!(%phase, error = %e, "Phase failed");
                self.ctx.report(ProgressEvent::Error {
                    message: format!("{} phase failed: {}", phase.title(), e),
                    code: Some("phase_failed".to_string()),
                });
                report.extend([self
                    .ctx
                    .complete(ItemOutcome::failed(phase, phase.to_string(), e))]);
                true
            }
        }
    }
}

async fn load_work_items(
    ctx: &MigrationContext,
    id_map: &mut IdMap,
) -> Result<Vec<crate::models::WorkItem>, ApiError> {
    let items = work_items::load_source_items(ctx).await?;
    let known = work_items::prefill_id_map(ctx, id_map).await?;
    info!(selected = items.len(), known, "Loaded work items");
    Ok(items)
}
