//! Aggregated result of a migration run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::output::{
    ItemOutcome, ItemStatus, Phase, SummaryCounts, SummaryInfo, SummaryResult,
};

/// Every per-entity outcome of a run, in the order they were produced.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub source: String,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<ItemOutcome>,
    /// Set when a rejected PAT stopped the run before all phases ran.
    pub aborted: Option<String>,
}

impl MigrationReport {
    pub fn new(source: String, target: String) -> Self {
        Self {
            source,
            target,
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
            aborted: None,
        }
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = ItemOutcome>) {
        self.outcomes.extend(outcomes);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Outcomes of one phase.
    pub fn phase(&self, phase: Phase) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(move |o| o.phase == phase)
    }

    /// Looks up the outcome for an item of a phase.
    pub fn outcome(&self, phase: Phase, item: &str) -> Option<&ItemOutcome> {
        self.phase(phase).find(|o| o.item == item)
    }

    pub fn counts(&self, phase: Phase) -> SummaryCounts {
        SummaryCounts::from_outcomes(self.phase(phase))
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == ItemStatus::Failed)
    }

    pub fn summary(&self) -> SummaryInfo {
        let problems: Vec<ItemOutcome> = self
            .outcomes
            .iter()
            .filter(|o| matches!(o.status, ItemStatus::Failed | ItemStatus::Unresolved))
            .cloned()
            .collect();
        let succeeded = self
            .outcomes
            .iter()
            .any(|o| matches!(o.status, ItemStatus::Migrated | ItemStatus::Skipped));

        let result = if problems.is_empty() && self.aborted.is_none() {
            SummaryResult::Success
        } else if self.has_failures() && !succeeded {
            SummaryResult::Failed
        } else {
            SummaryResult::PartialSuccess
        };

        let finished_at = self.finished_at.unwrap_or_else(Utc::now);
        SummaryInfo {
            result,
            source: self.source.clone(),
            target: self.target.clone(),
            duration_seconds: (finished_at - self.started_at).num_seconds(),
            repositories: self.counts(Phase::Repositories),
            pull_requests: self.counts(Phase::PullRequests),
            work_items: self.counts(Phase::WorkItems),
            relations: self.counts(Phase::Relations),
            problems,
            aborted: self.aborted.clone(),
        }
    }
}
