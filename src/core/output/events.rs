//! Progress events and summary types of a migration run.
//!
//! These are serializable for JSON/NDJSON output and renderable for text
//! output. Every migrated, skipped or failed entity produces exactly one
//! [`ItemOutcome`], carried by [`ProgressEvent::ItemComplete`].

use serde::{Deserialize, Serialize};

/// Migration phase an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Repositories,
    PullRequests,
    WorkItems,
    Relations,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Repositories,
        Phase::PullRequests,
        Phase::WorkItems,
        Phase::Relations,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Phase::Repositories => "Repositories",
            Phase::PullRequests => "Pull requests",
            Phase::WorkItems => "Work items",
            Phase::Relations => "Work item relations",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Repositories => "repositories",
            Phase::PullRequests => "pull_requests",
            Phase::WorkItems => "work_items",
            Phase::Relations => "relations",
        };
        write!(f, "{}", name)
    }
}

/// Progress events emitted during a migration run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Both projects were validated and the run is starting.
    Start {
        /// `org/project` of the source.
        source: String,
        /// `org/project` of the target.
        target: String,
        /// Phases that will run, in order.
        phases: Vec<Phase>,
    },

    /// A phase is starting.
    PhaseStart {
        phase: Phase,
        /// Number of top-level entities the phase will look at.
        total: usize,
    },

    /// One entity reached its final state.
    ItemComplete(ItemOutcome),

    /// A phase finished.
    PhaseComplete { phase: Phase, counts: SummaryCounts },

    /// Error that is not tied to a single entity.
    Error {
        /// Error message.
        message: String,
        /// Optional error code.
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

/// Final state of a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Created (or pushed) in the target.
    Migrated,
    /// Left alone, e.g. because an earlier run already migrated it.
    Skipped,
    /// Could not be migrated; the run continued.
    Failed,
    /// A relation whose other end has no counterpart in the target.
    Unresolved,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Migrated => write!(f, "migrated"),
            ItemStatus::Skipped => write!(f, "skipped"),
            ItemStatus::Failed => write!(f, "failed"),
            ItemStatus::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// What happened to one repository, pull request, work item or relation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemOutcome {
    pub phase: Phase,
    /// Human readable identifier, e.g. `svc-a` or `svc-a !42`.
    pub item: String,
    pub status: ItemStatus,
    /// Reason, error message or result detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ItemOutcome {
    pub fn new(
        phase: Phase,
        item: impl Into<String>,
        status: ItemStatus,
        detail: Option<String>,
    ) -> Self {
        Self {
            phase,
            item: item.into(),
            status,
            detail,
        }
    }

    pub fn migrated(phase: Phase, item: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(phase, item, ItemStatus::Migrated, Some(detail.into()))
    }

    pub fn skipped(phase: Phase, item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(phase, item, ItemStatus::Skipped, Some(reason.into()))
    }

    pub fn failed(phase: Phase, item: impl Into<String>, error: impl ToString) -> Self {
        Self::new(phase, item, ItemStatus::Failed, Some(error.to_string()))
    }

    pub fn unresolved(phase: Phase, item: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(phase, item, ItemStatus::Unresolved, Some(reason.into()))
    }
}

/// Per-phase counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryCounts {
    pub total: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub unresolved: usize,
}

impl SummaryCounts {
    /// Counts the outcomes of one phase.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a ItemOutcome>) -> Self {
        let mut counts = Self::default();
        for outcome in outcomes {
            counts.record(outcome.status);
        }
        counts
    }

    pub fn record(&mut self, status: ItemStatus) {
        self.total += 1;
        match status {
            ItemStatus::Migrated => self.migrated += 1,
            ItemStatus::Skipped => self.skipped += 1,
            ItemStatus::Failed => self.failed += 1,
            ItemStatus::Unresolved => self.unresolved += 1,
        }
    }
}

/// Overall result of the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummaryResult {
    /// Nothing failed and every relation resolved.
    Success,
    /// Some entities failed or relations stayed unresolved.
    PartialSuccess,
    /// Entities failed and none were migrated or skipped.
    Failed,
}

impl std::fmt::Display for SummaryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryResult::Success => write!(f, "success"),
            SummaryResult::PartialSuccess => write!(f, "partial_success"),
            SummaryResult::Failed => write!(f, "failed"),
        }
    }
}

/// Summary information for final output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryInfo {
    pub result: SummaryResult,
    pub source: String,
    pub target: String,
    /// Wall clock duration of the run in seconds.
    pub duration_seconds: i64,
    pub repositories: SummaryCounts,
    pub pull_requests: SummaryCounts,
    pub work_items: SummaryCounts,
    pub relations: SummaryCounts,
    /// Failed and unresolved entities, for follow-up.
    pub problems: Vec<ItemOutcome>,
    /// Set when a rejected PAT stopped the run before all phases ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl SummaryInfo {
    /// Counts of the given phase.
    pub fn counts(&self, phase: Phase) -> &SummaryCounts {
        match phase {
            Phase::Repositories => &self.repositories,
            Phase::PullRequests => &self.pull_requests,
            Phase::WorkItems => &self.work_items,
            Phase::Relations => &self.relations,
        }
    }
}
