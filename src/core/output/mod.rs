//! Output system for migration runs.
//!
//! This module provides structured progress events and formatters for the
//! text, JSON and NDJSON output modes, plus the [`ProgressReporter`] seam
//! the migrators emit events through.

mod events;
mod format;

pub use events::{
    ItemOutcome, ItemStatus, Phase, ProgressEvent, SummaryCounts, SummaryInfo, SummaryResult,
};
pub use format::{NullReporter, OutputFormatter, OutputWriter, ProgressReporter};
