//! Output formatters for different output modes.
//!
//! This module provides formatters for text, JSON, and NDJSON output modes,
//! each implementing the `OutputFormatter` trait for consistent behavior.

use super::events::{ItemStatus, Phase, ProgressEvent, SummaryInfo, SummaryResult};
use crate::models::OutputFormat;
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Trait for formatting and writing output events.
pub trait OutputFormatter {
    /// Writes a progress event to the output.
    fn write_event(&mut self, event: &ProgressEvent) -> io::Result<()>;

    /// Writes a final summary.
    fn write_summary(&mut self, summary: &SummaryInfo) -> io::Result<()>;

    /// Flushes any buffered output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Receives progress events while the migration runs.
///
/// Migrators run concurrently, so reporters take `&self`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Reporter that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn report(&self, _event: &ProgressEvent) {}
}

impl<F: OutputFormatter + Send> ProgressReporter for Mutex<F> {
    fn report(&self, event: &ProgressEvent) {
        let mut formatter = self.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = formatter.write_event(event) {
            tracing::warn!("Failed to write progress event: {}", e);
        }
    }
}

/// Writer that formats output according to the specified format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    quiet: bool,
    events: Vec<ProgressEvent>,
}

impl<W: Write> OutputWriter<W> {
    /// Creates a new OutputWriter with the specified format.
    pub fn new(writer: W, format: OutputFormat, quiet: bool) -> Self {
        Self {
            writer,
            format,
            quiet,
            events: Vec::new(),
        }
    }

    /// Returns the output format.
    pub fn format(&self) -> &OutputFormat {
        &self.format
    }

    /// Returns whether quiet mode is enabled.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Returns the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consumes the writer and returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn writeln(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.writer, "{}", text)
    }

    fn status_symbol(status: ItemStatus) -> &'static str {
        match status {
            ItemStatus::Migrated => "✓",
            ItemStatus::Skipped => "⊘",
            ItemStatus::Failed => "✗",
            ItemStatus::Unresolved => "?",
        }
    }

    /// Events shown in quiet mode.
    fn is_problem(event: &ProgressEvent) -> bool {
        match event {
            ProgressEvent::ItemComplete(outcome) => {
                matches!(outcome.status, ItemStatus::Failed | ItemStatus::Unresolved)
            }
            ProgressEvent::Error { .. } => true,
            _ => false,
        }
    }
}

impl<W: Write> OutputFormatter for OutputWriter<W> {
    fn write_event(&mut self, event: &ProgressEvent) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                if !self.quiet || Self::is_problem(event) {
                    self.write_text_event(event)?;
                }
            }
            OutputFormat::Json => {
                // Buffer events for final summary
                self.events.push(event.clone());
            }
            OutputFormat::Ndjson => {
                let json = serde_json::to_string(event).map_err(io::Error::other)?;
                self.writeln(&json)?;
            }
        }
        Ok(())
    }

    fn write_summary(&mut self, summary: &SummaryInfo) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                self.writeln("")?;
                let result_line = match summary.result {
                    SummaryResult::Success => "SUCCESS",
                    SummaryResult::PartialSuccess => "PARTIAL SUCCESS",
                    SummaryResult::Failed => "FAILED",
                };
                self.writeln("═══════════════════════════════════════════════════════════")?;
                self.writeln(&format!("                    MIGRATION {}", result_line))?;
                self.writeln("═══════════════════════════════════════════════════════════")?;
                self.writeln("")?;
                self.writeln(&format!("Source:   {}", summary.source))?;
                self.writeln(&format!("Target:   {}", summary.target))?;
                self.writeln(&format!("Duration: {}s", summary.duration_seconds))?;
                if let Some(reason) = &summary.aborted {
                    self.writeln(&format!("Aborted:  {}", reason))?;
                }
                self.writeln("")?;
                self.writeln(&format!(
                    "  {:<22}{:>9}{:>9}{:>9}{:>11}",
                    "", "migrated", "skipped", "failed", "unresolved"
                ))?;
                for phase in Phase::ALL {
                    let counts = summary.counts(phase);
                    if counts.total == 0 {
                        continue;
                    }
                    self.writeln(&format!(
                        "  {:<22}{:>9}{:>9}{:>9}{:>11}",
                        phase.title(),
                        counts.migrated,
                        counts.skipped,
                        counts.failed,
                        counts.unresolved
                    ))?;
                }

                if !summary.problems.is_empty() {
                    self.writeln("")?;
                    self.writeln("Needs attention:")?;
                    for problem in &summary.problems {
                        self.writeln(&format!(
                            "  {} [{}] {}: {}",
                            Self::status_symbol(problem.status),
                            problem.phase,
                            problem.item,
                            problem.detail.as_deref().unwrap_or("")
                        ))?;
                    }
                }
                self.writeln("")?;
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "summary": summary,
                    "events": self.events
                });
                let json = serde_json::to_string_pretty(&output).map_err(io::Error::other)?;
                self.writeln(&json)?;
            }
            OutputFormat::Ndjson => {
                let output = serde_json::json!({ "event": "summary", "summary": summary });
                let json = serde_json::to_string(&output).map_err(io::Error::other)?;
                self.writeln(&json)?;
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<W: Write> OutputWriter<W> {
    /// Writes a text-formatted event.
    fn write_text_event(&mut self, event: &ProgressEvent) -> io::Result<()> {
        match event {
            ProgressEvent::Start {
                source,
                target,
                phases,
            } => {
                let phases: Vec<&str> = phases.iter().map(|p| p.title()).collect();
                self.writeln(&format!("Migrating {} → {}", source, target))?;
                self.writeln(&format!("Phases: {}", phases.join(", ")))?;
            }
            ProgressEvent::PhaseStart { phase, total } => {
                self.writeln("")?;
                self.writeln(&format!("{} ({})", phase.title(), total))?;
            }
            ProgressEvent::ItemComplete(outcome) => {
                let line = match &outcome.detail {
                    Some(detail) => format!(
                        "  {} {}: {}",
                        Self::status_symbol(outcome.status),
                        outcome.item,
                        detail
                    ),
                    None => format!("  {} {}", Self::status_symbol(outcome.status), outcome.item),
                };
                self.writeln(&line)?;
            }
            ProgressEvent::PhaseComplete { counts, .. } => {
                self.writeln(&format!(
                    "  {} migrated, {} skipped, {} failed",
                    counts.migrated, counts.skipped, counts.failed
                ))?;
            }
            ProgressEvent::Error { message, code } => match code {
                Some(code) => self.writeln(&format!("Error [{}]: {}", code, message))?,
                None => self.writeln(&format!("Error: {}", message))?,
            },
        }
        Ok(())
    }
}
