use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::LinesStream, StreamExt};

use crate::bridge::{MessageEvent, ResponseBridge, TurnOutcome};
use crate::utils::log_warn;

/// Tally of how the replayed turns ended
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub completed: usize,
    pub ignored: usize,
    pub errored: usize,
    /// Lines that were not valid events
    pub skipped: usize,
    /// Failed turns per error kind
    pub failures: BTreeMap<&'static str, usize>,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &TurnOutcome) {
        match outcome {
            TurnOutcome::Completed { .. } => self.completed += 1,
            TurnOutcome::Ignored(_) => self.ignored += 1,
            TurnOutcome::Errored { error, .. } => {
                self.errored += 1;
                *self.failures.entry(error.kind()).or_default() += 1;
            }
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.ignored + self.errored
    }

    fn failure_breakdown(&self) -> String {
        if self.failures.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self
            .failures
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        format!(" ({})", parts.join(", "))
    }

    /// One-line report for the terminal
    pub fn format(&self) -> String {
        format!(
            "{} turns: {} completed, {} ignored, {} failed{}{}",
            self.total(),
            self.completed.to_string().green(),
            self.ignored.to_string().yellow(),
            self.errored.to_string().red(),
            self.failure_breakdown(),
            if self.skipped > 0 {
                format!(" ({} invalid lines skipped)", self.skipped)
            } else {
                String::new()
            }
        )
    }
}

/// Parse one input line; blank lines yield `None`
pub fn parse_event_line(line: &str) -> Option<serde_json::Result<MessageEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Spawn a turn per event as soon as it is read, then wait for all of them
pub async fn replay_events<R>(bridge: Arc<ResponseBridge>, reader: R) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut handles = Vec::new();
    let mut lines = LinesStream::new(reader.lines());

    let mut line_no = 0;
    while let Some(line) = lines.next().await {
        line_no += 1;
        let line = line.context("Failed to read event input")?;
        match parse_event_line(&line) {
            None => {}
            Some(Ok(event)) => handles.push((event.post_id.clone(), bridge.spawn(event))),
            Some(Err(e)) => {
                log_warn(format!("line {}: not a message event: {}", line_no, e));
                summary.skipped += 1;
            }
        }
    }

    for (post_id, handle) in handles {
        let outcome = handle.await.context("Turn task panicked")?;
        println!("  {} {}", post_id.bold(), outcome);
        summary.record(&outcome);
    }

    Ok(summary)
}

/// Replay events from a file, or stdin when no path is given
pub async fn replay_from(bridge: Arc<ResponseBridge>, input: Option<&Path>) -> Result<ReplaySummary> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            replay_events(bridge, BufReader::new(file)).await
        }
        None => replay_events(bridge, BufReader::new(tokio::io::stdin())).await,
    }
}
