use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VagaError;

/// The seven states of a pipeline run.
///
/// A run flows through:
/// PENDING → SEARCHING → SCORING → CONTENT_GENERATING → APPLYING → COMPLETED,
/// and may reach FAILED from any non-terminal state on an unrecoverable
/// pipeline error. Transitions are sequential and single-pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Searching,
    Scoring,
    ContentGenerating,
    Applying,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// The single legal successor on the happy path, if any.
    fn successor(self) -> Option<RunStatus> {
        match self {
            RunStatus::Pending => Some(RunStatus::Searching),
            RunStatus::Searching => Some(RunStatus::Scoring),
            RunStatus::Scoring => Some(RunStatus::ContentGenerating),
            RunStatus::ContentGenerating => Some(RunStatus::Applying),
            RunStatus::Applying => Some(RunStatus::Completed),
            RunStatus::Completed | RunStatus::Failed => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "PENDING"),
            RunStatus::Searching => write!(f, "SEARCHING"),
            RunStatus::Scoring => write!(f, "SCORING"),
            RunStatus::ContentGenerating => write!(f, "CONTENT_GENERATING"),
            RunStatus::Applying => write!(f, "APPLYING"),
            RunStatus::Completed => write!(f, "COMPLETED"),
            RunStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Aggregate counters for one run. Monotonically non-decreasing while the
/// run is live; frozen with the run once it reaches a terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub found: u32,
    pub scored: u32,
    pub above_threshold: u32,
    pub applied: u32,
    pub failed: u32,
}

/// One pipeline execution. Owned exclusively by the orchestrator; workers
/// report outcomes back and never mutate the run directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub query: String,
    pub status: RunStatus,
    pub status_history: Vec<RunStatus>,
    pub counters: RunCounters,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            status: RunStatus::Pending,
            status_history: Vec::new(),
            counters: RunCounters::default(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Advance the run to `next`, recording the current status in history.
    ///
    /// Legal moves are the sequential happy path plus FAILED from any
    /// non-terminal state. Terminal runs are immutable.
    pub fn advance(&mut self, next: RunStatus) -> Result<(), VagaError> {
        let legal = !self.status.is_terminal()
            && (self.status.successor() == Some(next) || next == RunStatus::Failed);
        if !legal {
            return Err(VagaError::InvalidTransition {
                entity: "run",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        self.status_history.push(self.status);
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_all_states() {
        let mut run = Run::new("rust engineer");
        assert_eq!(run.status, RunStatus::Pending);

        for next in [
            RunStatus::Searching,
            RunStatus::Scoring,
            RunStatus::ContentGenerating,
            RunStatus::Applying,
            RunStatus::Completed,
        ] {
            run.advance(next).unwrap();
            assert_eq!(run.status, next);
        }

        assert!(run.completed_at.is_some());
        assert_eq!(
            run.status_history,
            vec![
                RunStatus::Pending,
                RunStatus::Searching,
                RunStatus::Scoring,
                RunStatus::ContentGenerating,
                RunStatus::Applying,
            ]
        );
    }

    #[test]
    fn failed_reachable_from_any_non_terminal_state() {
        let mut run = Run::new("x");
        run.advance(RunStatus::Searching).unwrap();
        run.advance(RunStatus::Failed).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn no_state_is_revisited() {
        let mut run = Run::new("x");
        run.advance(RunStatus::Searching).unwrap();
        run.advance(RunStatus::Scoring).unwrap();
        assert!(run.advance(RunStatus::Searching).is_err());
    }

    #[test]
    fn terminal_run_is_immutable() {
        let mut run = Run::new("x");
        run.advance(RunStatus::Failed).unwrap();
        assert!(run.advance(RunStatus::Searching).is_err());
        assert!(run.advance(RunStatus::Failed).is_err());
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut run = Run::new("x");
        assert!(run.advance(RunStatus::Applying).is_err());
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.status_history.is_empty());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&RunStatus::ContentGenerating).unwrap();
        assert_eq!(json, "\"content_generating\"");
        let back: RunStatus = serde_json::from_str("\"applying\"").unwrap();
        assert_eq!(back, RunStatus::Applying);
    }

    #[test]
    fn status_display() {
        assert_eq!(RunStatus::ContentGenerating.to_string(), "CONTENT_GENERATING");
        assert_eq!(RunStatus::Applying.to_string(), "APPLYING");
    }
}
