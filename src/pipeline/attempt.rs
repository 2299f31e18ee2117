use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

use super::Job;

/// The result of one submission try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    FatalFailure,
    NeedsHuman,
}

/// One submission try for a job via one strategy.
///
/// Append-only audit trail: a record is written for every try and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAttempt {
    pub job_id: String,
    pub strategy: StrategyKind,
    /// 1-based try number within the current strategy invocation.
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl ApplicationAttempt {
    pub fn record(
        job: &Job,
        strategy: StrategyKind,
        attempt_number: u32,
        outcome: AttemptOutcome,
        error: Option<String>,
    ) -> Self {
        Self {
            job_id: job.id.clone(),
            strategy,
            attempt_number,
            outcome,
            error,
            attempted_at: Utc::now(),
        }
    }
}
