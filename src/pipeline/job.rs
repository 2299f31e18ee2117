use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::VagaError;
use crate::sources::{RawPosting, SourceId};
use crate::strategy::StrategyKind;

/// How a posting expects to be applied to. Determines the *entry point* of
/// the strategy chain; the chain may fall through to less automated
/// strategies but never escalates to a more automated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    StructuredApi,
    EasyApply,
    ExternalAssisted,
}

/// Lifecycle status of a job within its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Discovered,
    Scored,
    Eligible,
    ContentReady,
    AwaitingHuman,
    Applied,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Applied | JobStatus::Failed | JobStatus::Skipped)
    }

    /// Whether moving to `next` follows the pipeline's single-pass ordering.
    ///
    /// Jobs are mutated by exactly one stage at a time: discovery → scoring →
    /// eligibility → content → application. `awaiting_human` may re-enter the
    /// apply stage any number of times (each resumption may pause again).
    fn allows(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Discovered, Scored)
                | (Discovered, Skipped)
                | (Scored, Eligible)
                | (Scored, Skipped)
                | (Eligible, ContentReady)
                | (Eligible, Skipped)
                | (ContentReady, Applied)
                | (ContentReady, Failed)
                | (ContentReady, AwaitingHuman)
                | (ContentReady, Skipped)
                | (AwaitingHuman, Applied)
                | (AwaitingHuman, Failed)
                | (AwaitingHuman, AwaitingHuman)
                | (AwaitingHuman, Skipped)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Discovered => write!(f, "discovered"),
            JobStatus::Scored => write!(f, "scored"),
            JobStatus::Eligible => write!(f, "eligible"),
            JobStatus::ContentReady => write!(f, "content_ready"),
            JobStatus::AwaitingHuman => write!(f, "awaiting_human"),
            JobStatus::Applied => write!(f, "applied"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Tailored application content produced by the content gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub summary: String,
    pub resume_points: Vec<String>,
    pub cover_letter: String,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

/// Retry behavior for one strategy within the apply agent.
///
/// Delays grow exponentially per retry and are capped. Tests inject a
/// zero-delay policy instead of hardcoding timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts per strategy before its retries count as exhausted.
    pub max_retries: u32,
    /// Base delay in milliseconds before the first retry.
    pub base_delay_ms: u64,
    /// Multiplier applied to the delay on every subsequent retry.
    pub multiplier: u32,
    /// Upper bound on a single backoff delay.
    pub cap_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            multiplier: 2,
            cap_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after the given failed attempt (1-based):
    /// `min(cap, base * multiplier^(attempt - 1))`.
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        self.base_delay_ms.saturating_mul(factor).min(self.cap_ms)
    }

    /// Policy with no delays, for tests and offline demo runs.
    pub fn zero_delay(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            multiplier: 1,
            cap_ms: 0,
        }
    }
}

/// One job posting discovered during a run.
///
/// Created by source search, then mutated by the scoring, content and
/// application stages in that order. Never deleted, only
/// status-transitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub run_id: String,
    pub source: SourceId,
    /// Identifier of the posting on the source's side.
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    pub application_type: ApplicationType,
    pub relevance_score: Option<f32>,
    #[serde(default)]
    pub scoring_breakdown: BTreeMap<String, f32>,
    /// Requires human or policy confirmation before the apply stage.
    pub approved: bool,
    pub content: Option<GeneratedContent>,
    pub status: JobStatus,
    /// Strategy that raised NEEDS_HUMAN; resumption re-enters the chain
    /// here instead of at the first strategy.
    pub paused_strategy: Option<StrategyKind>,
    pub pause_reason: Option<String>,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn from_posting(
        run_id: &str,
        source: SourceId,
        application_type: ApplicationType,
        posting: RawPosting,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            source,
            external_id: posting.external_id,
            title: posting.title,
            company: posting.company,
            location: posting.location,
            description: posting.description,
            url: posting.url,
            application_type,
            relevance_score: None,
            scoring_breakdown: BTreeMap::new(),
            approved: false,
            content: None,
            status: JobStatus::Discovered,
            paused_strategy: None,
            pause_reason: None,
            discovered_at: now,
            updated_at: now,
        }
    }

    /// Move the job to `next`, rejecting transitions outside the pipeline's
    /// single-pass ordering.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), VagaError> {
        if !self.status.allows(next) {
            return Err(VagaError::InvalidTransition {
                entity: "job",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting() -> RawPosting {
        RawPosting {
            external_id: "bw-42".into(),
            title: "Senior Rust Engineer".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            description: "Build backend services in Rust.".into(),
            url: "https://jobs.example.com/bw-42".into(),
            easy_apply: true,
        }
    }

    fn job() -> Job {
        Job::from_posting("run-1", SourceId::Boardwire, ApplicationType::StructuredApi, posting())
    }

    #[test]
    fn job_creation_defaults() {
        let job = job();
        assert_eq!(job.status, JobStatus::Discovered);
        assert_eq!(job.relevance_score, None);
        assert!(!job.approved);
        assert!(job.content.is_none());
        assert!(job.paused_strategy.is_none());
        assert_eq!(job.external_id, "bw-42");
    }

    #[test]
    fn allowed_sequence_applies() {
        let mut job = job();
        job.transition(JobStatus::Scored).unwrap();
        job.transition(JobStatus::Eligible).unwrap();
        job.transition(JobStatus::ContentReady).unwrap();
        job.transition(JobStatus::Applied).unwrap();
        assert!(job.status.is_terminal());
    }

    #[test]
    fn no_apply_before_content_generation() {
        let mut job = job();
        job.transition(JobStatus::Scored).unwrap();
        job.transition(JobStatus::Eligible).unwrap();
        assert!(job.transition(JobStatus::Applied).is_err());
    }

    #[test]
    fn no_scoring_before_discovery_statuses() {
        let mut job = job();
        job.transition(JobStatus::Scored).unwrap();
        // Scoring is single-pass: a scored job cannot be re-scored.
        assert!(job.transition(JobStatus::Scored).is_err());
    }

    #[test]
    fn paused_job_can_pause_again_on_resumption() {
        let mut job = job();
        job.transition(JobStatus::Scored).unwrap();
        job.transition(JobStatus::Eligible).unwrap();
        job.transition(JobStatus::ContentReady).unwrap();
        job.transition(JobStatus::AwaitingHuman).unwrap();
        job.transition(JobStatus::AwaitingHuman).unwrap();
        job.transition(JobStatus::Applied).unwrap();
    }

    #[test]
    fn terminal_statuses_are_frozen() {
        let mut job = job();
        job.transition(JobStatus::Skipped).unwrap();
        assert!(job.transition(JobStatus::Scored).is_err());
        assert!(job.transition(JobStatus::Applied).is_err());
    }

    #[test]
    fn retry_policy_exponential_backoff_with_cap() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 1000,
            multiplier: 2,
            cap_ms: 5000,
        };
        assert_eq!(policy.delay_for_attempt(1), 1000);
        assert_eq!(policy.delay_for_attempt(2), 2000);
        assert_eq!(policy.delay_for_attempt(3), 4000);
        assert_eq!(policy.delay_for_attempt(4), 5000); // capped
        assert_eq!(policy.delay_for_attempt(5), 5000);
    }

    #[test]
    fn zero_delay_policy_for_tests() {
        let policy = RetryPolicy::zero_delay(3);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for_attempt(1), 0);
        assert_eq!(policy.delay_for_attempt(7), 0);
    }

    #[test]
    fn job_serialization_roundtrip() {
        let mut job = job();
        job.relevance_score = Some(72.5);
        job.scoring_breakdown.insert("skill:rust".into(), 25.0);
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.status, JobStatus::Discovered);
        assert_eq!(back.relevance_score, Some(72.5));
        assert!(json.contains("\"structured_api\""));
        assert!(json.contains("\"discovered\""));
    }
}
