//! Per-job application driver.
//!
//! Iterates the job's strategy chain in order. Transport failures retry in
//! place with exponential backoff up to the policy budget; strategy-fatal
//! failures fall through to the next strategy; an obstacle pauses the job
//! for a human. One [`ApplicationAttempt`] is appended per try.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::applicant::ApplicantProfile;
use crate::error::{ApplyError, VagaError};
use crate::pipeline::{ApplicationAttempt, AttemptOutcome, Job, JobStatus, RetryPolicy};
use crate::store::Repository;
use crate::strategy::{ApplyStrategy, StrategyKind, build_chain};

/// Final outcome of one pass through the chain for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyVerdict {
    Applied {
        strategy: StrategyKind,
    },
    /// The job is paused in `awaiting_human`; resumption re-enters the
    /// chain at `strategy`.
    Paused {
        strategy: StrategyKind,
        reason: String,
    },
    Failed {
        attempts: u32,
    },
}

pub struct ApplyAgent {
    strategies: Vec<Arc<dyn ApplyStrategy>>,
    store: Arc<dyn Repository>,
    retry_policy: RetryPolicy,
    applicant: ApplicantProfile,
}

impl ApplyAgent {
    pub fn new(
        strategies: Vec<Arc<dyn ApplyStrategy>>,
        store: Arc<dyn Repository>,
        retry_policy: RetryPolicy,
        applicant: ApplicantProfile,
    ) -> Self {
        Self {
            strategies,
            store,
            retry_policy,
            applicant,
        }
    }

    /// Drive the job through its chain until success, pause, or exhaustion.
    ///
    /// A job paused earlier re-enters at the strategy that raised the
    /// obstacle, not at the head of the chain.
    pub async fn apply(&self, job: &mut Job) -> Result<ApplyVerdict, VagaError> {
        if !job.approved {
            return Err(VagaError::NotApproved(job.id.clone()));
        }

        let chain = build_chain(job, &self.strategies);
        let start = job
            .paused_strategy
            .and_then(|paused| chain.iter().position(|s| s.kind() == paused))
            .unwrap_or(0);

        let mut total_attempts = 0u32;

        for strategy in chain.iter().skip(start) {
            let kind = strategy.kind();
            let mut attempt_number = 0u32;

            loop {
                attempt_number += 1;
                total_attempts += 1;
                debug!(job = %job.id, strategy = %kind, attempt = attempt_number, "attempting submission");

                let result = strategy.attempt(job, &self.applicant).await;
                let (outcome, error) = match &result {
                    Ok(_) => (AttemptOutcome::Success, None),
                    Err(e) => (e.outcome(), Some(e.to_string())),
                };
                self.store
                    .append_attempt(&ApplicationAttempt::record(
                        job,
                        kind,
                        attempt_number,
                        outcome,
                        error,
                    ))
                    .await?;

                match result {
                    Ok(_) => {
                        job.paused_strategy = None;
                        job.pause_reason = None;
                        job.transition(JobStatus::Applied)?;
                        self.store.save_job(job).await?;
                        info!(job = %job.id, strategy = %kind, "application submitted");
                        return Ok(ApplyVerdict::Applied { strategy: kind });
                    }
                    Err(ApplyError::ObstacleDetected(reason)) => {
                        job.paused_strategy = Some(kind);
                        job.pause_reason = Some(reason.clone());
                        job.transition(JobStatus::AwaitingHuman)?;
                        self.store.save_job(job).await?;
                        info!(job = %job.id, strategy = %kind, reason = %reason, "job paused for human action");
                        return Ok(ApplyVerdict::Paused {
                            strategy: kind,
                            reason,
                        });
                    }
                    Err(ApplyError::Transport(reason)) => {
                        if attempt_number >= self.retry_policy.max_retries {
                            warn!(job = %job.id, strategy = %kind, "retries exhausted, falling through");
                            break;
                        }
                        let delay_ms = self.retry_policy.delay_for_attempt(attempt_number);
                        debug!(job = %job.id, strategy = %kind, reason = %reason, delay_ms, "retrying after backoff");
                        sleep(Duration::from_millis(delay_ms)).await;
                    }
                    Err(e) => {
                        // CapabilityUnsupported / StructuralMismatch: fatal
                        // for this strategy only.
                        debug!(job = %job.id, strategy = %kind, error = %e, "strategy failed, falling through");
                        break;
                    }
                }
            }
        }

        job.paused_strategy = None;
        job.pause_reason = None;
        job.transition(JobStatus::Failed)?;
        self.store.save_job(job).await?;
        warn!(
            job = %job.id,
            attempts = total_attempts,
            "{}",
            ApplyError::ExhaustedRetries {
                attempts: total_attempts
            }
        );
        Ok(ApplyVerdict::Failed {
            attempts: total_attempts,
        })
    }
}
