//! Run orchestrator: drives Search → Score → Generate Content → Apply
//! across a batch of jobs, single-pass per run.
//!
//! The run and its counters are mutated only here. Apply workers return
//! immutable verdicts through a `JoinSet`; the orchestrator folds them,
//! so concurrent completions never race on the counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::agent::{ApplyAgent, ApplyVerdict};
use crate::applicant::ApplicantProfile;
use crate::error::VagaError;
use crate::gateway::{ContentGateway, ScoringGateway};
use crate::pipeline::{Job, JobStatus, RetryPolicy, Run, RunStatus};
use crate::sources::{SearchQuery, SourceRegistry};
use crate::store::Repository;
use crate::strategy::ApplyStrategy;

/// Tunables for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub relevance_threshold: f32,
    pub retry_policy: RetryPolicy,
    /// Concurrent apply workers; one job and one browser session per
    /// worker at a time.
    pub workers: usize,
    /// Policy confirmation: treat every eligible job as approved.
    pub auto_approve: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            relevance_threshold: 40.0,
            retry_policy: RetryPolicy::default(),
            workers: 4,
            auto_approve: false,
        }
    }
}

/// What to do with a job paused in `awaiting_human`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    /// Re-enter the chain at the strategy that raised the obstacle.
    Retry,
    /// The applicant finished the submission manually.
    MarkApplied,
    /// Stop pursuing this job.
    Abandon,
}

pub struct RunOrchestrator {
    sources: Arc<SourceRegistry>,
    scoring: Arc<dyn ScoringGateway>,
    content: Arc<dyn ContentGateway>,
    strategies: Vec<Arc<dyn ApplyStrategy>>,
    store: Arc<dyn Repository>,
    applicant: ApplicantProfile,
    settings: RunSettings,
    cancelled: Arc<AtomicBool>,
}

impl RunOrchestrator {
    pub fn new(
        sources: Arc<SourceRegistry>,
        scoring: Arc<dyn ScoringGateway>,
        content: Arc<dyn ContentGateway>,
        strategies: Vec<Arc<dyn ApplyStrategy>>,
        store: Arc<dyn Repository>,
        applicant: ApplicantProfile,
        settings: RunSettings,
    ) -> Self {
        Self {
            sources,
            scoring,
            content,
            strategies,
            store,
            applicant,
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before each dispatch into the apply pool. Setting it
    /// stops new jobs from being dispatched; in-flight attempts finish or
    /// time out on their own.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Execute one full pipeline run. Per-job failures are isolated; the
    /// run only aborts to FAILED when every source is unreachable or the
    /// infrastructure itself (store, worker pool) breaks.
    pub async fn execute(&self, query: SearchQuery) -> Result<Run, VagaError> {
        let mut run = Run::new(&query.terms);
        self.store.save_run(&run).await?;
        info!(run = %run.id, query = %query.terms, "run created");

        // SEARCHING
        run.advance(RunStatus::Searching)?;
        self.store.save_run(&run).await?;
        let mut jobs = Vec::new();
        let mut reachable_sources = 0usize;
        for adapter in self.sources.iter() {
            match adapter.search(&query).await {
                Ok(postings) => {
                    reachable_sources += 1;
                    debug!(source = %adapter.id(), found = postings.len(), "source search complete");
                    for posting in postings {
                        let application_type = adapter.application_type_for(&posting);
                        jobs.push(Job::from_posting(
                            &run.id,
                            adapter.id(),
                            application_type,
                            posting,
                        ));
                    }
                }
                Err(e) => {
                    warn!(source = %adapter.id(), error = %e, "source unreachable, skipping");
                }
            }
        }

        if reachable_sources == 0 {
            error!(run = %run.id, "every configured source failed; aborting run");
            run.advance(RunStatus::Failed)?;
            self.store.save_run(&run).await?;
            return Ok(run);
        }

        run.counters.found = jobs.len() as u32;
        for job in &jobs {
            self.store.save_job(job).await?;
        }
        info!(run = %run.id, found = run.counters.found, "search stage complete");

        // SCORING
        run.advance(RunStatus::Scoring)?;
        self.store.save_run(&run).await?;
        for job in &mut jobs {
            match self.scoring.score(job).await {
                Ok(report) => {
                    job.relevance_score = Some(report.relevance_score);
                    job.scoring_breakdown = report.breakdown;
                    job.transition(JobStatus::Scored)?;
                    run.counters.scored += 1;
                    if report.relevance_score >= self.settings.relevance_threshold {
                        job.transition(JobStatus::Eligible)?;
                        run.counters.above_threshold += 1;
                    } else {
                        // Below threshold: frozen, but retained for audit.
                        job.transition(JobStatus::Skipped)?;
                    }
                }
                Err(e) => {
                    warn!(job = %job.id, error = %e, "scoring failed for job");
                    job.transition(JobStatus::Skipped)?;
                }
            }
            self.store.save_job(job).await?;
        }
        info!(
            run = %run.id,
            scored = run.counters.scored,
            eligible = run.counters.above_threshold,
            "scoring stage complete"
        );

        // CONTENT_GENERATING
        run.advance(RunStatus::ContentGenerating)?;
        self.store.save_run(&run).await?;
        for job in &mut jobs {
            if job.status != JobStatus::Eligible {
                continue;
            }
            if self.settings.auto_approve {
                job.approved = true;
            }
            if !job.approved {
                debug!(job = %job.id, "eligible job awaiting approval; leaving for later");
                self.store.save_job(job).await?;
                continue;
            }
            match self.content.generate(job).await {
                Ok(content) => {
                    job.content = Some(content);
                    job.transition(JobStatus::ContentReady)?;
                }
                Err(e) => {
                    // Per-job and non-fatal: excluded from the apply stage.
                    warn!(job = %job.id, error = %e, "content generation failed for job");
                    job.transition(JobStatus::Skipped)?;
                }
            }
            self.store.save_job(job).await?;
        }

        // APPLYING
        run.advance(RunStatus::Applying)?;
        self.store.save_run(&run).await?;
        let ready: Vec<Job> = jobs
            .iter()
            .filter(|job| job.status == JobStatus::ContentReady)
            .cloned()
            .collect();

        let agent = Arc::new(ApplyAgent::new(
            self.strategies.clone(),
            self.store.clone(),
            self.settings.retry_policy.clone(),
            self.applicant.clone(),
        ));
        let semaphore = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut pool: JoinSet<(Job, Result<ApplyVerdict, VagaError>)> = JoinSet::new();

        let mut cancelled_jobs = 0u32;
        for mut job in ready {
            if self.cancelled.load(Ordering::SeqCst) {
                info!(job = %job.id, "cancellation requested; job not dispatched");
                job.transition(JobStatus::Skipped)?;
                self.store.save_job(&job).await?;
                cancelled_jobs += 1;
                continue;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("apply pool semaphore closed");
            let agent = agent.clone();
            pool.spawn(async move {
                let _permit = permit;
                let verdict = agent.apply(&mut job).await;
                (job, verdict)
            });
        }
        if cancelled_jobs > 0 {
            warn!(run = %run.id, skipped = cancelled_jobs, "run cancelled before full dispatch");
        }

        // Single-writer fold: verdicts arrive as immutable messages and
        // only this loop touches the counters.
        let mut infrastructure_failed = false;
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok((job, Ok(verdict))) => match verdict {
                    ApplyVerdict::Applied { strategy } => {
                        debug!(job = %job.id, strategy = %strategy, "worker reported applied");
                        run.counters.applied += 1;
                    }
                    ApplyVerdict::Failed { attempts } => {
                        debug!(job = %job.id, attempts, "worker reported failed");
                        run.counters.failed += 1;
                    }
                    ApplyVerdict::Paused { reason, .. } => {
                        // Counts for neither; never blocks run completion.
                        info!(job = %job.id, reason = %reason, "job awaiting human action");
                    }
                },
                Ok((job, Err(e))) => {
                    error!(job = %job.id, error = %e, "apply agent infrastructure error");
                    infrastructure_failed = true;
                }
                Err(e) => {
                    error!(error = %e, "apply worker panicked");
                    infrastructure_failed = true;
                }
            }
            self.store.save_run(&run).await?;
        }

        if infrastructure_failed {
            run.advance(RunStatus::Failed)?;
        } else {
            run.advance(RunStatus::Completed)?;
        }
        self.store.save_run(&run).await?;
        info!(
            run = %run.id,
            status = %run.status,
            applied = run.counters.applied,
            failed = run.counters.failed,
            "run finished"
        );
        Ok(run)
    }

    /// Act on a job paused in `awaiting_human`.
    pub async fn resume_job(
        &self,
        job_id: &str,
        action: ResumeAction,
    ) -> Result<(Job, Option<ApplyVerdict>), VagaError> {
        let mut job = self
            .store
            .load_job(job_id)
            .await?
            .ok_or_else(|| VagaError::JobNotFound(job_id.to_string()))?;
        if job.status != JobStatus::AwaitingHuman {
            return Err(VagaError::NotAwaitingHuman(job_id.to_string()));
        }

        match action {
            ResumeAction::Retry => {
                let agent = ApplyAgent::new(
                    self.strategies.clone(),
                    self.store.clone(),
                    self.settings.retry_policy.clone(),
                    self.applicant.clone(),
                );
                let verdict = agent.apply(&mut job).await?;
                Ok((job, Some(verdict)))
            }
            ResumeAction::MarkApplied => {
                job.paused_strategy = None;
                job.pause_reason = None;
                job.transition(JobStatus::Applied)?;
                self.store.save_job(&job).await?;
                info!(job = %job.id, "job marked applied after manual submission");
                Ok((job, None))
            }
            ResumeAction::Abandon => {
                job.transition(JobStatus::Skipped)?;
                self.store.save_job(&job).await?;
                info!(job = %job.id, "paused job abandoned");
                Ok((job, None))
            }
        }
    }
}
