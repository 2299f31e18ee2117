use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::applicant::ApplicantProfile;
use crate::error::ApplyError;
use crate::pipeline::Job;
use crate::sources::{ApplicationPayload, SourceError, SourceRegistry};

use super::{ApplyStrategy, StrategyKind, Submission};

/// Submits through the source's structured application API.
pub struct StructuredApiStrategy {
    sources: Arc<SourceRegistry>,
}

impl StructuredApiStrategy {
    pub fn new(sources: Arc<SourceRegistry>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl ApplyStrategy for StructuredApiStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StructuredApi
    }

    fn supports(&self, job: &Job) -> bool {
        self.sources
            .get(job.source)
            .is_some_and(|adapter| adapter.supports_application_api())
    }

    async fn attempt(
        &self,
        job: &Job,
        applicant: &ApplicantProfile,
    ) -> Result<Submission, ApplyError> {
        let adapter = self.sources.get(job.source).ok_or_else(|| {
            ApplyError::CapabilityUnsupported(format!("no adapter registered for {}", job.source))
        })?;

        // A job may carry a declared type its source cannot actually honor;
        // that is fatal for this strategy, not for the job.
        if !adapter.supports_application_api() {
            return Err(ApplyError::CapabilityUnsupported(format!(
                "{} declares no application API",
                job.source
            )));
        }

        let payload = ApplicationPayload::assemble(job, applicant);
        debug!(job = %job.id, source = %job.source, "submitting via structured API");

        match adapter.submit_application(job, &payload).await {
            Ok(receipt) => {
                info!(job = %job.id, confirmation = ?receipt.confirmation_id, "API submission accepted");
                Ok(Submission {
                    confirmation_id: receipt.confirmation_id,
                })
            }
            Err(SourceError::RateLimited { retry_after_ms }) => Err(ApplyError::Transport(
                format!("rate limited, retry after {retry_after_ms}ms"),
            )),
            Err(SourceError::Network(e)) => Err(ApplyError::Transport(e.to_string())),
            Err(SourceError::CapabilityUnsupported { source_id }) => Err(
                ApplyError::CapabilityUnsupported(format!("{source_id} does not support API submission")),
            ),
            Err(SourceError::Api { status, message }) => Err(ApplyError::StructuralMismatch(
                format!("submission rejected (status {status}): {message}"),
            )),
            Err(SourceError::Parse(msg)) => Err(ApplyError::StructuralMismatch(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ApplicationType;
    use crate::sources::{
        JobSourceAdapter, RawPosting, SearchQuery, SourceId, SubmissionReceipt,
    };

    struct FakeBoard {
        api: bool,
        result: fn() -> Result<SubmissionReceipt, SourceError>,
    }

    #[async_trait]
    impl JobSourceAdapter for FakeBoard {
        fn id(&self) -> SourceId {
            SourceId::Boardwire
        }

        fn supports_application_api(&self) -> bool {
            self.api
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<RawPosting>, SourceError> {
            Ok(Vec::new())
        }

        async fn submit_application(
            &self,
            _job: &Job,
            _payload: &ApplicationPayload,
        ) -> Result<SubmissionReceipt, SourceError> {
            (self.result)()
        }
    }

    fn job() -> Job {
        Job::from_posting(
            "run-1",
            SourceId::Boardwire,
            ApplicationType::StructuredApi,
            RawPosting {
                external_id: "bw-1".into(),
                title: "Rust Engineer".into(),
                company: "Acme".into(),
                location: String::new(),
                description: String::new(),
                url: "https://example.com/bw-1".into(),
                easy_apply: true,
            },
        )
    }

    fn strategy(api: bool, result: fn() -> Result<SubmissionReceipt, SourceError>) -> StructuredApiStrategy {
        let registry = Arc::new(SourceRegistry::new(vec![Arc::new(FakeBoard { api, result })]));
        StructuredApiStrategy::new(registry)
    }

    #[tokio::test]
    async fn successful_submission_carries_confirmation() {
        let strategy = strategy(true, || {
            Ok(SubmissionReceipt {
                confirmation_id: Some("conf-9".into()),
            })
        });
        let submission = strategy
            .attempt(&job(), &ApplicantProfile::sample())
            .await
            .unwrap();
        assert_eq!(submission.confirmation_id.as_deref(), Some("conf-9"));
    }

    #[tokio::test]
    async fn missing_capability_is_fatal_for_this_strategy() {
        // Declared STRUCTURED_API on a source without the capability.
        let strategy = strategy(false, || {
            Ok(SubmissionReceipt {
                confirmation_id: None,
            })
        });
        let err = strategy
            .attempt(&job(), &ApplicantProfile::sample())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::CapabilityUnsupported(_)));
        assert!(!strategy.supports(&job()));
    }

    #[tokio::test]
    async fn api_rejection_is_strategy_fatal_not_retryable() {
        let strategy = strategy(true, || {
            Err(SourceError::Api {
                status: 422,
                message: "answers missing".into(),
            })
        });
        let err = strategy
            .attempt(&job(), &ApplicantProfile::sample())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::StructuralMismatch(_)));
    }

    #[tokio::test]
    async fn rate_limit_is_retryable_transport() {
        let strategy = strategy(true, || {
            Err(SourceError::RateLimited {
                retry_after_ms: 2000,
            })
        });
        let err = strategy
            .attempt(&job(), &ApplicantProfile::sample())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Transport(_)));
    }
}
