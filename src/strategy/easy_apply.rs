use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::applicant::ApplicantProfile;
use crate::browser::{BrowserDriver, BrowserError};
use crate::error::ApplyError;
use crate::pipeline::Job;
use crate::sources::SourceRegistry;

use super::{ApplyStrategy, StrategyKind, Submission, value_for};

/// Drives the source's in-page quick-apply form through the browser
/// facility: detect fields, fill from applicant data and generated
/// answers, submit.
pub struct EasyApplyStrategy {
    browser: Arc<dyn BrowserDriver>,
    sources: Arc<SourceRegistry>,
}

impl EasyApplyStrategy {
    pub fn new(browser: Arc<dyn BrowserDriver>, sources: Arc<SourceRegistry>) -> Self {
        Self { browser, sources }
    }
}

fn transport(err: BrowserError) -> ApplyError {
    // Rendering, navigation and timeout faults are transient from the
    // chain's point of view; the agent retries them with backoff.
    ApplyError::Transport(err.to_string())
}

#[async_trait]
impl ApplyStrategy for EasyApplyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EasyApply
    }

    fn supports(&self, job: &Job) -> bool {
        self.sources
            .get(job.source)
            .is_some_and(|adapter| adapter.supports_easy_apply())
    }

    async fn attempt(
        &self,
        job: &Job,
        applicant: &ApplicantProfile,
    ) -> Result<Submission, ApplyError> {
        debug!(job = %job.id, url = %job.url, "opening quick-apply form");
        let session = self.browser.open(&job.url).await.map_err(transport)?;

        let fields = self
            .browser
            .detect_fields(&session)
            .await
            .map_err(transport)?;

        if fields.is_empty() {
            let _ = self.browser.close(&session).await;
            return Err(ApplyError::StructuralMismatch(
                "no fillable fields detected on the apply page".into(),
            ));
        }

        for field in &fields {
            match value_for(job, applicant, field) {
                Some(value) => {
                    self.browser
                        .fill(&session, field, &value)
                        .await
                        .map_err(transport)?;
                }
                None if field.required => {
                    let _ = self.browser.close(&session).await;
                    return Err(ApplyError::StructuralMismatch(format!(
                        "no value for required field '{}'",
                        field.name
                    )));
                }
                None => {
                    debug!(job = %job.id, field = %field.name, "skipping optional field with no value");
                }
            }
        }

        let outcome = self.browser.submit(&session).await.map_err(transport)?;
        let _ = self.browser.close(&session).await;

        if outcome.challenge_detected {
            warn!(job = %job.id, "bot challenge detected on submission");
            return Err(ApplyError::ObstacleDetected(
                "bot challenge presented on the apply page".into(),
            ));
        }
        if !outcome.ok {
            return Err(ApplyError::Transport(
                "page did not confirm the submission".into(),
            ));
        }

        info!(job = %job.id, "quick-apply submission confirmed");
        Ok(Submission::default())
    }
}
