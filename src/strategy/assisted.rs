use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::applicant::ApplicantProfile;
use crate::browser::BrowserDriver;
use crate::error::ApplyError;
use crate::pipeline::Job;

use super::{ApplyStrategy, StrategyKind, Submission, value_for};

/// Prefills what it can on the external page, then hands the job to the
/// applicant. Submission is never automatic here; the strategy exists to
/// shorten manual completion, not to replace it.
pub struct AssistedStrategy {
    browser: Arc<dyn BrowserDriver>,
}

impl AssistedStrategy {
    pub fn new(browser: Arc<dyn BrowserDriver>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl ApplyStrategy for AssistedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Assisted
    }

    fn supports(&self, _job: &Job) -> bool {
        // Handing off to a human needs nothing from the source.
        true
    }

    async fn attempt(
        &self,
        job: &Job,
        applicant: &ApplicantProfile,
    ) -> Result<Submission, ApplyError> {
        // Prefill is best effort; any browser failure still ends in the
        // human handoff. The session is left open for the applicant.
        let mut prefilled = 0;
        match self.browser.open(&job.url).await {
            Ok(session) => {
                if let Ok(fields) = self.browser.detect_fields(&session).await {
                    for field in &fields {
                        if let Some(value) = value_for(job, applicant, field) {
                            if self.browser.fill(&session, field, &value).await.is_ok() {
                                prefilled += 1;
                            }
                        }
                    }
                }
                info!(job = %job.id, prefilled, "assisted prefill complete, awaiting applicant");
            }
            Err(e) => {
                debug!(job = %job.id, error = %e, "assisted prefill unavailable");
            }
        }

        Err(ApplyError::ObstacleDetected(format!(
            "manual submission required ({prefilled} fields prefilled)"
        )))
    }
}
