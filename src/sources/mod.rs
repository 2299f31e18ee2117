//! Job source adapters.
//!
//! Each external source implements [`JobSourceAdapter`] and documents its
//! own capabilities truthfully; the application chain dispatches on the
//! declared capability flags, never on the source's identity, so new
//! sources plug in without touching the chain logic.

pub mod boardwire;
pub mod formhire;
pub mod jobfeed;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::applicant::ApplicantProfile;
use crate::pipeline::{ApplicationType, Job};

pub use boardwire::BoardwireSource;
pub use formhire::FormhireSource;
pub use jobfeed::JobfeedSource;

/// Known job sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    Boardwire,
    Formhire,
    Jobfeed,
    Demo,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Boardwire => write!(f, "boardwire"),
            SourceId::Formhire => write!(f, "formhire"),
            SourceId::Jobfeed => write!(f, "jobfeed"),
            SourceId::Demo => write!(f, "demo"),
        }
    }
}

/// A posting as emitted by source search, before it becomes a [`Job`].
#[derive(Debug, Clone)]
pub struct RawPosting {
    pub external_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub url: String,
    /// Whether the source exposes an in-page quick-apply form for this
    /// posting (known from the source's own metadata).
    pub easy_apply: bool,
}

/// Search parameters passed to every adapter.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub terms: String,
    pub location: Option<String>,
}

impl SearchQuery {
    pub fn new(terms: impl Into<String>) -> Self {
        Self {
            terms: terms.into(),
            location: None,
        }
    }
}

/// Errors surfaced by source adapters.
///
/// Ordinary end-of-results never raises; pagination is internal to each
/// adapter. Only transport-level problems and API rejections propagate.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source returned HTTP 429; `retry_after_ms` says how long to wait.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Non-2xx response from the source's API.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Underlying network failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Parse(String),

    /// The adapter does not declare the capability that was requested.
    #[error("{source_id} does not support API submission")]
    CapabilityUnsupported { source_id: SourceId },
}

/// Wire payload for a structured API submission, assembled from the
/// applicant profile plus the job's generated content.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPayload {
    pub applicant_name: String,
    pub email: String,
    pub phone: String,
    pub summary: Option<String>,
    pub cover_letter: Option<String>,
    pub answers: BTreeMap<String, String>,
}

impl ApplicationPayload {
    pub fn assemble(job: &Job, applicant: &ApplicantProfile) -> Self {
        let mut answers = applicant.default_answers.clone();
        let (summary, cover_letter) = match &job.content {
            Some(content) => {
                // Generated answers take precedence over profile defaults.
                for (k, v) in &content.answers {
                    answers.insert(k.clone(), v.clone());
                }
                (Some(content.summary.clone()), Some(content.cover_letter.clone()))
            }
            None => (None, None),
        };
        Self {
            applicant_name: applicant.full_name.clone(),
            email: applicant.email.clone(),
            phone: applicant.phone.clone(),
            summary,
            cover_letter,
            answers,
        }
    }
}

/// Acknowledgement returned by a successful API submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub confirmation_id: Option<String>,
}

/// Capability descriptor plus search/apply primitives for one source.
#[async_trait]
pub trait JobSourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    /// Whether the source exposes a structured application API.
    fn supports_application_api(&self) -> bool {
        false
    }

    /// Whether the source hosts in-page forms an automated browser can fill.
    fn supports_easy_apply(&self) -> bool {
        false
    }

    /// Fetch all postings matching the query. Finite; pagination and
    /// rate-limit backoff are internal. End-of-results is not an error.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, SourceError>;

    /// Submit an application through the source's API. Only sources with
    /// `supports_application_api() == true` override this.
    async fn submit_application(
        &self,
        _job: &Job,
        _payload: &ApplicationPayload,
    ) -> Result<SubmissionReceipt, SourceError> {
        Err(SourceError::CapabilityUnsupported { source_id: self.id() })
    }

    /// Entry point of the strategy chain for a posting, derived from the
    /// declared capabilities and the posting's own metadata.
    fn application_type_for(&self, posting: &RawPosting) -> ApplicationType {
        if self.supports_application_api() {
            ApplicationType::StructuredApi
        } else if self.supports_easy_apply() && posting.easy_apply {
            ApplicationType::EasyApply
        } else {
            ApplicationType::ExternalAssisted
        }
    }
}

/// The set of configured adapters, looked up by [`SourceId`].
pub struct SourceRegistry {
    adapters: Vec<Arc<dyn JobSourceAdapter>>,
}

impl SourceRegistry {
    pub fn new(adapters: Vec<Arc<dyn JobSourceAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn get(&self, id: SourceId) -> Option<Arc<dyn JobSourceAdapter>> {
        self.adapters.iter().find(|a| a.id() == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn JobSourceAdapter>> {
        self.adapters.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SearchOnly;

    #[async_trait]
    impl JobSourceAdapter for SearchOnly {
        fn id(&self) -> SourceId {
            SourceId::Jobfeed
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<RawPosting>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn posting(easy_apply: bool) -> RawPosting {
        RawPosting {
            external_id: "p-1".into(),
            title: "Engineer".into(),
            company: "Acme".into(),
            location: String::new(),
            description: String::new(),
            url: "https://example.com/p-1".into(),
            easy_apply,
        }
    }

    #[tokio::test]
    async fn default_submit_reports_missing_capability() {
        let adapter = SearchOnly;
        let job = Job::from_posting(
            "run-1",
            adapter.id(),
            ApplicationType::ExternalAssisted,
            posting(false),
        );
        let applicant = ApplicantProfile::sample();
        let payload = ApplicationPayload::assemble(&job, &applicant);

        let err = adapter.submit_application(&job, &payload).await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::CapabilityUnsupported { source_id: SourceId::Jobfeed }
        ));
    }

    #[test]
    fn application_type_follows_declared_capability() {
        let adapter = SearchOnly;
        assert_eq!(
            adapter.application_type_for(&posting(true)),
            ApplicationType::ExternalAssisted
        );
    }

    #[test]
    fn registry_lookup_by_id() {
        let registry = SourceRegistry::new(vec![Arc::new(SearchOnly)]);
        assert!(registry.get(SourceId::Jobfeed).is_some());
        assert!(registry.get(SourceId::Boardwire).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn payload_prefers_generated_answers() {
        let mut applicant = ApplicantProfile::sample();
        applicant
            .default_answers
            .insert("work_authorization".into(), "requires sponsorship".into());

        let mut job = Job::from_posting(
            "run-1",
            SourceId::Boardwire,
            ApplicationType::StructuredApi,
            posting(false),
        );
        job.content = Some(crate::pipeline::GeneratedContent {
            summary: "Summary".into(),
            resume_points: vec!["Point".into()],
            cover_letter: "Dear team".into(),
            answers: BTreeMap::from([(
                "work_authorization".to_string(),
                "authorized to work".to_string(),
            )]),
        });

        let payload = ApplicationPayload::assemble(&job, &applicant);
        assert_eq!(
            payload.answers.get("work_authorization").unwrap(),
            "authorized to work"
        );
        assert_eq!(payload.cover_letter.as_deref(), Some("Dear team"));
    }
}
