//! Offline demo pipeline: a stub job board, the local scoring and content
//! backends, and a scripted browser, wired into a full orchestrator. No
//! network, deterministic outcomes — the same stack the tests exercise.

use std::sync::Arc;

use async_trait::async_trait;

use crate::applicant::ApplicantProfile;
use crate::browser::{
    BrowserDriver, BrowserError, BrowserSession, FieldDescriptor, SubmitOutcome,
};
use crate::gateway::{KeywordScorer, TemplateContentGateway};
use crate::orchestrator::{RunOrchestrator, RunSettings};
use crate::pipeline::{Job, RetryPolicy};
use crate::sources::{
    ApplicationPayload, JobSourceAdapter, RawPosting, SearchQuery, SourceError, SourceId,
    SourceRegistry, SubmissionReceipt,
};
use crate::store::MemoryStore;
use crate::strategy::{
    ApplyStrategy, AssistedStrategy, EasyApplyStrategy, StructuredApiStrategy,
};

/// Stub board with canned postings. Declares a full capability set but its
/// API only accepts the first posting, so the demo shows API success, the
/// easy-apply fallback, a bot-challenge pause, and a below-threshold skip.
pub struct DemoBoard;

impl DemoBoard {
    fn postings() -> Vec<RawPosting> {
        vec![
            RawPosting {
                external_id: "demo-101".into(),
                title: "Senior Rust Engineer".into(),
                company: "Ferrous Systems".into(),
                location: "Remote".into(),
                description: "Own async services built on rust and tokio.".into(),
                url: "https://demo.invalid/jobs/demo-101".into(),
                easy_apply: true,
            },
            RawPosting {
                external_id: "demo-102".into(),
                title: "Backend Engineer (Rust)".into(),
                company: "Orbital".into(),
                location: "Lisbon".into(),
                description: "Distributed systems in rust, tokio, async everywhere.".into(),
                url: "https://demo.invalid/jobs/demo-102".into(),
                easy_apply: true,
            },
            RawPosting {
                external_id: "demo-103".into(),
                title: "Platform Engineer".into(),
                company: "Quantify".into(),
                location: "Berlin".into(),
                description: "Async rust and tokio services for distributed systems; the careers page sits behind a challenge gate.".into(),
                url: "https://demo.invalid/jobs/demo-103/challenge".into(),
                easy_apply: true,
            },
            RawPosting {
                external_id: "demo-104".into(),
                title: "Account Executive".into(),
                company: "SellMore".into(),
                location: "Remote".into(),
                description: "Own the sales pipeline end to end; no rust knowledge required.".into(),
                url: "https://demo.invalid/jobs/demo-104".into(),
                easy_apply: false,
            },
        ]
    }
}

#[async_trait]
impl JobSourceAdapter for DemoBoard {
    fn id(&self) -> SourceId {
        SourceId::Demo
    }

    fn supports_application_api(&self) -> bool {
        true
    }

    fn supports_easy_apply(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, SourceError> {
        let terms = query.terms.to_lowercase();
        Ok(Self::postings()
            .into_iter()
            .filter(|p| {
                terms.is_empty()
                    || p.title.to_lowercase().contains(&terms)
                    || p.description.to_lowercase().contains(&terms)
            })
            .collect())
    }

    async fn submit_application(
        &self,
        job: &Job,
        _payload: &ApplicationPayload,
    ) -> Result<SubmissionReceipt, SourceError> {
        // Only the first posting's API accepts submissions; the rest force
        // the chain to fall through to the browser flow.
        if job.external_id == "demo-101" {
            Ok(SubmissionReceipt {
                confirmation_id: Some(format!("demo-conf-{}", job.external_id)),
            })
        } else {
            Err(SourceError::Api {
                status: 422,
                message: "posting requires the hosted apply form".into(),
            })
        }
    }
}

/// Scripted browser: standard contact form everywhere, with a bot
/// challenge on any URL containing `challenge`.
pub struct ScriptedBrowser;

#[async_trait]
impl BrowserDriver for ScriptedBrowser {
    async fn open(&self, url: &str) -> Result<BrowserSession, BrowserError> {
        Ok(BrowserSession {
            id: format!("demo-session-{}", url.len()),
            url: url.to_string(),
        })
    }

    async fn detect_fields(
        &self,
        _session: &BrowserSession,
    ) -> Result<Vec<FieldDescriptor>, BrowserError> {
        Ok(vec![
            FieldDescriptor {
                name: "full_name".into(),
                label: "Full name".into(),
                required: true,
            },
            FieldDescriptor {
                name: "email".into(),
                label: "Email".into(),
                required: true,
            },
            FieldDescriptor {
                name: "cover_letter".into(),
                label: "Cover letter".into(),
                required: false,
            },
        ])
    }

    async fn fill(
        &self,
        _session: &BrowserSession,
        _field: &FieldDescriptor,
        _value: &str,
    ) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn submit(&self, session: &BrowserSession) -> Result<SubmitOutcome, BrowserError> {
        if session.url.contains("challenge") {
            return Ok(SubmitOutcome {
                ok: false,
                challenge_detected: true,
            });
        }
        Ok(SubmitOutcome {
            ok: true,
            challenge_detected: false,
        })
    }

    async fn close(&self, _session: &BrowserSession) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// Wire a complete offline orchestrator over a shared in-memory store.
pub fn demo_orchestrator() -> (RunOrchestrator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let profile = ApplicantProfile::sample();
    let sources = Arc::new(SourceRegistry::new(vec![Arc::new(DemoBoard)]));
    let browser: Arc<dyn BrowserDriver> = Arc::new(ScriptedBrowser);

    let strategies: Vec<Arc<dyn ApplyStrategy>> = vec![
        Arc::new(StructuredApiStrategy::new(sources.clone())),
        Arc::new(EasyApplyStrategy::new(browser.clone(), sources.clone())),
        Arc::new(AssistedStrategy::new(browser)),
    ];

    let orchestrator = RunOrchestrator::new(
        sources,
        Arc::new(KeywordScorer::new(profile.clone())),
        Arc::new(TemplateContentGateway::new(profile.clone())),
        strategies,
        store.clone(),
        profile,
        RunSettings {
            relevance_threshold: 40.0,
            retry_policy: RetryPolicy::zero_delay(3),
            workers: 2,
            auto_approve: true,
        },
    );

    (orchestrator, store)
}
