//! Application strategies, ordered from most to least automated.
//!
//! A job enters the chain at the strategy matching its application type and
//! only ever falls through to *less* automated strategies. Fall-through
//! happens on strategy-fatal failures; success and needs-human stop the
//! chain; transport failures are retried in place by the apply agent.

mod assisted;
mod easy_apply;
mod structured_api;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::applicant::ApplicantProfile;
use crate::browser::FieldDescriptor;
use crate::error::ApplyError;
use crate::pipeline::{ApplicationType, Job};

pub use assisted::AssistedStrategy;
pub use easy_apply::EasyApplyStrategy;
pub use structured_api::StructuredApiStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    StructuredApi,
    EasyApply,
    Assisted,
}

impl StrategyKind {
    /// Position in the automation ordering; lower is more automated.
    pub fn automation_rank(self) -> u8 {
        match self {
            StrategyKind::StructuredApi => 0,
            StrategyKind::EasyApply => 1,
            StrategyKind::Assisted => 2,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::StructuredApi => write!(f, "structured_api"),
            StrategyKind::EasyApply => write!(f, "easy_apply"),
            StrategyKind::Assisted => write!(f, "assisted"),
        }
    }
}

/// Acknowledgement of a completed submission.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub confirmation_id: Option<String>,
}

/// One way of submitting an application.
#[async_trait]
pub trait ApplyStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Whether the job's source declares the capability this strategy needs.
    fn supports(&self, job: &Job) -> bool;

    async fn attempt(
        &self,
        job: &Job,
        applicant: &ApplicantProfile,
    ) -> Result<Submission, ApplyError>;
}

/// Entry rank of the chain for a job's declared application type.
fn entry_rank(application_type: ApplicationType) -> u8 {
    match application_type {
        ApplicationType::StructuredApi => 0,
        ApplicationType::EasyApply => 1,
        ApplicationType::ExternalAssisted => 2,
    }
}

/// Build the ordered chain for one job: most automated first, starting at
/// the job's application type (never escalating above it), filtered to the
/// strategies the job's source supports.
pub fn build_chain(
    job: &Job,
    strategies: &[Arc<dyn ApplyStrategy>],
) -> Vec<Arc<dyn ApplyStrategy>> {
    let entry = entry_rank(job.application_type);
    let mut chain: Vec<Arc<dyn ApplyStrategy>> = strategies
        .iter()
        .filter(|s| s.kind().automation_rank() >= entry)
        .filter(|s| s.supports(job))
        .cloned()
        .collect();
    chain.sort_by_key(|s| s.kind().automation_rank());
    chain
}

/// Best value for a detected form field: generated content first (answers,
/// cover letter, summary), then the applicant profile.
pub(crate) fn value_for(
    job: &Job,
    applicant: &ApplicantProfile,
    field: &FieldDescriptor,
) -> Option<String> {
    let name = field.name.to_lowercase();
    let label = field.label.to_lowercase();
    let hit = |needle: &str| name.contains(needle) || label.contains(needle);

    if let Some(content) = &job.content {
        if let Some((_, answer)) = content
            .answers
            .iter()
            .find(|(key, _)| hit(&key.to_lowercase()))
        {
            return Some(answer.clone());
        }
        if hit("cover") {
            return Some(content.cover_letter.clone());
        }
        if hit("summary") || hit("about") {
            return Some(content.summary.clone());
        }
    }

    applicant.answer_for(&field.name, &field.label)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Scripted strategy: pops one result per attempt, records call counts.
    pub struct ScriptedStrategy {
        kind: StrategyKind,
        supported: bool,
        script: Mutex<Vec<Result<Submission, ApplyError>>>,
        pub calls: Mutex<u32>,
    }

    impl ScriptedStrategy {
        pub fn new(
            kind: StrategyKind,
            supported: bool,
            script: Vec<Result<Submission, ApplyError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                kind,
                supported,
                script: Mutex::new(script),
                calls: Mutex::new(0),
            })
        }

        pub fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ApplyStrategy for ScriptedStrategy {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn supports(&self, _job: &Job) -> bool {
            self.supported
        }

        async fn attempt(
            &self,
            _job: &Job,
            _applicant: &ApplicantProfile,
        ) -> Result<Submission, ApplyError> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(ApplyError::StructuralMismatch("script exhausted".into()));
            }
            script.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedStrategy;
    use super::*;
    use crate::sources::{RawPosting, SourceId};

    fn job(application_type: ApplicationType) -> Job {
        Job::from_posting(
            "run-1",
            SourceId::Boardwire,
            application_type,
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

    fn all_strategies(api_supported: bool) -> Vec<Arc<dyn ApplyStrategy>> {
        vec![
            ScriptedStrategy::new(StrategyKind::StructuredApi, api_supported, vec![]),
            ScriptedStrategy::new(StrategyKind::EasyApply, true, vec![]),
            ScriptedStrategy::new(StrategyKind::Assisted, true, vec![]),
        ]
    }

    #[test]
    fn chain_orders_most_automated_first() {
        let chain = build_chain(&job(ApplicationType::StructuredApi), &all_strategies(true));
        let kinds: Vec<StrategyKind> = chain.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StrategyKind::StructuredApi,
                StrategyKind::EasyApply,
                StrategyKind::Assisted
            ]
        );
    }

    #[test]
    fn chain_never_escalates_above_entry_point() {
        let chain = build_chain(&job(ApplicationType::EasyApply), &all_strategies(true));
        let kinds: Vec<StrategyKind> = chain.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![StrategyKind::EasyApply, StrategyKind::Assisted]);
    }

    #[test]
    fn chain_filters_unsupported_strategies() {
        let chain = build_chain(&job(ApplicationType::StructuredApi), &all_strategies(false));
        let kinds: Vec<StrategyKind> = chain.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![StrategyKind::EasyApply, StrategyKind::Assisted]);
    }

    #[test]
    fn assisted_entry_gets_single_strategy_chain() {
        let chain = build_chain(&job(ApplicationType::ExternalAssisted), &all_strategies(true));
        let kinds: Vec<StrategyKind> = chain.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![StrategyKind::Assisted]);
    }

    #[test]
    fn value_for_prefers_generated_answers() {
        let applicant = ApplicantProfile::sample();
        let mut j = job(ApplicationType::EasyApply);
        j.content = Some(crate::pipeline::GeneratedContent {
            summary: "Generated summary".into(),
            resume_points: vec![],
            cover_letter: "Generated letter".into(),
            answers: std::collections::BTreeMap::from([(
                "notice_period".to_string(),
                "Two weeks".to_string(),
            )]),
        });

        let field = FieldDescriptor {
            name: "notice_period".into(),
            label: "Notice period".into(),
            required: false,
        };
        assert_eq!(
            value_for(&j, &applicant, &field).as_deref(),
            Some("Two weeks")
        );

        let cover = FieldDescriptor {
            name: "cover_letter".into(),
            label: String::new(),
            required: false,
        };
        assert_eq!(
            value_for(&j, &applicant, &cover).as_deref(),
            Some("Generated letter")
        );

        let email = FieldDescriptor {
            name: "email".into(),
            label: String::new(),
            required: true,
        };
        assert_eq!(
            value_for(&j, &applicant, &email).as_deref(),
            Some("alex.moreira@example.com")
        );
    }
}
