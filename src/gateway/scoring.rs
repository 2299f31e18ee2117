use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::applicant::ApplicantProfile;
use crate::pipeline::Job;

use super::GatewayError;

/// Relevance verdict for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub relevance_score: f32,
    /// Feature name → numeric contribution to the score.
    #[serde(default)]
    pub breakdown: BTreeMap<String, f32>,
}

/// Scores a job against the applicant. Swappable backend; carried as
/// `Arc<dyn ScoringGateway>` by the orchestrator.
#[async_trait]
pub trait ScoringGateway: Send + Sync {
    async fn score(&self, job: &Job) -> Result<ScoreReport, GatewayError>;
}

/// Remote scoring service speaking JSON over HTTP.
pub struct RemoteScoringGateway {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    title: &'a str,
    company: &'a str,
    location: &'a str,
    description: &'a str,
}

impl RemoteScoringGateway {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }
}

#[async_trait]
impl ScoringGateway for RemoteScoringGateway {
    async fn score(&self, job: &Job) -> Result<ScoreReport, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/score", self.base_url))
            .json(&ScoreRequest {
                title: &job.title,
                company: &job.company,
                location: &job.location,
                description: &job.description,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<ScoreReport>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

// Weights for the keyword backend. A skill hit in the title is worth far
// more than one buried in the description.
const TITLE_SKILL_WEIGHT: f32 = 25.0;
const DESCRIPTION_SKILL_WEIGHT: f32 = 10.0;
const HEADLINE_TOKEN_WEIGHT: f32 = 5.0;
const MAX_SCORE: f32 = 100.0;

/// Deterministic local backend: weighted keyword matching between the
/// applicant's skills/headline and the posting text. No network, no model.
pub struct KeywordScorer {
    profile: ApplicantProfile,
}

impl KeywordScorer {
    pub fn new(profile: ApplicantProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ScoringGateway for KeywordScorer {
    async fn score(&self, job: &Job) -> Result<ScoreReport, GatewayError> {
        let title = job.title.to_lowercase();
        let description = job.description.to_lowercase();

        let mut breakdown: BTreeMap<String, f32> = BTreeMap::new();

        for skill in &self.profile.skills {
            let skill_lower = skill.to_lowercase();
            let mut contribution = 0.0;
            if title.contains(&skill_lower) {
                contribution += TITLE_SKILL_WEIGHT;
            }
            if description.contains(&skill_lower) {
                contribution += DESCRIPTION_SKILL_WEIGHT;
            }
            if contribution > 0.0 {
                breakdown.insert(format!("skill:{skill_lower}"), contribution);
            }
        }

        // Longer headline tokens carry signal; short fillers do not.
        for token in self.profile.headline.to_lowercase().split_whitespace() {
            if token.len() > 4 && (title.contains(token) || description.contains(token)) {
                *breakdown.entry(format!("headline:{token}")).or_insert(0.0) +=
                    HEADLINE_TOKEN_WEIGHT;
            }
        }

        let relevance_score = breakdown.values().sum::<f32>().min(MAX_SCORE);
        Ok(ScoreReport {
            relevance_score,
            breakdown,
        })
    }
}
