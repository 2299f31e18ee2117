use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::applicant::ApplicantProfile;
use crate::pipeline::{GeneratedContent, Job};

use super::GatewayError;

/// Generates tailored application content for an approved job. Swappable
/// backend; carried as `Arc<dyn ContentGateway>` by the orchestrator.
#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn generate(&self, job: &Job) -> Result<GeneratedContent, GatewayError>;
}

/// Remote content service (typically an LLM behind an internal API).
pub struct RemoteContentGateway {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    title: &'a str,
    company: &'a str,
    description: &'a str,
}

impl RemoteContentGateway {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }
}

#[async_trait]
impl ContentGateway for RemoteContentGateway {
    async fn generate(&self, job: &Job) -> Result<GeneratedContent, GatewayError> {
        let response = self
            .client
            .post(format!("{}/v1/generate", self.base_url))
            .json(&GenerateRequest {
                title: &job.title,
                company: &job.company,
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
            .json::<GeneratedContent>()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

/// Offline backend: assembles serviceable content from the profile and the
/// posting text. Used when no content service is configured and by the
/// demo pipeline.
pub struct TemplateContentGateway {
    profile: ApplicantProfile,
}

impl TemplateContentGateway {
    pub fn new(profile: ApplicantProfile) -> Self {
        Self { profile }
    }

    fn matching_skills(&self, job: &Job) -> Vec<String> {
        let haystack = format!("{} {}", job.title, job.description).to_lowercase();
        self.profile
            .skills
            .iter()
            .filter(|skill| haystack.contains(&skill.to_lowercase()))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContentGateway for TemplateContentGateway {
    async fn generate(&self, job: &Job) -> Result<GeneratedContent, GatewayError> {
        let skills = self.matching_skills(job);
        let skill_phrase = if skills.is_empty() {
            "backend engineering".to_string()
        } else {
            skills.join(", ")
        };

        let summary = format!(
            "{} — applying for {} at {} with hands-on experience in {}.",
            self.profile.headline, job.title, job.company, skill_phrase
        );

        let mut resume_points: Vec<String> = skills
            .iter()
            .take(5)
            .map(|skill| format!("Hands-on {skill} experience matching the {} role.", job.title))
            .collect();
        if resume_points.is_empty() {
            resume_points.push(format!(
                "Track record delivering production services relevant to {}.",
                job.company
            ));
        }

        let cover_letter = format!(
            "Dear {} team,\n\nThe {} role matches my background: {}. \
             I would be glad to walk you through relevant work in a conversation.\n\n\
             Best regards,\n{}",
            job.company, job.title, skill_phrase, self.profile.full_name
        );

        Ok(GeneratedContent {
            summary,
            resume_points,
            cover_letter,
            answers: self.profile.default_answers.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ApplicationType;
    use crate::sources::{RawPosting, SourceId};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job() -> Job {
        Job::from_posting(
            "run-1",
            SourceId::Formhire,
            ApplicationType::EasyApply,
            RawPosting {
                external_id: "fh-1".into(),
                title: "Rust Developer".into(),
                company: "Initech".into(),
                location: "Lisbon".into(),
                description: "Build async pipelines with tokio.".into(),
                url: "https://formhire.example.com/fh-1/apply".into(),
                easy_apply: true,
            },
        )
    }

    #[tokio::test]
    async fn template_gateway_mentions_job_and_matched_skills() {
        let gateway = TemplateContentGateway::new(ApplicantProfile::sample());
        let content = gateway.generate(&job()).await.unwrap();

        assert!(content.summary.contains("Rust Developer"));
        assert!(content.summary.contains("Initech"));
        assert!(content.cover_letter.contains("Alex Moreira"));
        assert!(!content.resume_points.is_empty());
        assert!(content.resume_points.iter().any(|p| p.contains("rust")));
        assert_eq!(
            content.answers.get("notice_period").map(String::as_str),
            Some("Four weeks")
        );
    }

    #[tokio::test]
    async fn template_gateway_handles_no_skill_overlap() {
        let gateway = TemplateContentGateway::new(ApplicantProfile::sample());
        let mut j = job();
        j.title = "Marketing Lead".into();
        j.description = "Own the brand.".into();

        let content = gateway.generate(&j).await.unwrap();
        assert_eq!(content.resume_points.len(), 1);
        assert!(content.summary.contains("backend engineering"));
    }

    #[tokio::test]
    async fn remote_gateway_parses_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "summary": "Seasoned Rust engineer.",
                "resume_points": ["Led migration to async Rust"],
                "cover_letter": "Dear team...",
                "answers": {"why_us": "Strong infra culture"},
            })))
            .mount(&server)
            .await;

        let gateway = RemoteContentGateway::new(server.uri());
        let content = gateway.generate(&job()).await.unwrap();
        assert_eq!(content.summary, "Seasoned Rust engineer.");
        assert_eq!(content.resume_points.len(), 1);
        assert_eq!(
            content.answers.get("why_us").map(String::as_str),
            Some("Strong infra culture")
        );
    }

    #[tokio::test]
    async fn remote_gateway_failure_is_per_job_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/generate"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .mount(&server)
            .await;

        let gateway = RemoteContentGateway::new(server.uri());
        let err = gateway.generate(&job()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 429, .. }));
    }
}
