//! Boardwire — structured job board with a full search + application API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::pipeline::Job;

use super::{
    ApplicationPayload, JobSourceAdapter, RawPosting, SearchQuery, SourceError, SourceId,
    SubmissionReceipt,
};

/// Rate-limit backoffs per page before the error propagates.
const MAX_RATE_LIMIT_WAITS: u32 = 3;

pub struct BoardwireSource {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    postings: Vec<WirePosting>,
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WirePosting {
    id: String,
    title: String,
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    url: String,
    #[serde(default)]
    easy_apply: bool,
}

#[derive(Debug, Deserialize)]
struct ApplyResponse {
    #[serde(default)]
    confirmation_id: Option<String>,
}

impl BoardwireSource {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<SearchPage, SourceError> {
        let mut waits = 0;
        loop {
            let mut request = self
                .client
                .get(format!("{}/v1/postings", self.base_url))
                .header("x-api-key", &self.api_key)
                .query(&[("query", query.terms.as_str())])
                .query(&[("page", page)]);
            if let Some(location) = &query.location {
                request = request.query(&[("location", location.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_ms = retry_after_ms(&response);
                waits += 1;
                if waits > MAX_RATE_LIMIT_WAITS {
                    return Err(SourceError::RateLimited { retry_after_ms });
                }
                debug!(page, retry_after_ms, "boardwire rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(retry_after_ms)).await;
                continue;
            }

            if !status.is_success() {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "unknown error".to_string());
                return Err(SourceError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return response
                .json::<SearchPage>()
                .await
                .map_err(|e| SourceError::Parse(e.to_string()));
        }
    }
}

#[async_trait]
impl JobSourceAdapter for BoardwireSource {
    fn id(&self) -> SourceId {
        SourceId::Boardwire
    }

    fn supports_application_api(&self) -> bool {
        true
    }

    fn supports_easy_apply(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, SourceError> {
        let mut postings = Vec::new();
        let mut page = 1;
        loop {
            let body = self.fetch_page(query, page).await?;
            postings.extend(body.postings.into_iter().map(|p| RawPosting {
                external_id: p.id,
                title: p.title,
                company: p.company,
                location: p.location,
                description: p.description,
                url: p.url,
                easy_apply: p.easy_apply,
            }));
            match body.next_page {
                Some(next) => page = next,
                None => break,
            }
        }
        debug!(count = postings.len(), "boardwire search complete");
        Ok(postings)
    }

    async fn submit_application(
        &self,
        job: &Job,
        payload: &ApplicationPayload,
    ) -> Result<SubmissionReceipt, SourceError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/postings/{}/applications",
                self.base_url, job.external_id
            ))
            .header("x-api-key", &self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited {
                retry_after_ms: retry_after_ms(&response),
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!(job = %job.id, status = status.as_u16(), "boardwire submission rejected");
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<ApplyResponse>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;
        Ok(SubmissionReceipt {
            confirmation_id: body.confirmation_id,
        })
    }
}

fn retry_after_ms(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(|secs| secs * 1000)
        .unwrap_or(1000)
}
