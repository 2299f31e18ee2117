//! Formhire — ATS that exposes search plus partial form metadata, but no
//! application API. Applications go through the browser easy-apply flow.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{JobSourceAdapter, RawPosting, SearchQuery, SourceError, SourceId};

pub struct FormhireSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<WireResult>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    id: String,
    title: String,
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    snippet: String,
    apply_url: String,
    /// Known form fields for the posting; empty when the ATS has no
    /// structured form for it and the applicant must apply off-site.
    #[serde(default)]
    fields: Vec<String>,
}

impl FormhireSource {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }
}

#[async_trait]
impl JobSourceAdapter for FormhireSource {
    fn id(&self) -> SourceId {
        SourceId::Formhire
    }

    fn supports_easy_apply(&self) -> bool {
        true
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, SourceError> {
        let mut postings = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = self
                .client
                .get(format!("{}/api/search", self.base_url))
                .query(&[("q", query.terms.as_str())]);
            if let Some(location) = &query.location {
                request = request.query(&[("location", location.as_str())]);
            }
            if let Some(cursor) = &cursor {
                request = request.query(&[("cursor", cursor.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();
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

            let body = response
                .json::<SearchResponse>()
                .await
                .map_err(|e| SourceError::Parse(e.to_string()))?;

            postings.extend(body.results.into_iter().map(|r| RawPosting {
                external_id: r.id,
                title: r.title,
                company: r.company,
                location: r.location,
                description: r.snippet,
                url: r.apply_url,
                easy_apply: !r.fields.is_empty(),
            }));

            match body.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        debug!(count = postings.len(), "formhire search complete");
        Ok(postings)
    }
}
