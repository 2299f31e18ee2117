//! Jobfeed — plain aggregator feed. Search only; every application is
//! completed on the external site with assisted prefill.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{JobSourceAdapter, RawPosting, SearchQuery, SourceError, SourceId};

pub struct JobfeedSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Feed {
    items: Vec<FeedItem>,
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    id: String,
    title: String,
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    summary: String,
    link: String,
}

impl JobfeedSource {
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
impl JobSourceAdapter for JobfeedSource {
    fn id(&self) -> SourceId {
        SourceId::Jobfeed
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawPosting>, SourceError> {
        let response = self
            .client
            .get(format!("{}/feed.json", self.base_url))
            .query(&[("q", query.terms.as_str())])
            .send()
            .await?;

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

        let feed = response
            .json::<Feed>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let postings: Vec<RawPosting> = feed
            .items
            .into_iter()
            .map(|item| RawPosting {
                external_id: item.id,
                title: item.title,
                company: item.company,
                location: item.location,
                description: item.summary,
                url: item.link,
                easy_apply: false,
            })
            .collect();
        debug!(count = postings.len(), "jobfeed search complete");
        Ok(postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ApplicationType;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_maps_feed_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "jf-1",
                    "title": "Rust Engineer",
                    "company": "Hooli",
                    "location": "Remote",
                    "summary": "Async Rust services",
                    "link": "https://careers.hooli.example.com/jf-1",
                }],
            })))
            .mount(&server)
            .await;

        let adapter = JobfeedSource::new(server.uri());
        let postings = adapter.search(&SearchQuery::new("rust")).await.unwrap();

        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].external_id, "jf-1");
        // Feed postings always route to the assisted flow.
        assert_eq!(
            adapter.application_type_for(&postings[0]),
            ApplicationType::ExternalAssisted
        );
    }

    #[tokio::test]
    async fn malformed_feed_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let adapter = JobfeedSource::new(server.uri());
        let err = adapter.search(&SearchQuery::new("rust")).await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
