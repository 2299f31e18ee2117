//! Browser-automation facility boundary.
//!
//! The pipeline treats the browser as an opaque capability: open a page,
//! detect its form fields, fill them, submit. [`HttpBrowserDriver`] bridges
//! to a local automation service over HTTP; tests and the demo plug in
//! their own [`BrowserDriver`] impls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle for one open page. One session per worker at a time; sessions are
/// never shared across jobs.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    pub id: String,
    pub url: String,
}

/// One fillable form field as detected on the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

/// Result of driving the page's submit action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub ok: bool,
    /// The page presented a CAPTCHA or similar bot challenge instead of
    /// accepting the submission.
    pub challenge_detected: bool,
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser operation timed out: {0}")]
    Timeout(String),

    #[error("browser session closed: {0}")]
    SessionClosed(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn open(&self, url: &str) -> Result<BrowserSession, BrowserError>;
    async fn detect_fields(&self, session: &BrowserSession)
        -> Result<Vec<FieldDescriptor>, BrowserError>;
    async fn fill(
        &self,
        session: &BrowserSession,
        field: &FieldDescriptor,
        value: &str,
    ) -> Result<(), BrowserError>;
    async fn submit(&self, session: &BrowserSession) -> Result<SubmitOutcome, BrowserError>;
    async fn close(&self, session: &BrowserSession) -> Result<(), BrowserError>;
}

/// Bridge to a browser-automation service speaking JSON over HTTP
/// (one session per page, driven remotely).
pub struct HttpBrowserDriver {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OpenResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct FieldsResponse {
    fields: Vec<FieldDescriptor>,
}

impl HttpBrowserDriver {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            // Form navigation and submission can be slow on heavy pages.
            .timeout(Duration::from_secs(90))
            .build()
            .expect("failed to build HTTP client");
        Self { client, base_url }
    }

    async fn check(response: reqwest::Response, op: &str) -> Result<reqwest::Response, BrowserError> {
        let status = response.status();
        if status == reqwest::StatusCode::GATEWAY_TIMEOUT
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
        {
            return Err(BrowserError::Timeout(format!("{op} (status {status})")));
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(BrowserError::Navigation(format!(
                "{op} failed (status {status}): {message}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl BrowserDriver for HttpBrowserDriver {
    async fn open(&self, url: &str) -> Result<BrowserSession, BrowserError> {
        let response = self
            .client
            .post(format!("{}/session", self.base_url))
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;
        let response = Self::check(response, "open").await?;
        let body = response
            .json::<OpenResponse>()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(BrowserSession {
            id: body.session_id,
            url: url.to_string(),
        })
    }

    async fn detect_fields(
        &self,
        session: &BrowserSession,
    ) -> Result<Vec<FieldDescriptor>, BrowserError> {
        let response = self
            .client
            .get(format!("{}/session/{}/fields", self.base_url, session.id))
            .send()
            .await?;
        let response = Self::check(response, "detect_fields").await?;
        let body = response
            .json::<FieldsResponse>()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;
        Ok(body.fields)
    }

    async fn fill(
        &self,
        session: &BrowserSession,
        field: &FieldDescriptor,
        value: &str,
    ) -> Result<(), BrowserError> {
        let response = self
            .client
            .post(format!("{}/session/{}/fill", self.base_url, session.id))
            .json(&serde_json::json!({ "field": field.name, "value": value }))
            .send()
            .await?;
        Self::check(response, "fill").await?;
        Ok(())
    }

    async fn submit(&self, session: &BrowserSession) -> Result<SubmitOutcome, BrowserError> {
        let response = self
            .client
            .post(format!("{}/session/{}/submit", self.base_url, session.id))
            .send()
            .await?;
        let response = Self::check(response, "submit").await?;
        response
            .json::<SubmitOutcome>()
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))
    }

    async fn close(&self, session: &BrowserSession) -> Result<(), BrowserError> {
        let response = self
            .client
            .delete(format!("{}/session/{}", self.base_url, session.id))
            .send()
            .await?;
        Self::check(response, "close").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn open_detect_fill_submit_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"session_id": "s-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/session/s-1/fields"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "fields": [
                    {"name": "email", "label": "Email address", "required": true},
                    {"name": "cover_letter", "label": "Cover letter"},
                ],
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s-1/fill"))
            .and(body_json(json!({"field": "email", "value": "jo@example.com"})))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s-1/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "challenge_detected": false,
            })))
            .mount(&server)
            .await;

        let driver = HttpBrowserDriver::new(server.uri());
        let session = driver.open("https://example.com/apply").await.unwrap();
        let fields = driver.detect_fields(&session).await.unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields[0].required);

        driver
            .fill(&session, &fields[0], "jo@example.com")
            .await
            .unwrap();
        let outcome = driver.submit(&session).await.unwrap();
        assert!(outcome.ok);
        assert!(!outcome.challenge_detected);
    }

    #[tokio::test]
    async fn challenge_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"session_id": "s-2"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/session/s-2/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "challenge_detected": true,
            })))
            .mount(&server)
            .await;

        let driver = HttpBrowserDriver::new(server.uri());
        let session = driver.open("https://example.com/apply").await.unwrap();
        let outcome = driver.submit(&session).await.unwrap();
        assert!(outcome.challenge_detected);
    }

    #[tokio::test]
    async fn navigation_failure_surfaces_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/session"))
            .respond_with(ResponseTemplate::new(502).set_body_string("page crashed"))
            .mount(&server)
            .await;

        let driver = HttpBrowserDriver::new(server.uri());
        let err = driver.open("https://example.com/apply").await.unwrap_err();
        match err {
            BrowserError::Navigation(msg) => assert!(msg.contains("page crashed")),
            other => panic!("expected Navigation, got {other:?}"),
        }
    }
}
