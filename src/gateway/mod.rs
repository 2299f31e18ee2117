//! External collaborator boundaries: relevance scoring and tailored
//! content generation. Both are reached through traits so remote services
//! and the built-in deterministic backends are interchangeable; a gateway
//! failure is always a per-job error, never a run abort.

pub mod content;
pub mod scoring;

use thiserror::Error;

pub use content::{ContentGateway, RemoteContentGateway, TemplateContentGateway};
pub use scoring::{KeywordScorer, RemoteScoringGateway, ScoreReport, ScoringGateway};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed gateway response: {0}")]
    Parse(String),
}
