use thiserror::Error;

use crate::pipeline::AttemptOutcome;

#[derive(Debug, Error)]
pub enum VagaError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {0} is not paused awaiting human action")]
    NotAwaitingHuman(String),

    #[error("Job {0} has not been approved for application")]
    NotApproved(String),

    #[error("Invalid {entity} transition: {from} → {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Source error: {0}")]
    Source(#[from] crate::sources::SourceError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] crate::gateway::GatewayError),

    #[error("Browser error: {0}")]
    Browser(#[from] crate::browser::BrowserError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failure taxonomy for one application attempt.
///
/// Each variant maps to exactly one chain decision: `Transport` is retried
/// in place, `CapabilityUnsupported` and `StructuralMismatch` are fatal for
/// the current strategy only (the chain falls through), `ObstacleDetected`
/// pauses the job for a human, and `ExhaustedRetries` is terminal for the
/// job once every applicable strategy has been tried.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Source, API or browser transiently unreachable.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The source does not declare the capability this strategy needs.
    #[error("capability unsupported: {0}")]
    CapabilityUnsupported(String),

    /// Form or submission schema not recognized.
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    /// Bot challenge, unexpected auth prompt, or a page a human must handle.
    #[error("obstacle detected: {0}")]
    ObstacleDetected(String),

    /// Every applicable strategy exhausted without a submission.
    #[error("all strategies exhausted after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },
}

impl ApplyError {
    /// The audit outcome recorded for an attempt that ended in this error.
    pub fn outcome(&self) -> AttemptOutcome {
        match self {
            ApplyError::Transport(_) => AttemptOutcome::RetryableFailure,
            ApplyError::CapabilityUnsupported(_) | ApplyError::StructuralMismatch(_) => {
                AttemptOutcome::FatalFailure
            }
            ApplyError::ObstacleDetected(_) => AttemptOutcome::NeedsHuman,
            ApplyError::ExhaustedRetries { .. } => AttemptOutcome::FatalFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_retryable() {
        let err = ApplyError::Transport("connection reset".into());
        assert_eq!(err.outcome(), AttemptOutcome::RetryableFailure);
    }

    #[test]
    fn strategy_fatal_errors_classify_as_fatal() {
        let cap = ApplyError::CapabilityUnsupported("no application API".into());
        let form = ApplyError::StructuralMismatch("unknown form layout".into());
        assert_eq!(cap.outcome(), AttemptOutcome::FatalFailure);
        assert_eq!(form.outcome(), AttemptOutcome::FatalFailure);
    }

    #[test]
    fn obstacle_needs_human() {
        let err = ApplyError::ObstacleDetected("captcha".into());
        assert_eq!(err.outcome(), AttemptOutcome::NeedsHuman);
    }

    #[test]
    fn apply_error_display() {
        let err = ApplyError::ObstacleDetected("bot challenge".into());
        assert_eq!(err.to_string(), "obstacle detected: bot challenge");

        let err = ApplyError::ExhaustedRetries { attempts: 5 };
        assert_eq!(err.to_string(), "all strategies exhausted after 5 attempts");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VagaError>();
        assert_send_sync::<ApplyError>();
    }
}
