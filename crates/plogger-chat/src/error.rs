//! Error types for the conversation engine.

use plogger_core::error::PloggerError;

/// Errors from the LLM transport and history persistence.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("LLM gateway returned status {status}")]
    Status { status: u16 },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("failed to persist history: {0}")]
    Persist(String),
    #[error("failed to restore history: {0}")]
    Restore(String),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

impl From<ChatError> for PloggerError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Persist(_) | ChatError::Restore(_) => {
                PloggerError::Serialization(err.to_string())
            }
            _ => PloggerError::Upstream(err.to_string()),
        }
    }
}

/// Route building failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpatialError {
    #[error("place '{0}' is not in the candidate list")]
    StartNotFound(String),
}

/// Typed failure of a user-facing flow.
///
/// Every variant carries the message shown to the client; flows convert it
/// into an error payload instead of propagating it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowFailure {
    /// Transport failure or non-success status from an upstream service.
    #[error("{0}")]
    UpstreamUnavailable(String),
    /// Assistant reply did not have the expected structure.
    #[error("{0}")]
    ParseFailure(String),
    /// A referenced place or region does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Request rejected before any network call.
    #[error("{0}")]
    ValidationFailure(String),
}

impl FlowFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            FlowFailure::UpstreamUnavailable(_) => "upstream_unavailable",
            FlowFailure::ParseFailure(_) => "parse_failure",
            FlowFailure::NotFound(_) => "not_found",
            FlowFailure::ValidationFailure(_) => "validation_failure",
        }
    }
}

impl From<SpatialError> for FlowFailure {
    fn from(err: SpatialError) -> Self {
        FlowFailure::NotFound(err.to_string())
    }
}

impl From<plogger_tour::TourError> for FlowFailure {
    fn from(err: plogger_tour::TourError) -> Self {
        if err.is_not_found() {
            FlowFailure::NotFound(err.to_string())
        } else {
            FlowFailure::UpstreamUnavailable(format!("tourism search failed: {}", err))
        }
    }
}
