//! Flow inputs and outcomes.
//!
//! Each outcome enum is untagged: the variant's fields are the JSON body
//! returned to the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use plogger_core::types::{Place, RouteSummary, TrashLocation};

use crate::error::FlowFailure;

// =============================================================================
// Inputs
// =============================================================================

/// Input of the recommend-place flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub user_message: String,
    pub area_name: String,
    pub sigungu_name: String,
}

/// Top-level `route` object some route replies carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteFields {
    #[serde(default)]
    pub start: Option<Value>,
    #[serde(default)]
    pub end: Option<Value>,
    #[serde(default)]
    pub distance: Option<Value>,
    #[serde(default)]
    pub time: Option<Value>,
}

// =============================================================================
// Error payload
// =============================================================================

/// Body of every failed flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ErrorPayload {
    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }
}

impl From<FlowFailure> for ErrorPayload {
    fn from(failure: FlowFailure) -> Self {
        Self {
            error: failure.to_string(),
            success: false,
            raw_response: None,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocationOutcome {
    /// Region fields exactly as the model returned them; absent keys are null.
    Extracted {
        area: Option<Value>,
        sigungu: Option<Value>,
        raw_response: String,
        conversation_length: usize,
        success: bool,
    },
    /// Reply was not JSON; the raw text is returned with a warning.
    Unparsed {
        message: String,
        warning: String,
        conversation_length: usize,
        success: bool,
    },
    Failed(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecommendOutcome {
    /// Direct branch: candidates found and a recommendation requested.
    Recommended {
        recommended_places: Vec<Place>,
        chat_reply: Option<String>,
        area: String,
        sigungu: String,
        conversation_length: usize,
        success: bool,
    },
    /// Indirect branch: the user picked a start and a route was built.
    Routed {
        chat_reply: Option<String>,
        user_pick_place: String,
        recommended_route: RouteSummary,
        #[serde(skip_serializing_if = "Option::is_none")]
        route_info: Option<RouteFields>,
        conversation_length: usize,
        success: bool,
    },
    /// The region has no attractions. Not an error.
    NoCandidates {
        message: String,
        conversation_length: usize,
    },
    Failed(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ImageChatOutcome {
    Replied {
        chat_reply: String,
        conversation_length: usize,
        image_processed: bool,
        success: bool,
    },
    Failed(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TrashbagOutcome {
    Evaluated { result: String, success: bool },
    Failed(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrashOutcome {
    Located {
        area: String,
        sigungu: String,
        trash_locations: Vec<TrashLocation>,
        count: usize,
        /// Records dropped for malformed JSON or unparsable coordinates.
        skipped: usize,
        conversation_length: usize,
        success: bool,
    },
    Unparsed {
        message: String,
        warning: String,
        conversation_length: usize,
        success: bool,
    },
    Failed(ErrorPayload),
}

macro_rules! impl_from_failure {
    ($($outcome:ident),+) => {
        $(
            impl From<FlowFailure> for $outcome {
                fn from(failure: FlowFailure) -> Self {
                    $outcome::Failed(failure.into())
                }
            }
        )+
    };
}

impl_from_failure!(
    LocationOutcome,
    RecommendOutcome,
    ImageChatOutcome,
    TrashbagOutcome,
    TrashOutcome
);
