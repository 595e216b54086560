//! Conversation engine for plogger.
//!
//! Threads one multi-turn conversation through heterogeneous requests (text,
//! image, structured extraction), dispatches prompt-template hashes against
//! it, turns semi-structured assistant replies into typed data, and builds
//! nearest-neighbour walking routes from the last candidate set.

pub mod classifier;
pub mod context;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod orchestrator;
pub mod spatial;
pub mod types;

pub use classifier::{AdministrativeSuffixClassifier, RegionClassifier};
pub use context::ConversationState;
pub use error::{ChatError, FlowFailure, SpatialError};
pub use extract::ArrayCoercion;
pub use gateway::{ChatGateway, ChatTransport, HttpTransport, LlmReply, LlmRequest, MockTransport};
pub use orchestrator::PloggingOrchestrator;
pub use spatial::SpatialSelector;
pub use types::{
    ErrorPayload, ImageChatOutcome, LocationOutcome, RecommendOutcome, RecommendRequest,
    RouteFields, TrashOutcome, TrashbagOutcome,
};
