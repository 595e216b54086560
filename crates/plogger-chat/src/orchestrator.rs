//! Plogging orchestrator: one method per user-facing flow.
//!
//! Every flow takes the session's [`ConversationState`] by `&mut`, so the
//! caller's lock covers the whole append-send-append sequence. Flows never
//! return `Err`; each failure becomes the `Failed` variant of its outcome.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use plogger_core::config::HashConfig;
use plogger_core::types::{MessageContent, Role};
use plogger_tour::PlaceProvider;

use crate::classifier::{AdministrativeSuffixClassifier, RegionClassifier};
use crate::context::ConversationState;
use crate::error::FlowFailure;
use crate::extract::{
    coerce_json_array, extract_assistant_text, extract_route_fields, extract_tool_argument,
    parse_trash_location, validate_image_url, ArrayCoercion,
};
use crate::gateway::ChatGateway;
use crate::spatial::{render_route_text, SpatialSelector};
use crate::types::{
    ErrorPayload, ImageChatOutcome, LocationOutcome, RecommendOutcome, RecommendRequest,
    TrashOutcome, TrashbagOutcome,
};

/// Tool-call argument naming the place the user picked.
const USER_PICK_ARGUMENT: &str = "user_pick_place";

const ROUTE_REQUEST_TEXT: &str = "플로깅 루트 추천 요청";

const WARN_NOT_JSON: &str = "⚠️ JSON 파싱 실패. 텍스트 응답입니다.";

const AREA_FIELD: &str = "광역시/도";
const SIGUNGU_FIELD: &str = "시/군/구";

pub struct PloggingOrchestrator {
    gateway: ChatGateway,
    places: Arc<dyn PlaceProvider>,
    selector: SpatialSelector,
    classifier: Box<dyn RegionClassifier>,
    hashes: HashConfig,
}

impl PloggingOrchestrator {
    pub fn new(gateway: ChatGateway, places: Arc<dyn PlaceProvider>, hashes: HashConfig) -> Self {
        Self {
            gateway,
            places,
            selector: SpatialSelector::default(),
            classifier: Box::new(AdministrativeSuffixClassifier),
            hashes,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn RegionClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_selector(mut self, selector: SpatialSelector) -> Self {
        self.selector = selector;
        self
    }

    // -------------------------------------------------------------------------
    // Extract-location
    // -------------------------------------------------------------------------

    /// Ask the LLM to pull a region out of free text.
    pub async fn extract_location(
        &self,
        state: &mut ConversationState,
        user_message: &str,
    ) -> LocationOutcome {
        info!(history = state.len(), "Extract-location request");

        let Some(reply) = self
            .gateway
            .send(state, user_message, &self.hashes.location, None)
            .await
        else {
            return FlowFailure::UpstreamUnavailable(
                "⚠️ 지역 추출 API 호출에 실패했습니다.".to_string(),
            )
            .into();
        };
        let Some(content) = extract_assistant_text(&reply) else {
            return FlowFailure::ParseFailure("⚠️ 어시스턴트 응답을 추출할 수 없습니다.".to_string())
                .into();
        };

        let fields = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(fields)) => fields,
            Ok(_) => {
                warn!("Location reply is JSON but not an object");
                return self.unparsed_location(state, content);
            }
            Err(e) => {
                warn!(error = %e, "Location reply is not JSON");
                return self.unparsed_location(state, content);
            }
        };

        let area = fields.get(AREA_FIELD).cloned();
        let sigungu = fields.get(SIGUNGU_FIELD).cloned();
        info!(area = ?area, sigungu = ?sigungu, "Region extracted");
        LocationOutcome::Extracted {
            area,
            sigungu,
            raw_response: content,
            conversation_length: state.len(),
            success: true,
        }
    }

    fn unparsed_location(&self, state: &ConversationState, content: String) -> LocationOutcome {
        LocationOutcome::Unparsed {
            message: content,
            warning: WARN_NOT_JSON.to_string(),
            conversation_length: state.len(),
            success: false,
        }
    }

    // -------------------------------------------------------------------------
    // Recommend-place
    // -------------------------------------------------------------------------

    /// Recommend places for an explicit region, or build a route from the
    /// place the user picked out of the previous recommendation.
    pub async fn recommend_place(
        &self,
        state: &mut ConversationState,
        request: &RecommendRequest,
    ) -> RecommendOutcome {
        let input = request.user_message.trim();
        if self.classifier.is_explicit_region(input) {
            info!(area = %request.area_name, sigungu = %request.sigungu_name, "Recommend-place: region search");
            self.recommend_for_region(state, request).await
        } else {
            info!(history = state.len(), "Recommend-place: route from pick");
            self.recommend_route(state, input).await
        }
    }

    async fn recommend_for_region(
        &self,
        state: &mut ConversationState,
        request: &RecommendRequest,
    ) -> RecommendOutcome {
        let area = &request.area_name;
        let sigungu = &request.sigungu_name;

        let candidates = match self.places.search(area, sigungu).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(area = %area, sigungu = %sigungu, error = %e, "Place search failed");
                return FlowFailure::from(e).into();
            }
        };
        state.set_candidates(candidates.clone());
        info!(count = candidates.len(), "Candidates stored");

        if candidates.is_empty() {
            return RecommendOutcome::NoCandidates {
                message: format!(
                    "⚠️ {} {}에서 추천할 수 있는 플로깅 장소를 찾지 못했습니다.",
                    area, sigungu
                ),
                conversation_length: state.len(),
            };
        }

        let places_text = candidates
            .iter()
            .map(|place| format!("- {}: {}", place.title, place.address))
            .collect::<Vec<_>>()
            .join("\n");

        let Some(reply) = self
            .gateway
            .send(
                state,
                &format!("{} {}의 플로깅 장소 추천 요청", area, sigungu),
                &self.hashes.place,
                Some(json!({ "recommended_place": places_text })),
            )
            .await
        else {
            return FlowFailure::UpstreamUnavailable(
                "⚠️ 장소 추천 API 호출에 실패했습니다.".to_string(),
            )
            .into();
        };

        RecommendOutcome::Recommended {
            recommended_places: candidates,
            chat_reply: extract_assistant_text(&reply),
            area: area.clone(),
            sigungu: sigungu.clone(),
            conversation_length: state.len(),
            success: true,
        }
    }

    async fn recommend_route(&self, state: &mut ConversationState, input: &str) -> RecommendOutcome {
        let pick = self
            .gateway
            .send(state, input, &self.hashes.place, Some(json!({})))
            .await
            .and_then(|reply| extract_tool_argument(&reply, USER_PICK_ARGUMENT))
            .and_then(|value| value.as_str().map(str::to_string))
            .filter(|pick| !pick.is_empty());
        let Some(pick) = pick else {
            return FlowFailure::ParseFailure(
                "❌ user_pick_place 값을 추출하지 못했습니다.".to_string(),
            )
            .into();
        };
        info!(pick = %pick, "User picked a start");

        let route = match self.selector.build_route(&state.candidates(), &pick) {
            Ok(route) => route,
            Err(e) => {
                warn!(pick = %pick, "Picked place is not a candidate");
                return FlowFailure::from(e).into();
            }
        };
        let route_text = render_route_text(&route);

        let Some(reply) = self
            .gateway
            .send(
                state,
                ROUTE_REQUEST_TEXT,
                &self.hashes.route,
                Some(json!({ "recommended_route": route_text })),
            )
            .await
        else {
            return FlowFailure::UpstreamUnavailable(
                "⚠️ 루트 추천 API 호출에 실패했습니다.".to_string(),
            )
            .into();
        };

        RecommendOutcome::Routed {
            chat_reply: extract_assistant_text(&reply),
            user_pick_place: pick,
            recommended_route: route,
            route_info: extract_route_fields(&reply),
            conversation_length: state.len(),
            success: true,
        }
    }

    // -------------------------------------------------------------------------
    // Image-chat
    // -------------------------------------------------------------------------

    pub async fn image_chat(
        &self,
        state: &mut ConversationState,
        user_message: &str,
        image_url: &str,
    ) -> ImageChatOutcome {
        if !validate_image_url(image_url) {
            warn!("Rejected image URL");
            return FlowFailure::ValidationFailure(
                "⚠️ 올바르지 않은 이미지 URL 형식입니다. PNG, JPG, JPEG, GIF, BMP, WEBP 형식만 지원됩니다."
                    .to_string(),
            )
            .into();
        }

        let Some(reply) = self
            .gateway
            .send_with_image(state, &self.hashes.image, user_message, image_url)
            .await
        else {
            return FlowFailure::UpstreamUnavailable(
                "⚠️ 이미지 대화 API 호출에 실패했습니다.".to_string(),
            )
            .into();
        };

        match extract_assistant_text(&reply) {
            Some(chat_reply) => ImageChatOutcome::Replied {
                chat_reply,
                conversation_length: state.len(),
                image_processed: true,
                success: true,
            },
            None => ImageChatOutcome::Failed(
                ErrorPayload::from(FlowFailure::ParseFailure(
                    "⚠️ 어시스턴트 응답을 추출할 수 없습니다.".to_string(),
                ))
                .with_raw_response(reply.body),
            ),
        }
    }

    // -------------------------------------------------------------------------
    // Evaluate-trashbag
    // -------------------------------------------------------------------------

    /// Judge a trash-bag photo. The judgment is returned as the model wrote it.
    ///
    /// The image message is appended before the prompt is sent, so the
    /// history carries both the image turn and the plain prompt turn.
    pub async fn evaluate_trashbag(
        &self,
        state: &mut ConversationState,
        prompt: &str,
        image: &str,
    ) -> TrashbagOutcome {
        info!(image_bytes = image.len(), "Evaluate-trashbag request");
        state.append(Role::User, Some(MessageContent::image_with_text(image, prompt)));

        let Some(reply) = self
            .gateway
            .send(state, prompt, &self.hashes.trashbag, None)
            .await
        else {
            return FlowFailure::UpstreamUnavailable(
                "⚠️ 쓰봉판단 API 호출에 실패했습니다.".to_string(),
            )
            .into();
        };

        match extract_assistant_text(&reply) {
            Some(result) => TrashbagOutcome::Evaluated {
                result,
                success: true,
            },
            None => FlowFailure::ParseFailure("⚠️ 어시스턴트 응답을 추출할 수 없습니다.".to_string())
                .into(),
        }
    }

    // -------------------------------------------------------------------------
    // Trash-location RAG
    // -------------------------------------------------------------------------

    /// Waste-bin locations for a region. Starts from an empty history.
    pub async fn trash_locations(
        &self,
        state: &mut ConversationState,
        area: &str,
        sigungu: &str,
    ) -> TrashOutcome {
        info!(area, sigungu, "Trash-location request");
        state.clear();

        let Some(reply) = self
            .gateway
            .send(
                state,
                &format!("{} {} 지역의 쓰레기통 위치 정보 요청", area, sigungu),
                &self.hashes.rag,
                None,
            )
            .await
        else {
            return FlowFailure::UpstreamUnavailable(
                "⚠️ 쓰레기통 위치 API 호출에 실패했습니다.".to_string(),
            )
            .into();
        };
        let Some(content) = extract_assistant_text(&reply) else {
            return FlowFailure::ParseFailure("⚠️ 어시스턴트 응답을 추출할 수 없습니다.".to_string())
                .into();
        };

        let conversation_length = state.len();
        let unparsed = |warning: &str, message: String| TrashOutcome::Unparsed {
            message,
            warning: warning.to_string(),
            conversation_length,
            success: false,
        };

        let (records, malformed) = match coerce_json_array(&content) {
            ArrayCoercion::Complete(items) => (items, 0),
            ArrayCoercion::Partial { items, skipped } => (items, skipped),
            ArrayCoercion::Failed(reason) => {
                warn!(reason = %reason, "Trash reply could not be parsed");
                return unparsed(WARN_NOT_JSON, content);
            }
        };

        let total = records.len();
        let locations: Vec<_> = records.iter().filter_map(parse_trash_location).collect();
        let skipped = malformed + (total - locations.len());
        info!(count = locations.len(), skipped, "Trash locations extracted");

        TrashOutcome::Located {
            area: area.to_string(),
            sigungu: sigungu.to_string(),
            count: locations.len(),
            trash_locations: locations,
            skipped,
            conversation_length,
            success: true,
        }
    }
}
