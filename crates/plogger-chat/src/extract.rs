//! Extraction of typed data from chat-completion replies.
//!
//! Every function here is pure and never fails loudly: malformed input
//! degrades to `None` (or a tagged [`ArrayCoercion`]) with a logged reason.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use plogger_core::types::TrashLocation;

use crate::gateway::LlmReply;
use crate::types::RouteFields;

// =============================================================================
// Completion wire types
// =============================================================================

/// Chat-completion response body. Every field is optional upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    /// Kept raw so a malformed route never hides the choices.
    #[serde(default)]
    pub route: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub function: Option<ToolFunction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolFunction {
    #[serde(default)]
    pub name: Option<String>,
    /// Usually a JSON-encoded string; some gateways send an object.
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl ChatCompletion {
    /// Message of the first choice, if any.
    pub fn first_message(&self) -> Option<&ChoiceMessage> {
        self.choices
            .as_ref()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.message.as_ref())
    }

    pub fn has_choices(&self) -> bool {
        self.choices.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Decode a successful reply body. Non-200 replies and undecodable bodies
/// yield `None`.
pub fn parse_completion(reply: &LlmReply) -> Option<ChatCompletion> {
    if !reply.is_success() {
        debug!(status = reply.status, "Ignoring non-success reply");
        return None;
    }
    match serde_json::from_str::<ChatCompletion>(&reply.body) {
        Ok(completion) => Some(completion),
        Err(e) => {
            warn!(error = %e, "Failed to decode chat completion");
            None
        }
    }
}

// =============================================================================
// Reply extractors
// =============================================================================

/// Text content of the first choice.
pub fn extract_assistant_text(reply: &LlmReply) -> Option<String> {
    parse_completion(reply)?.first_message()?.content.clone()
}

/// Named argument of the first tool call of the first choice.
pub fn extract_tool_argument(reply: &LlmReply, argument: &str) -> Option<Value> {
    let completion = parse_completion(reply)?;
    let call = completion.first_message()?.tool_calls.as_ref()?.first()?;
    let arguments = call.function.as_ref()?.arguments.as_ref()?;

    let parsed = match arguments {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Tool-call arguments are not valid JSON");
                return None;
            }
        },
        other => other.clone(),
    };

    match parsed.get(argument) {
        Some(Value::Null) | None => {
            debug!(argument, "Tool call has no such argument");
            None
        }
        Some(value) => Some(value.clone()),
    }
}

/// Top-level `route` object of the reply, if present.
pub fn extract_route_fields(reply: &LlmReply) -> Option<RouteFields> {
    let route = parse_completion(reply)?.route?;
    match serde_json::from_value::<RouteFields>(route) {
        Ok(fields) => Some(fields),
        Err(e) => {
            warn!(error = %e, "Ignoring malformed route object");
            None
        }
    }
}

// =============================================================================
// Image URL validation
// =============================================================================

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".webp"];

/// Accept `data:image/` URIs, or `http(s)://` URLs ending in a known image
/// extension (case-insensitive).
pub fn validate_image_url(url: &str) -> bool {
    if url.starts_with("data:image/") {
        return true;
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return false;
    }
    let lower = url.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// =============================================================================
// JSON array coercion
// =============================================================================

/// Non-greedy brace scan. Lossy: an object with nested braces is cut at the
/// first closing brace and then fails to parse.
static BRACE_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*?\}").expect("Invalid brace regex"));

/// Result of [`coerce_json_array`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayCoercion {
    /// Every record parsed.
    Complete(Vec<Value>),
    /// Some brace-delimited records were malformed and skipped.
    Partial { items: Vec<Value>, skipped: usize },
    /// Nothing usable could be parsed.
    Failed(String),
}

impl ArrayCoercion {
    /// Parsed records and how many were skipped, for the two success cases.
    pub fn into_items(self) -> Option<(Vec<Value>, usize)> {
        match self {
            ArrayCoercion::Complete(items) => Some((items, 0)),
            ArrayCoercion::Partial { items, skipped } => Some((items, skipped)),
            ArrayCoercion::Failed(_) => None,
        }
    }
}

/// Parse an assistant reply that should be a JSON array of records.
///
/// Replies often list objects without the enclosing brackets. When the
/// trimmed text does not start with `[`, every `{...}` block is parsed on its
/// own and malformed blocks are skipped. Text with no blocks at all is an
/// empty list.
pub fn coerce_json_array(text: &str) -> ArrayCoercion {
    let trimmed = text.trim();

    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(items) => ArrayCoercion::Complete(items),
            Err(e) => ArrayCoercion::Failed(e.to_string()),
        };
    }

    let blocks: Vec<&str> = BRACE_OBJECT_RE
        .find_iter(trimmed)
        .map(|m| m.as_str())
        .collect();

    if blocks.is_empty() {
        debug!("No JSON objects in reply");
        return ArrayCoercion::Complete(Vec::new());
    }

    let mut items = Vec::with_capacity(blocks.len());
    let mut skipped = 0;
    for block in blocks {
        match serde_json::from_str::<Value>(block) {
            Ok(value) => items.push(value),
            Err(e) => {
                warn!(error = %e, "Skipping malformed JSON object");
                skipped += 1;
            }
        }
    }

    if items.is_empty() {
        ArrayCoercion::Failed(format!("all {} JSON objects were malformed", skipped))
    } else if skipped == 0 {
        ArrayCoercion::Complete(items)
    } else {
        ArrayCoercion::Partial { items, skipped }
    }
}

// =============================================================================
// Trash locations
// =============================================================================

const TRASH_NAME_KEY: &str = "설치장소명";
const TRASH_LAT_KEY: &str = "위도";
const TRASH_LNG_KEY: &str = "경도";
const TRASH_ADDRESS_KEY: &str = "소재지도로명주소";

/// Number or numeric string, finite only.
fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Read one waste-bin record. `None` if lat/lng are missing or unparsable.
pub fn parse_trash_location(record: &Value) -> Option<TrashLocation> {
    let lat = coerce_f64(record.get(TRASH_LAT_KEY));
    let lng = coerce_f64(record.get(TRASH_LNG_KEY));
    let (Some(lat), Some(lng)) = (lat, lng) else {
        warn!(record = %record, "Dropping trash location with unparsable coordinates");
        return None;
    };

    let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);
    Some(TrashLocation {
        name: text(TRASH_NAME_KEY),
        lat,
        lng,
        address: text(TRASH_ADDRESS_KEY),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(body: Value) -> LlmReply {
        LlmReply::new(200, body.to_string())
    }

    // ---- extract_assistant_text ----

    #[test]
    fn test_text_from_first_choice() {
        let reply = ok(json!({"choices": [
            {"message": {"content": "first"}},
            {"message": {"content": "second"}}
        ]}));
        assert_eq!(extract_assistant_text(&reply).as_deref(), Some("first"));
    }

    #[test]
    fn test_text_absent_without_choices() {
        assert!(extract_assistant_text(&ok(json!({"id": "x"}))).is_none());
        assert!(extract_assistant_text(&ok(json!({"choices": []}))).is_none());
        assert!(extract_assistant_text(&ok(json!({"choices": null}))).is_none());
    }

    #[test]
    fn test_text_absent_on_non_200() {
        let reply = LlmReply::new(500, json!({"choices": [{"message": {"content": "x"}}]}).to_string());
        assert!(extract_assistant_text(&reply).is_none());
    }

    #[test]
    fn test_text_absent_on_garbage_body() {
        assert!(extract_assistant_text(&LlmReply::new(200, "<html>oops</html>")).is_none());
    }

    #[test]
    fn test_text_absent_when_content_null() {
        let reply = ok(json!({"choices": [{"message": {"content": null, "tool_calls": []}}]}));
        assert!(extract_assistant_text(&reply).is_none());
    }

    // ---- extract_tool_argument ----

    fn tool_reply(arguments: Value) -> LlmReply {
        ok(json!({"choices": [{"message": {
            "content": null,
            "tool_calls": [{"id": "call_1", "type": "function",
                "function": {"name": "pick_place", "arguments": arguments}}]
        }}]}))
    }

    #[test]
    fn test_tool_argument_from_string_arguments() {
        let reply = tool_reply(json!("{\"user_pick_place\": \"경복궁\"}"));
        assert_eq!(
            extract_tool_argument(&reply, "user_pick_place"),
            Some(json!("경복궁"))
        );
    }

    #[test]
    fn test_tool_argument_from_object_arguments() {
        let reply = tool_reply(json!({"user_pick_place": "경복궁"}));
        assert_eq!(
            extract_tool_argument(&reply, "user_pick_place"),
            Some(json!("경복궁"))
        );
    }

    #[test]
    fn test_tool_argument_missing_name() {
        let reply = tool_reply(json!("{\"other\": 1}"));
        assert!(extract_tool_argument(&reply, "user_pick_place").is_none());
    }

    #[test]
    fn test_tool_argument_malformed_arguments() {
        let reply = tool_reply(json!("{user_pick_place: "));
        assert!(extract_tool_argument(&reply, "user_pick_place").is_none());
    }

    #[test]
    fn test_tool_argument_no_tool_calls() {
        let reply = ok(json!({"choices": [{"message": {"content": "plain text"}}]}));
        assert!(extract_tool_argument(&reply, "user_pick_place").is_none());

        let reply = ok(json!({"choices": [{"message": {"content": "x", "tool_calls": []}}]}));
        assert!(extract_tool_argument(&reply, "user_pick_place").is_none());
    }

    // ---- extract_route_fields ----

    #[test]
    fn test_route_fields_present() {
        let reply = ok(json!({
            "choices": [{"message": {"content": "route"}}],
            "route": {"start": "A", "end": "E", "distance": 1200, "time": "20분"}
        }));
        let route = extract_route_fields(&reply).unwrap();
        assert_eq!(route.start, Some(json!("A")));
        assert_eq!(route.distance, Some(json!(1200)));
        assert_eq!(route.time, Some(json!("20분")));
    }

    #[test]
    fn test_route_fields_absent() {
        assert!(extract_route_fields(&ok(json!({"choices": []}))).is_none());
    }

    #[test]
    fn test_malformed_route_does_not_hide_text() {
        let reply = ok(json!({
            "choices": [{"message": {"content": "route"}}],
            "route": "not an object"
        }));
        assert!(extract_route_fields(&reply).is_none());
        assert_eq!(extract_assistant_text(&reply).as_deref(), Some("route"));
    }

    #[test]
    fn test_route_fields_partial() {
        let route = extract_route_fields(&ok(json!({"route": {"start": "A"}}))).unwrap();
        assert_eq!(route.start, Some(json!("A")));
        assert!(route.end.is_none());
    }

    // ---- validate_image_url ----

    #[test]
    fn test_validate_image_url() {
        assert!(validate_image_url("data:image/png;base64,AAAA"));
        assert!(!validate_image_url("ftp://x.png"));
        assert!(validate_image_url("https://x.com/a.png"));
        assert!(!validate_image_url("https://x.com/a"));
    }

    #[test]
    fn test_validate_image_url_extensions_case_insensitive() {
        assert!(validate_image_url("http://x.com/photo.JPG"));
        assert!(validate_image_url("https://x.com/photo.Jpeg"));
        assert!(validate_image_url("https://x.com/a.webp"));
        assert!(validate_image_url("https://x.com/a.bmp"));
        assert!(validate_image_url("https://x.com/a.gif"));
        assert!(!validate_image_url("https://x.com/a.svg"));
    }

    #[test]
    fn test_validate_image_url_data_uri_without_extension() {
        assert!(validate_image_url("data:image/jpeg;base64,/9j/4AAQ"));
        assert!(!validate_image_url("data:text/plain;base64,AAAA"));
    }

    #[test]
    fn test_validate_image_url_scheme_must_prefix() {
        assert!(!validate_image_url(" https://x.com/a.png"));
        assert!(!validate_image_url("x.com/a.png"));
        assert!(!validate_image_url(""));
    }

    // ---- coerce_json_array ----

    #[test]
    fn test_coerce_bracketless_objects() {
        assert_eq!(
            coerce_json_array(r#"{"a":1}{"b":2}"#),
            ArrayCoercion::Complete(vec![json!({"a": 1}), json!({"b": 2})])
        );
    }

    #[test]
    fn test_coerce_comma_separated_multiline_objects() {
        let text = "Here you go:\n{\n  \"a\": 1\n},\n{\n  \"b\": 2\n}\nThanks";
        assert_eq!(
            coerce_json_array(text),
            ArrayCoercion::Complete(vec![json!({"a": 1}), json!({"b": 2})])
        );
    }

    #[test]
    fn test_coerce_real_array() {
        assert_eq!(
            coerce_json_array("  [{\"a\":1}] "),
            ArrayCoercion::Complete(vec![json!({"a": 1})])
        );
    }

    #[test]
    fn test_coerce_broken_array() {
        assert!(matches!(
            coerce_json_array("[{\"a\":1},"),
            ArrayCoercion::Failed(_)
        ));
    }

    #[test]
    fn test_coerce_skips_malformed_objects() {
        let text = r#"{"a":1} {"b": oops} {"c":3}"#;
        assert_eq!(
            coerce_json_array(text),
            ArrayCoercion::Partial {
                items: vec![json!({"a": 1}), json!({"c": 3})],
                skipped: 1
            }
        );
    }

    #[test]
    fn test_coerce_nested_braces_are_lossy() {
        let result = coerce_json_array(r#"{"a":{"b":1}}"#);
        assert!(matches!(result, ArrayCoercion::Failed(_)));
    }

    #[test]
    fn test_coerce_plain_text_is_empty() {
        assert_eq!(
            coerce_json_array("해당 지역 정보가 없습니다."),
            ArrayCoercion::Complete(vec![])
        );
    }

    #[test]
    fn test_coerce_scalar_json_is_empty() {
        assert_eq!(coerce_json_array("42"), ArrayCoercion::Complete(vec![]));
        assert_eq!(
            coerce_json_array("\"just a string\""),
            ArrayCoercion::Complete(vec![])
        );
    }

    #[test]
    fn test_into_items() {
        assert_eq!(
            ArrayCoercion::Partial {
                items: vec![json!(1)],
                skipped: 2
            }
            .into_items(),
            Some((vec![json!(1)], 2))
        );
        assert!(ArrayCoercion::Failed("x".into()).into_items().is_none());
    }

    // ---- parse_trash_location ----

    #[test]
    fn test_trash_location_string_coordinates() {
        let record = json!({
            "설치장소명": "구로역 앞",
            "위도": "37.5030",
            "경도": "126.8820",
            "소재지도로명주소": "서울 구로구 구로중앙로"
        });
        let loc = parse_trash_location(&record).unwrap();
        assert_eq!(loc.name.as_deref(), Some("구로역 앞"));
        assert!((loc.lat - 37.503).abs() < 1e-9);
        assert!((loc.lng - 126.882).abs() < 1e-9);
        assert_eq!(loc.address.as_deref(), Some("서울 구로구 구로중앙로"));
    }

    #[test]
    fn test_trash_location_numeric_coordinates() {
        let loc = parse_trash_location(&json!({"위도": 37.5, "경도": 127})).unwrap();
        assert_eq!((loc.lat, loc.lng), (37.5, 127.0));
        assert!(loc.name.is_none());
    }

    #[test]
    fn test_trash_location_bad_coordinates_dropped() {
        assert!(parse_trash_location(&json!({"위도": "north", "경도": "127"})).is_none());
        assert!(parse_trash_location(&json!({"위도": "37.5"})).is_none());
        assert!(parse_trash_location(&json!({"위도": null, "경도": "127"})).is_none());
        assert!(parse_trash_location(&json!("not an object")).is_none());
    }
}
