use serde::{Deserialize, Serialize};

// =============================================================================
// Conversation messages
// =============================================================================

/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of an image attached to a multimodal message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// `http(s)://` URL or `data:image/...` URI.
    pub url: String,
}

/// One typed part of a multimodal message.
///
/// Serialized in the chat-completion wire shape:
/// `{"type":"image_url","image_url":{"url":..}}` or `{"type":"text","text":..}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    ImageUrl { image_url: ImageUrl },
    Text { text: String },
}

impl ContentPart {
    pub fn image(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

/// Message body: plain text or an ordered list of typed parts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Image part first, text part second. The multimodal prompts upstream
    /// rely on this order.
    pub fn image_with_text(image_url: impl Into<String>, text: impl Into<String>) -> Self {
        MessageContent::Parts(vec![ContentPart::image(image_url), ContentPart::text(text)])
    }

    /// The text of a plain message, or `None` for multimodal content.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(t) => Some(t),
            MessageContent::Parts(_) => None,
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// A single entry of the conversation log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Places and routes
// =============================================================================

/// A tourist attraction returned by the tourism provider.
///
/// Coordinates stay as the strings the upstream sends; use
/// [`Place::coordinates`] before doing arithmetic on them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(rename = "contentid", default)]
    pub content_id: String,
    /// At most 300 characters.
    #[serde(default)]
    pub overview: String,
    #[serde(rename = "mapx", default)]
    pub map_x: String,
    #[serde(rename = "mapy", default)]
    pub map_y: String,
}

impl Place {
    /// Parsed `(mapx, mapy)`, or `None` if either is not a finite number.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let x = parse_coordinate(&self.map_x)?;
        let y = parse_coordinate(&self.map_y)?;
        Some((x, y))
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One stop of a recommended route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    pub title: String,
    pub mapx: String,
    pub mapy: String,
    pub address: String,
}

impl From<&Place> for RouteStop {
    fn from(place: &Place) -> Self {
        Self {
            title: place.title.clone(),
            mapx: place.map_x.clone(),
            mapy: place.map_y.clone(),
            address: place.address.clone(),
        }
    }
}

/// Ordered route: the start first, then up to four nearest waypoints.
pub type RouteSummary = Vec<RouteStop>;

/// A public waste-bin placement extracted from an assistant reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrashLocation {
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn place(x: &str, y: &str) -> Place {
        Place {
            title: "Seoul Forest".to_string(),
            address: "Seongdong-gu".to_string(),
            content_id: "126508".to_string(),
            overview: String::new(),
            map_x: x.to_string(),
            map_y: y.to_string(),
        }
    }

    // ---- Message wire shape ----

    #[test]
    fn test_text_message_serializes_as_string_content() {
        let msg = Message::user("hello");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_multimodal_message_serializes_image_first() {
        let msg = Message::user(MessageContent::image_with_text(
            "https://x.com/a.png",
            "what is this?",
        ));
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            v,
            json!({
                "role": "user",
                "content": [
                    {"type": "image_url", "image_url": {"url": "https://x.com/a.png"}},
                    {"type": "text", "text": "what is this?"}
                ]
            })
        );
    }

    #[test]
    fn test_multimodal_message_deserializes() {
        let raw = r#"{"role":"user","content":[{"type":"image_url","image_url":{"url":"data:image/png;base64,AAAA"}},{"type":"text","text":"bag?"}]}"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(msg.content.as_text().is_none());
        match msg.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0], ContentPart::image("data:image/png;base64,AAAA"));
            }
            other => panic!("expected parts, got {:?}", other),
        }
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    // ---- Place ----

    #[test]
    fn test_place_coordinates_parse() {
        assert_eq!(place("127.04", "37.54").coordinates(), Some((127.04, 37.54)));
        assert_eq!(place(" 1 ", "2").coordinates(), Some((1.0, 2.0)));
    }

    #[test]
    fn test_place_coordinates_invalid() {
        assert_eq!(place("", "37.5").coordinates(), None);
        assert_eq!(place("abc", "37.5").coordinates(), None);
        assert_eq!(place("NaN", "37.5").coordinates(), None);
        assert_eq!(place("127.0", "inf").coordinates(), None);
    }

    #[test]
    fn test_place_uses_upstream_field_names() {
        let v = serde_json::to_value(place("1", "2")).unwrap();
        assert_eq!(v["contentid"], "126508");
        assert_eq!(v["mapx"], "1");
        assert_eq!(v["mapy"], "2");
    }

    #[test]
    fn test_place_missing_fields_default_to_empty() {
        let p: Place = serde_json::from_str(r#"{"title":"Only title"}"#).unwrap();
        assert_eq!(p.title, "Only title");
        assert!(p.address.is_empty());
        assert!(p.coordinates().is_none());
    }

    #[test]
    fn test_route_stop_from_place() {
        let stop = RouteStop::from(&place("1.5", "2.5"));
        assert_eq!(stop.title, "Seoul Forest");
        assert_eq!(stop.mapx, "1.5");
        assert_eq!(stop.mapy, "2.5");
        assert_eq!(stop.address, "Seongdong-gu");
    }
}
