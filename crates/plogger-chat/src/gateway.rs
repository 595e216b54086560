//! Outbound calls to the LLM gateway.
//!
//! - `ChatTransport` is the seam between the conversation engine and the wire.
//! - `HttpTransport` talks to the real gateway with `reqwest`.
//! - `MockTransport` replays scripted replies and records every request.
//! - `ChatGateway` threads a [`ConversationState`] through each call.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use plogger_core::config::LaasConfig;
use plogger_core::types::{Message, MessageContent, Role};

use crate::context::ConversationState;
use crate::error::ChatError;
use crate::extract::ChatCompletion;

/// Request body sent to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmRequest {
    /// Opaque prompt-template identifier.
    pub hash: String,
    /// Serialized as `null` when absent.
    pub params: Option<Value>,
    pub messages: Vec<Message>,
}

/// Raw HTTP reply: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmReply {
    pub status: u16,
    pub body: String,
}

impl LlmReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Wire-level access to the LLM gateway.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// POST a chat-completion request. Any HTTP response is `Ok`; only
    /// connection-level failures are `Err`.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmReply, ChatError>;

    /// POST a similarity search against a document collection.
    async fn search_documents(
        &self,
        collection: &str,
        text: &str,
        limit: u32,
        offset: u32,
    ) -> Result<LlmReply, ChatError>;
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// `reqwest` transport configured from the `[laas]` config section.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: LaasConfig,
}

impl HttpTransport {
    pub fn new(config: LaasConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn auth_headers(&self) -> Result<HeaderMap, ChatError> {
        let mut headers = HeaderMap::new();
        let value = |raw: &str| {
            HeaderValue::from_str(raw)
                .map_err(|e| ChatError::Transport(format!("invalid header value: {}", e)))
        };
        // Header names are case-insensitive; `http` stores them lowercased.
        headers.insert(HeaderName::from_static("project"), value(&self.config.project_code)?);
        headers.insert(HeaderName::from_static("apikey"), value(&self.config.api_key)?);
        Ok(headers)
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/api/document/{}/similar/text",
            self.config.documents_base_url.trim_end_matches('/'),
            collection
        )
    }

    async fn into_reply(response: reqwest::Response) -> Result<LlmReply, ChatError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(LlmReply { status, body })
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmReply, ChatError> {
        if self.config.chat_url.is_empty() {
            return Err(ChatError::Transport("LAAS_URL is not configured".to_string()));
        }
        debug!(hash = %request.hash, messages = request.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&self.config.chat_url)
            .headers(self.auth_headers()?)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .json(request)
            .send()
            .await?;
        Self::into_reply(response).await
    }

    async fn search_documents(
        &self,
        collection: &str,
        text: &str,
        limit: u32,
        offset: u32,
    ) -> Result<LlmReply, ChatError> {
        let response = self
            .client
            .post(self.documents_url(collection))
            .headers(self.auth_headers()?)
            .json(&json!({ "text": text, "limit": limit, "offset": offset }))
            .send()
            .await?;
        Self::into_reply(response).await
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Transport that pops scripted replies in FIFO order.
///
/// Both `complete` and `search_documents` draw from the same queue. An empty
/// queue yields a transport error, so unscripted calls behave like an
/// unreachable gateway.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<LlmReply, String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: LlmReply) {
        self.push(Ok(reply));
    }

    /// Queue a 200 reply whose first choice carries `content`.
    pub fn push_completion(&self, content: &str) {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        });
        self.push_reply(LlmReply::new(200, body.to_string()));
    }

    /// Queue a 200 reply whose first choice is a tool call.
    pub fn push_tool_call(&self, function: &str, arguments: Value) {
        let body = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_0",
                    "type": "function",
                    "function": {"name": function, "arguments": arguments.to_string()}
                }]
            }}]
        });
        self.push_reply(LlmReply::new(200, body.to_string()));
    }

    /// Queue a connection-level failure.
    pub fn push_error(&self, message: &str) {
        self.push(Err(message.to_string()));
    }

    /// Every chat request received so far.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, entry: Result<LlmReply, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(entry);
        }
    }

    fn pop(&self) -> Result<LlmReply, ChatError> {
        let next = self
            .replies
            .lock()
            .map_err(|e| ChatError::Transport(format!("mock lock poisoned: {}", e)))?
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ChatError::Transport(message)),
            None => Err(ChatError::Transport("no scripted reply".to_string())),
        }
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmReply, ChatError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.pop()
    }

    async fn search_documents(
        &self,
        _collection: &str,
        _text: &str,
        _limit: u32,
        _offset: u32,
    ) -> Result<LlmReply, ChatError> {
        self.pop()
    }
}

// ---------------------------------------------------------------------------
// ChatGateway
// ---------------------------------------------------------------------------

/// Sends conversation turns and records the assistant's answers.
///
/// Every method returns `None` for "no answer": transport failure, non-200
/// status, undecodable body, or no choices. Failures are logged, never
/// propagated.
#[derive(Clone)]
pub struct ChatGateway {
    transport: Arc<dyn ChatTransport>,
}

impl ChatGateway {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Append `user_text`, send the whole history under `hash`, append the
    /// assistant reply.
    pub async fn send(
        &self,
        state: &mut ConversationState,
        user_text: &str,
        hash: &str,
        params: Option<Value>,
    ) -> Option<LlmReply> {
        state.append(Role::User, Some(MessageContent::from(user_text)));
        self.dispatch(state, hash, params).await
    }

    /// Append an image-then-text message and send it with empty params.
    pub async fn send_with_image(
        &self,
        state: &mut ConversationState,
        hash: &str,
        user_text: &str,
        image_url: &str,
    ) -> Option<LlmReply> {
        state.append(
            Role::User,
            Some(MessageContent::image_with_text(image_url, user_text)),
        );
        self.dispatch(state, hash, Some(json!({}))).await
    }

    async fn dispatch(
        &self,
        state: &mut ConversationState,
        hash: &str,
        params: Option<Value>,
    ) -> Option<LlmReply> {
        let request = LlmRequest {
            hash: hash.to_string(),
            params,
            messages: state.history(),
        };

        let reply = match self.transport.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(hash, error = %e, "LLM request failed");
                return None;
            }
        };

        if !reply.is_success() {
            warn!(hash, status = reply.status, body = %reply.body, "LLM gateway returned an error");
            return None;
        }

        let completion = match serde_json::from_str::<ChatCompletion>(&reply.body) {
            Ok(completion) => completion,
            Err(e) => {
                warn!(hash, error = %e, "Failed to decode LLM reply");
                return None;
            }
        };

        if !completion.has_choices() {
            warn!(hash, "No assistant message received");
            return None;
        }

        let content = completion
            .first_message()
            .and_then(|message| message.content.clone())
            .map(MessageContent::from);
        state.append(Role::Assistant, content);
        info!(hash, history = state.len(), "LLM turn completed");
        Some(reply)
    }

    /// Similarity search against a document collection. Returns the raw
    /// JSON result.
    pub async fn similar_documents(
        &self,
        collection: &str,
        text: &str,
        limit: u32,
        offset: u32,
    ) -> Option<Value> {
        let reply = match self
            .transport
            .search_documents(collection, text, limit, offset)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(collection, error = %e, "Document search failed");
                return None;
            }
        };
        if !reply.is_success() {
            warn!(collection, status = reply.status, "Document search returned an error");
            return None;
        }
        serde_json::from_str::<Value>(&reply.body)
            .map_err(|e| warn!(collection, error = %e, "Failed to decode document search result"))
            .ok()
    }
}
