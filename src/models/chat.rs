use serde::{ Deserialize, Serialize };

/// One turn of a conversation in the OpenAI-style envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Request envelope for `/v1/chat/completions` and the enhanced guide route.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self { model: model.into(), messages, stream: false }
    }

    /// The content of the most recent user message, if any. The fallback
    /// controller uses this to re-synthesize a baseline request.
    pub fn latest_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Response envelope. Only `choices[0].message.content` is ever read; the
/// rest of the upstream payload is relayed untouched by the proxy routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    /// Trimmed assistant reply, or None when the envelope carries no usable
    /// content.
    pub fn reply(&self) -> Option<String> {
        let content = self.choices.first()?.message.content.trim();
        if content.is_empty() {
            return None;
        }
        Some(content.to_string())
    }
}

/// Extract the assistant reply from a raw upstream body.
pub fn extract_reply(body: &str) -> Option<String> {
    serde_json::from_str::<ChatCompletionResponse>(body)
        .ok()
        .and_then(|r| r.reply())
}
