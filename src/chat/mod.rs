use reqwest::header::AUTHORIZATION;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::models::chat::{ extract_reply, ChatMessage, ChatRequest };
use crate::upstream::forwarder::Forwarder;
use crate::upstream::UpstreamTarget;

/// Multi-turn chat against the upstream's chat-completions route.
///
/// Prepends the configured system prompt so the model answers in the
/// product's voice, then extracts the assistant reply. This is the library
/// counterpart of the transparent `/v1/chat/completions` proxy route, which
/// never touches message content.
#[derive(Debug, Clone)]
pub struct ChatService {
    forwarder: Forwarder,
    target: UpstreamTarget,
    api_key: Option<String>,
    system_prompt: String,
}

impl ChatService {
    pub fn new(config: &GatewayConfig, forwarder: Forwarder) -> Self {
        Self {
            forwarder,
            target: config.upstream.clone(),
            api_key: config.upstream_api_key.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Send the full message history and return the trimmed assistant reply.
    pub async fn send_chat(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError> {
        let mut with_system = Vec::with_capacity(messages.len() + 1);
        with_system.push(ChatMessage::system(self.system_prompt.clone()));
        with_system.extend(messages);

        let req = ChatRequest::new(self.target.model.clone(), with_system);
        let headers = self.api_key.as_ref().map(|key| {
            vec![(AUTHORIZATION.to_string(), format!("Bearer {}", key))]
        });

        let resp = self.forwarder
            .post_json("/v1/chat/completions", &req, headers, self.target.chat_timeout)
            .await?;

        if !resp.is_success() {
            return Err(GatewayError::Upstream {
                status: resp.status,
                detail: resp.body,
            });
        }

        extract_reply(&resp.body).ok_or(GatewayError::EmptyReply)
    }
}
