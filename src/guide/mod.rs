use reqwest::header::AUTHORIZATION;
use serde::{ Deserialize, Serialize };
use log::{ info, warn };

use crate::config::{ GatewayConfig, GUIDE_SYSTEM_PROMPT };
use crate::error::GatewayError;
use crate::models::chat::{ extract_reply, ChatMessage, ChatRequest };
use crate::upstream::forwarder::{ Forwarder, ProxiedResponse };
use crate::upstream::UpstreamTarget;

pub const GUIDE_SEARCH_PATH: &str = "/v1/chat/search-guides";
pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// The web-search credential travels under both names; older upstream builds
/// only read the short one.
const WEB_SEARCH_HEADER: &str = "x-web-search-api-key";
const WEB_SEARCH_HEADER_COMPAT: &str = "x-search-api-key";

/// Enhanced-route statuses that mean "capability not present / request shape
/// rejected" rather than a real backend problem.
const FALLBACK_STATUSES: [u16; 3] = [400, 404, 422];

/// UI form submission for guide generation. Converted into one synthesized
/// user message and discarded after the call completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuideParams {
    pub service_type: String,
    #[serde(default)]
    pub tech_stack: Option<String>,
    #[serde(default)]
    pub additional_context: Option<String>,
}

/// Sentinel the UI sends when the user left the stack dropdown untouched.
pub const NO_PREFERENCE: &str = "No preference";

impl GuideParams {
    /// Tech stack with the "No preference" sentinel and blanks normalized
    /// away.
    pub fn effective_tech_stack(&self) -> Option<&str> {
        self.tech_stack
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(NO_PREFERENCE))
    }

    /// One synthesized user message carrying the whole submission.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!(
            "Write an implementation guide for the following service: {}.",
            self.service_type.trim()
        );
        if let Some(stack) = self.effective_tech_stack() {
            prompt.push_str(&format!(" Preferred technology stack: {}.", stack));
        }
        if let Some(context) = self.additional_context.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push_str(&format!(" Additional context: {}", context));
        }
        prompt
    }
}

/// Guide generation with graceful degradation.
///
/// Tries the upstream's web-search-augmented route first and falls back to a
/// plain chat-completions call when the enhanced route is absent or rejects
/// the request shape. Native Ollama targets skip the enhanced attempt
/// entirely. Each attempt gets the full guide timeout budget.
#[derive(Debug, Clone)]
pub struct GuideClient {
    forwarder: Forwarder,
    target: UpstreamTarget,
    upstream_api_key: Option<String>,
    web_search_api_key: Option<String>,
}

impl GuideClient {
    pub fn new(config: &GatewayConfig, forwarder: Forwarder) -> Self {
        Self {
            forwarder,
            target: config.upstream.clone(),
            upstream_api_key: config.upstream_api_key.clone(),
            web_search_api_key: config.web_search_api_key.clone(),
        }
    }

    /// Run the fallback state machine for an inbound chat envelope.
    ///
    /// `Ok` means "relay this response to the caller": a successful reply,
    /// or the upstream's own rejection of a body the gateway could not parse
    /// (the gateway never invents a rejection of its own). Terminal failures
    /// come back as `GatewayError`.
    pub async fn generate(&self, raw_body: String) -> Result<ProxiedResponse, GatewayError> {
        let parsed: Option<ChatRequest> = serde_json::from_str(&raw_body).ok();
        let prompt = parsed.as_ref()
            .and_then(|req| req.latest_user_content())
            .map(str::to_string);

        if self.target.native_only() {
            return match prompt {
                Some(prompt) => self.baseline_call(&prompt).await,
                // Unparsable envelope: relay it and let the upstream reject.
                None => self.forwarder
                    .post_raw(CHAT_COMPLETIONS_PATH, raw_body, self.bearer_headers(), self.target.guide_timeout)
                    .await,
            };
        }

        let resp = self.forwarder
            .post_raw(GUIDE_SEARCH_PATH, raw_body, self.enhanced_headers(), self.target.guide_timeout)
            .await?;

        if resp.is_success() {
            return match extract_reply(&resp.body) {
                Some(_) => Ok(resp),
                None => Err(GatewayError::EmptyReply),
            };
        }

        if FALLBACK_STATUSES.contains(&resp.status) {
            info!("guide search endpoint answered {}; falling back to chat completions", resp.status);
            return match prompt {
                Some(prompt) => self.baseline_call(&prompt).await,
                None => {
                    warn!("guide request body not parsable; relaying enhanced rejection");
                    Ok(resp)
                }
            };
        }

        Err(GatewayError::Upstream {
            status: resp.status,
            detail: resp.body,
        })
    }

    /// Library entry: synthesize the envelope from form parameters and
    /// return the reply text.
    pub async fn generate_from_params(&self, params: &GuideParams) -> Result<String, GatewayError> {
        let req = ChatRequest::new(
            self.target.model.clone(),
            vec![ChatMessage::user(params.to_prompt())],
        );
        let body = serde_json::to_string(&req)
            .map_err(|e| GatewayError::Config(format!("failed to encode guide request: {}", e)))?;

        let resp = self.generate(body).await?;
        extract_reply(&resp.body).ok_or(GatewayError::EmptyReply)
    }

    async fn baseline_call(&self, prompt: &str) -> Result<ProxiedResponse, GatewayError> {
        let req = ChatRequest::new(self.target.model.clone(), vec![
            ChatMessage::system(GUIDE_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ]);

        let resp = self.forwarder
            .post_json(CHAT_COMPLETIONS_PATH, &req, self.bearer_headers(), self.target.guide_timeout)
            .await?;

        if !resp.is_success() {
            return Err(GatewayError::Upstream {
                status: resp.status,
                detail: resp.body,
            });
        }

        match extract_reply(&resp.body) {
            Some(_) => Ok(resp),
            None => Err(GatewayError::EmptyReply),
        }
    }

    fn bearer_headers(&self) -> Option<Vec<(String, String)>> {
        self.upstream_api_key.as_ref().map(|key| {
            vec![(AUTHORIZATION.to_string(), format!("Bearer {}", key))]
        })
    }

    fn enhanced_headers(&self) -> Option<Vec<(String, String)>> {
        let mut headers = self.bearer_headers().unwrap_or_default();
        if let Some(key) = &self.web_search_api_key {
            headers.push((WEB_SEARCH_HEADER.to_string(), key.clone()));
            headers.push((WEB_SEARCH_HEADER_COMPAT.to_string(), key.clone()));
        }
        if headers.is_empty() {
            None
        } else {
            Some(headers)
        }
    }
}
