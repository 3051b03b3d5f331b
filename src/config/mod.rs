use std::time::Duration;

use crate::cli::Args;
use crate::error::GatewayError;
use crate::server::cors::CorsPolicy;
use crate::upstream::UpstreamTarget;

/// System prompt the chat helper prepends when the caller has not configured
/// one. The proxy routes relay message content untouched either way.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the friendly assistant for this site. \
Answer briefly and helpfully about the company and its services. Be professional but warm. \
If the user asks about pricing or a quote, suggest the request form on the site. \
Keep replies concise and do not invent services that are not offered.";

/// Baseline system instruction for guide generation when the enhanced
/// search-augmented route is unavailable.
pub const GUIDE_SYSTEM_PROMPT: &str = "You are an expert implementation guide assistant. \
Write a single, complete implementation guide with clear headings and numbered steps. Use markdown.";

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

/// Everything the gateway needs, built once from `Args` at process start and
/// passed explicitly to each component. Handlers never read the environment.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub upstream: UpstreamTarget,
    pub cors: CorsPolicy,
    pub server_addr: String,
    pub upstream_api_key: Option<String>,
    pub web_search_api_key: Option<String>,
    pub system_prompt: String,
    pub tls: Option<TlsConfig>,
}

impl GatewayConfig {
    pub fn from_args(args: &Args) -> Result<Self, GatewayError> {
        let tls = match (args.enable_tls, &args.tls_cert_path, &args.tls_key_path) {
            (false, _, _) => None,
            (true, Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: cert.clone(),
                key_path: key.clone(),
            }),
            (true, _, _) => {
                return Err(GatewayError::Config(
                    "--enable-tls requires both --tls-cert-path and --tls-key-path".to_string(),
                ));
            }
        };

        let upstream = UpstreamTarget::resolve(
            &args.upstream_url,
            args.model.clone(),
            Duration::from_secs(args.chat_timeout_secs),
            Duration::from_secs(args.guide_timeout_secs),
        );

        Ok(Self {
            upstream,
            cors: CorsPolicy::from_list(&args.allowed_origins),
            server_addr: args.server_addr.clone(),
            upstream_api_key: args.upstream_api_key.clone(),
            web_search_api_key: args.web_search_api_key.clone(),
            system_prompt: args.system_prompt.clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            tls,
        })
    }
}
