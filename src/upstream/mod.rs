pub mod forwarder;

use std::time::Duration;
use log::warn;
use url::Url;

/// Port a stock Ollama install listens on.
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// API surface offered by the upstream.
///
/// `Native` is plain Ollama: OpenAI-compatible chat completions, but no
/// search-augmented guide route. `OpenAiCompat` is a fronting service that
/// mirrors the chat-completions envelope and may add routes on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiDialect {
    Native,
    OpenAiCompat,
}

/// The resolved upstream endpoint. Built once at startup from configuration
/// and read-only afterwards; request handlers never re-resolve.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    /// Normalized base address: scheme + host + port, no trailing slash,
    /// no `/v1` suffix.
    pub base_url: String,
    pub dialect: ApiDialect,
    /// Model name used when the gateway synthesizes a request itself.
    pub model: String,
    pub chat_timeout: Duration,
    pub guide_timeout: Duration,
}

impl UpstreamTarget {
    pub fn resolve(
        raw_base: &str,
        model: impl Into<String>,
        chat_timeout: Duration,
        guide_timeout: Duration,
    ) -> Self {
        let base_url = normalize_base(raw_base);
        let dialect = detect_dialect(&base_url);
        Self {
            base_url,
            dialect,
            model: model.into(),
            chat_timeout,
            guide_timeout,
        }
    }

    /// True when the enhanced guide-search route is assumed unavailable.
    pub fn native_only(&self) -> bool {
        self.dialect == ApiDialect::Native
    }
}

/// Strip an embedded `/v1` dialect suffix and any trailing slash so route
/// paths can always be appended verbatim.
fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_v1 = trimmed
        .strip_suffix("/v1/")
        .or_else(|| trimmed.strip_suffix("/v1"))
        .unwrap_or(trimmed);
    without_v1.trim_end_matches('/').to_string()
}

/// Port-number heuristic: the default Ollama port means a plain Ollama
/// backend. A non-Ollama service on 11434 would be misclassified; callers
/// that need to override this replace the heuristic here, not at call sites.
fn detect_dialect(base_url: &str) -> ApiDialect {
    let parsed_port = match Url::parse(base_url) {
        Ok(url) => url.port(),
        Err(e) => {
            warn!("upstream base '{}' did not parse as a URL: {}", base_url, e);
            None
        }
    };

    // The suffix check keeps the transform total for schemeless addresses
    // like `localhost:11434`, which the URL parser reads as scheme + path.
    let on_ollama_port = parsed_port == Some(DEFAULT_OLLAMA_PORT)
        || base_url.ends_with(&format!(":{}", DEFAULT_OLLAMA_PORT));

    if on_ollama_port {
        ApiDialect::Native
    } else {
        ApiDialect::OpenAiCompat
    }
}
