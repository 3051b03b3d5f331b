use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Upstream Args ---
    /// Base URL of the model server to forward to (e.g., http://127.0.0.1:11434 for Ollama)
    #[arg(long, env = "OLLAMA_URL", default_value = "http://127.0.0.1:11434")]
    pub upstream_url: String,

    /// Model name used when the gateway synthesizes a chat request itself (guide fallback)
    #[arg(long, env = "OLLAMA_MODEL", default_value = "mistral:latest")]
    pub model: String,

    /// Optional bearer credential forwarded to the upstream. Plain Ollama ignores it; some fronting proxies expect one.
    #[arg(long, env = "OLLAMA_API_KEY")]
    pub upstream_api_key: Option<String>,

    /// Optional credential for the web-search-augmented guide route. Only attached to the enhanced endpoint.
    #[arg(long, env = "WEB_SEARCH_API_KEY")]
    pub web_search_api_key: Option<String>,

    /// Timeout in seconds for chat-completions calls.
    #[arg(long, env = "CHAT_TIMEOUT_SECS", default_value = "120")]
    pub chat_timeout_secs: u64,

    /// Timeout in seconds for each guide-generation attempt (enhanced and baseline get a fresh budget).
    #[arg(long, env = "GUIDE_TIMEOUT_SECS", default_value = "180")]
    pub guide_timeout_secs: u64,

    // --- Server Args ---
    /// Host address and port for the gateway to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:3456")]
    pub server_addr: String,

    /// Comma-separated list of origins allowed to call cross-origin. Empty means any origin.
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "")]
    pub allowed_origins: String,

    /// System prompt prepended by the chat helper. The proxy routes never touch message content.
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}
