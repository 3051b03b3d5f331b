use thiserror::Error;

/// Errors surfaced by the upstream-facing components.
///
/// Plain relay routes never produce these (they synthesize a 502 response
/// instead); the chat helper and the guide fallback controller do.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure reaching the upstream (DNS, refused
    /// connection, timeout).
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    /// The upstream answered with a non-2xx status.
    #[error("upstream returned {status}")]
    Upstream { status: u16, detail: String },

    /// The upstream answered 2xx but no assistant reply could be extracted.
    #[error("upstream returned an empty reply")]
    EmptyReply,

    /// Invalid startup configuration. Missing optional configuration is a
    /// logged warning, never this.
    #[error("invalid configuration: {0}")]
    Config(String),
}
