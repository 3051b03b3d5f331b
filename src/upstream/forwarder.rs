use reqwest::Client as HttpClient;
use reqwest::header::{ ACCEPT, CONTENT_TYPE };
use serde::Serialize;
use std::time::Duration;
use log::error;

use crate::error::GatewayError;

/// Budget for the UI-facing reachability probe.
pub const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Status and raw body of one upstream call, relayed verbatim.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: u16,
    pub body: String,
}

impl ProxiedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs single upstream calls and relays the result unmodified.
///
/// The `forward_*` methods never fail: transport errors become a synthesized
/// 502 so the inbound request always gets a response. `post_raw`/`post_json`
/// are the lower-level variants for callers that need to distinguish
/// transport failure from an upstream rejection. No call is ever retried at
/// this layer.
#[derive(Debug, Clone)]
pub struct Forwarder {
    http: HttpClient,
    base_url: String,
}

impl Forwarder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn forward_get(&self, path: &str, timeout: Duration) -> ProxiedResponse {
        let url = format!("{}{}", self.base_url, path);
        let result = self.http
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .send().await;

        match result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                match resp.text().await {
                    Ok(body) => ProxiedResponse { status, body },
                    Err(e) => {
                        error!("proxy GET {}: {}", path, e);
                        unreachable_response(&e.to_string())
                    }
                }
            }
            Err(e) => {
                error!("proxy GET {}: {}", path, e);
                unreachable_response(&e.to_string())
            }
        }
    }

    /// Relay the caller's JSON body to the upstream byte-for-byte.
    pub async fn forward_post(&self, path: &str, body: String, timeout: Duration) -> ProxiedResponse {
        match self.post_raw(path, body, None, timeout).await {
            Ok(resp) => resp,
            Err(e) => {
                error!("proxy POST {}: {}", path, e);
                unreachable_response(&e.to_string())
            }
        }
    }

    /// POST a pre-serialized JSON body, optionally with extra headers
    /// (credential pairs). Transport failure surfaces as
    /// `GatewayError::Unreachable`; any HTTP status, success or not, comes
    /// back as a `ProxiedResponse`.
    pub async fn post_raw(
        &self,
        path: &str,
        body: String,
        headers: Option<Vec<(String, String)>>,
        timeout: Duration,
    ) -> Result<ProxiedResponse, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(timeout)
            .body(body);

        if let Some(header_list) = headers {
            for (name, value) in header_list {
                req = req.header(name, value);
            }
        }

        let resp = req.send().await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp.text().await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        Ok(ProxiedResponse { status, body })
    }

    /// `post_raw` for a typed payload.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        headers: Option<Vec<(String, String)>>,
        timeout: Duration,
    ) -> Result<ProxiedResponse, GatewayError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| GatewayError::Config(format!("failed to encode upstream request: {}", e)))?;
        self.post_raw(path, body, headers, timeout).await
    }

    /// Short-timeout probe of the upstream's model-listing route. Used by
    /// the UI layer for a connection indicator; the gateway's own health
    /// route never calls this.
    pub async fn is_upstream_reachable(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.http.get(&url).timeout(REACHABILITY_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

fn unreachable_response(detail: &str) -> ProxiedResponse {
    let body = serde_json::json!({
        "error": "upstream unreachable",
        "detail": detail,
    });
    ProxiedResponse {
        status: 502,
        body: body.to_string(),
    }
}
