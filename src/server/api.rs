use std::sync::Arc;

use axum::{
    extract::{ Request, State },
    http::{ header, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use log::{ error, info };
use serde_json::json;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::guide::GuideClient;
use crate::server::cors::{ self, preflight };
use crate::upstream::forwarder::{ Forwarder, ProxiedResponse };

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub forwarder: Forwarder,
    pub guide: GuideClient,
}

impl AppState {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        let forwarder = Forwarder::new(config.upstream.base_url.clone());
        let guide = GuideClient::new(&config, forwarder.clone());
        Self { config, forwarder, guide }
    }
}

pub fn router(state: AppState) -> Router {
    let cors_policy = state.config.cors.clone();

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/tags", get(tags_handler).options(tags_preflight))
        .route("/v1/chat/completions", post(chat_handler).options(post_preflight))
        .route("/v1/chat/search-guides", post(guide_handler).options(post_preflight))
        .layer(middleware::from_fn_with_state(cors_policy, cors::apply_origin))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// One log line per inbound request, so a rejection at the tunnel layer can
/// be told apart from one produced here.
async fn log_request(req: Request, next: Next) -> Response {
    info!("{} {}", req.method(), req.uri().path());
    next.run(req).await
}

/// Process liveness only; never probes the upstream.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "upstream": state.config.upstream.base_url,
    }))
}

async fn tags_handler(State(state): State<AppState>) -> Response {
    let resp = state.forwarder
        .forward_get("/api/tags", state.config.upstream.chat_timeout)
        .await;
    relay(resp)
}

async fn chat_handler(State(state): State<AppState>, body: String) -> Response {
    let resp = state.forwarder
        .forward_post("/v1/chat/completions", body, state.config.upstream.chat_timeout)
        .await;
    relay(resp)
}

async fn guide_handler(State(state): State<AppState>, body: String) -> Response {
    match state.guide.generate(body).await {
        Ok(resp) => relay(resp),
        Err(e) => error_response(e),
    }
}

async fn tags_preflight() -> Response {
    preflight("GET, OPTIONS")
}

async fn post_preflight() -> Response {
    preflight("POST, OPTIONS")
}

/// Hand the upstream's status and body back to the caller unchanged.
fn relay(resp: ProxiedResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        resp.body,
    ).into_response()
}

fn error_response(e: GatewayError) -> Response {
    match e {
        GatewayError::Unreachable(detail) => {
            error!("upstream unreachable: {}", detail);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "upstream unreachable", "detail": detail })),
            ).into_response()
        }
        GatewayError::Upstream { status, detail } => {
            relay(ProxiedResponse { status, body: detail })
        }
        GatewayError::EmptyReply => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "upstream returned an empty reply" })),
        ).into_response(),
        GatewayError::Config(msg) => {
            error!("configuration error in request path: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": msg })),
            ).into_response()
        }
    }
}
