use std::net::SocketAddr;
use std::sync::atomic::{ AtomicBool, AtomicUsize, Ordering };
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{ header, HeaderMap, Method, StatusCode };
use axum::response::{ IntoResponse, Response };
use axum::routing::{ get, post };
use axum::Router;

use ollama_gateway::config::GatewayConfig;
use ollama_gateway::server::api::{ self, AppState };
use ollama_gateway::server::cors::CorsPolicy;
use ollama_gateway::upstream::{ ApiDialect, UpstreamTarget };

const BASELINE_BODY: &str =
    r#"{"choices":[{"message":{"role":"assistant","content":"baseline guide"}}]}"#;
const ENHANCED_BODY: &str =
    r#"{"choices":[{"message":{"role":"assistant","content":"searched guide"}}]}"#;
const TAGS_BODY: &str = r#"{"models":[{"name":"mistral:latest"}]}"#;

#[derive(Clone)]
struct FakeUpstream {
    enhanced_calls: Arc<AtomicUsize>,
    baseline_calls: Arc<AtomicUsize>,
    saw_both_search_headers: Arc<AtomicBool>,
    enhanced_status: u16,
    enhanced_body: String,
}

impl FakeUpstream {
    fn new(enhanced_status: u16, enhanced_body: &str) -> Self {
        Self {
            enhanced_calls: Arc::new(AtomicUsize::new(0)),
            baseline_calls: Arc::new(AtomicUsize::new(0)),
            saw_both_search_headers: Arc::new(AtomicBool::new(false)),
            enhanced_status,
            enhanced_body: enhanced_body.to_string(),
        }
    }

    fn enhanced_count(&self) -> usize {
        self.enhanced_calls.load(Ordering::SeqCst)
    }

    fn baseline_count(&self) -> usize {
        self.baseline_calls.load(Ordering::SeqCst)
    }
}

async fn tags_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], TAGS_BODY)
}

async fn baseline_handler(State(state): State<FakeUpstream>) -> impl IntoResponse {
    state.baseline_calls.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "application/json")], BASELINE_BODY)
}

async fn enhanced_handler(State(state): State<FakeUpstream>, headers: HeaderMap) -> Response {
    state.enhanced_calls.fetch_add(1, Ordering::SeqCst);
    if headers.contains_key("x-web-search-api-key") && headers.contains_key("x-search-api-key") {
        state.saw_both_search_headers.store(true, Ordering::SeqCst);
    }
    (
        StatusCode::from_u16(state.enhanced_status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        state.enhanced_body.clone(),
    ).into_response()
}

async fn spawn_upstream(state: FakeUpstream) -> SocketAddr {
    let app = Router::new()
        .route("/api/tags", get(tags_handler))
        .route("/v1/chat/completions", post(baseline_handler))
        .route("/v1/chat/search-guides", post(enhanced_handler))
        .with_state(state);

    spawn_app(app).await
}

async fn spawn_app(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    addr
}

fn gateway_config(upstream_base: &str, dialect: ApiDialect) -> GatewayConfig {
    GatewayConfig {
        upstream: UpstreamTarget {
            base_url: upstream_base.trim_end_matches('/').to_string(),
            dialect,
            model: "mistral:latest".to_string(),
            chat_timeout: Duration::from_secs(2),
            guide_timeout: Duration::from_secs(2),
        },
        cors: CorsPolicy::allow_any(),
        server_addr: "127.0.0.1:0".to_string(),
        upstream_api_key: None,
        web_search_api_key: None,
        system_prompt: "You are a test assistant.".to_string(),
        tls: None,
    }
}

async fn spawn_gateway(config: GatewayConfig) -> SocketAddr {
    let state = AppState::new(Arc::new(config));
    spawn_app(api::router(state)).await
}

#[tokio::test]
async fn health_reports_upstream_base() {
    let gateway = spawn_gateway(gateway_config("http://127.0.0.1:11434", ApiDialect::Native)).await;

    let resp = reqwest::get(format!("http://{}/health", gateway)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["upstream"], "http://127.0.0.1:11434");
}

#[tokio::test]
async fn tags_route_relays_upstream_body() {
    let upstream = FakeUpstream::new(200, ENHANCED_BODY);
    let upstream_addr = spawn_upstream(upstream).await;
    let gateway = spawn_gateway(gateway_config(
        &format!("http://{}", upstream_addr),
        ApiDialect::OpenAiCompat,
    )).await;

    let resp = reqwest::get(format!("http://{}/api/tags", gateway)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), TAGS_BODY);
}

#[tokio::test]
async fn chat_route_relays_status_and_body_byte_identical() {
    let upstream = FakeUpstream::new(200, ENHANCED_BODY);
    let upstream_addr = spawn_upstream(upstream.clone()).await;
    let gateway = spawn_gateway(gateway_config(
        &format!("http://{}", upstream_addr),
        ApiDialect::OpenAiCompat,
    )).await;

    let request_body = r#"{"model":"m","messages":[{"role":"user","content":"hi"}],"stream":false}"#;
    let resp = reqwest::Client::new()
        .post(format!("http://{}/v1/chat/completions", gateway))
        .header(header::CONTENT_TYPE, "application/json")
        .body(request_body)
        .send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), BASELINE_BODY);
    assert_eq!(upstream.baseline_count(), 1);
}

#[tokio::test]
async fn dead_upstream_yields_synthesized_502() {
    // Bind and immediately drop a listener so the port is closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = spawn_gateway(gateway_config(
        &format!("http://{}", dead_addr),
        ApiDialect::OpenAiCompat,
    )).await;

    let resp = reqwest::get(format!("http://{}/api/tags", gateway)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 502);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "upstream unreachable");
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn preflights_answer_204_with_route_methods() {
    let mut config = gateway_config("http://127.0.0.1:11434", ApiDialect::Native);
    // An allow-list that does not contain the caller must not change the
    // preflight status.
    config.cors = CorsPolicy::from_list("https://allowed.example.com");
    let gateway = spawn_gateway(config).await;
    let client = reqwest::Client::new();

    let resp = client
        .request(Method::OPTIONS, format!("http://{}/api/tags", gateway))
        .header(header::ORIGIN, "https://other.example.com")
        .send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    let methods = resp.headers().get("access-control-allow-methods").unwrap().to_str().unwrap();
    assert!(methods.contains("GET") && methods.contains("OPTIONS"));

    let resp = client
        .request(Method::OPTIONS, format!("http://{}/v1/chat/completions", gateway))
        .send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    let methods = resp.headers().get("access-control-allow-methods").unwrap().to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("OPTIONS"));
    assert_eq!(
        resp.headers().get("access-control-allow-headers").unwrap(),
        "Content-Type, Authorization"
    );

    let resp = client
        .request(Method::OPTIONS, format!("http://{}/api/unknown", gateway))
        .send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn allow_origin_reflects_policy() {
    let gateway = spawn_gateway(gateway_config("http://127.0.0.1:11434", ApiDialect::Native)).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{}/health", gateway))
        .header(header::ORIGIN, "https://app.example.com")
        .send().await.unwrap();
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "https://app.example.com"
    );
    assert!(resp.headers().get("access-control-allow-credentials").is_none());

    let mut config = gateway_config("http://127.0.0.1:11434", ApiDialect::Native);
    config.cors = CorsPolicy::from_list("https://allowed.example.com");
    let restricted = spawn_gateway(config).await;

    let resp = client
        .get(format!("http://{}/health", restricted))
        .header(header::ORIGIN, "https://other.example.com")
        .send().await.unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn native_only_target_skips_enhanced_route() {
    let upstream = FakeUpstream::new(200, ENHANCED_BODY);
    let upstream_addr = spawn_upstream(upstream.clone()).await;
    let gateway = spawn_gateway(gateway_config(
        &format!("http://{}", upstream_addr),
        ApiDialect::Native,
    )).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/v1/chat/search-guides", gateway))
        .header(header::CONTENT_TYPE, "application/json")
        .body(r#"{"model":"m","messages":[{"role":"user","content":"guide please"}],"stream":false}"#)
        .send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), BASELINE_BODY);
    assert_eq!(upstream.enhanced_count(), 0);
    assert_eq!(upstream.baseline_count(), 1);
}

#[tokio::test]
async fn enhanced_404_falls_back_to_baseline() {
    let upstream = FakeUpstream::new(404, r#"{"error":"no such route"}"#);
    let upstream_addr = spawn_upstream(upstream.clone()).await;
    let gateway = spawn_gateway(gateway_config(
        &format!("http://{}", upstream_addr),
        ApiDialect::OpenAiCompat,
    )).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/v1/chat/search-guides", gateway))
        .header(header::CONTENT_TYPE, "application/json")
        .body(r#"{"model":"m","messages":[{"role":"user","content":"guide please"}],"stream":false}"#)
        .send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), BASELINE_BODY);
    assert_eq!(upstream.enhanced_count(), 1);
    assert_eq!(upstream.baseline_count(), 1);
}

#[tokio::test]
async fn enhanced_500_is_surfaced_without_fallback() {
    let upstream = FakeUpstream::new(500, r#"{"error":"model crashed"}"#);
    let upstream_addr = spawn_upstream(upstream.clone()).await;
    let gateway = spawn_gateway(gateway_config(
        &format!("http://{}", upstream_addr),
        ApiDialect::OpenAiCompat,
    )).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/v1/chat/search-guides", gateway))
        .header(header::CONTENT_TYPE, "application/json")
        .body(r#"{"model":"m","messages":[{"role":"user","content":"guide please"}],"stream":false}"#)
        .send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 500);
    assert!(resp.text().await.unwrap().contains("model crashed"));
    assert_eq!(upstream.enhanced_count(), 1);
    assert_eq!(upstream.baseline_count(), 0);
}

#[tokio::test]
async fn enhanced_2xx_without_content_is_a_distinct_error() {
    let upstream = FakeUpstream::new(200, r#"{"choices":[]}"#);
    let upstream_addr = spawn_upstream(upstream.clone()).await;
    let gateway = spawn_gateway(gateway_config(
        &format!("http://{}", upstream_addr),
        ApiDialect::OpenAiCompat,
    )).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/v1/chat/search-guides", gateway))
        .header(header::CONTENT_TYPE, "application/json")
        .body(r#"{"model":"m","messages":[{"role":"user","content":"guide please"}],"stream":false}"#)
        .send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "upstream returned an empty reply");
    assert_eq!(upstream.baseline_count(), 0);
}

#[tokio::test]
async fn web_search_credential_travels_under_both_header_names() {
    let upstream = FakeUpstream::new(200, ENHANCED_BODY);
    let upstream_addr = spawn_upstream(upstream.clone()).await;

    let mut config = gateway_config(&format!("http://{}", upstream_addr), ApiDialect::OpenAiCompat);
    config.web_search_api_key = Some("search-secret".to_string());
    let gateway = spawn_gateway(config).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{}/v1/chat/search-guides", gateway))
        .header(header::CONTENT_TYPE, "application/json")
        .body(r#"{"model":"m","messages":[{"role":"user","content":"guide please"}],"stream":false}"#)
        .send().await.unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), ENHANCED_BODY);
    assert!(upstream.saw_both_search_headers.load(Ordering::SeqCst));
}
