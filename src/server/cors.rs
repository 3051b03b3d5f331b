use axum::extract::{ Request, State };
use axum::http::{ header, HeaderValue, StatusCode };
use axum::middleware::Next;
use axum::response::{ IntoResponse, Response };
use log::info;

/// Origin allow-list. `None` means any origin, the mode the gateway runs in
/// when no list is configured. Credentials are never allowed in either mode.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Option<Vec<String>>,
}

impl CorsPolicy {
    pub fn allow_any() -> Self {
        Self { allowed: None }
    }

    /// Parse a comma-separated allow-list. Empty or all-whitespace input
    /// means allow-any; that is a configuration note, not an error.
    pub fn from_list(comma_separated: &str) -> Self {
        let list: Vec<String> = comma_separated
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if list.is_empty() {
            info!("no CORS allow-list configured; allowing any origin");
            Self { allowed: None }
        } else {
            Self { allowed: Some(list) }
        }
    }

    /// Value for `Access-Control-Allow-Origin`: the request origin (or `*`)
    /// in allow-any mode, the matched origin in list mode, `None` when the
    /// origin is not allowed.
    pub fn resolve_origin(&self, request_origin: Option<&str>) -> Option<String> {
        match &self.allowed {
            None => Some(request_origin.unwrap_or("*").to_string()),
            Some(list) => request_origin
                .and_then(|origin| list.iter().find(|allowed| allowed.as_str() == origin))
                .cloned(),
        }
    }

    pub fn describe(&self) -> String {
        match &self.allowed {
            None => "any origin".to_string(),
            Some(list) => list.join(", "),
        }
    }
}

/// Stamp `Access-Control-Allow-Origin` on every response the router
/// produces. `Access-Control-Allow-Credentials` is never set.
pub async fn apply_origin(
    State(policy): State<CorsPolicy>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req.headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut resp = next.run(req).await;

    if let Some(allowed) = policy.resolve_origin(origin.as_deref()) {
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            resp.headers_mut().insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
            resp.headers_mut().insert(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    resp
}

/// 204 preflight answer for a registered route. `methods` is the
/// route-specific method list; the allowed request headers are the same for
/// every route. Unregistered paths never reach this and fall through to the
/// router's 404.
pub fn preflight(methods: &'static str) -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, methods),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
        ],
    ).into_response()
}
