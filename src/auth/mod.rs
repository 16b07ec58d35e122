/*!
 * # API key gate
 *
 * Every protected route is wrapped in [`require_api_key`]. The caller must send
 * the configured secret verbatim in the `x-api-key` header; anything else is
 * rejected with `401` before the handler (or its body extractor) runs.
 */

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::errors::ServiceError;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// Holds the expected API key; cloned into the middleware state.
#[derive(Clone)]
pub struct ApiKeyGate {
    expected: Arc<str>,
}

impl ApiKeyGate {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            expected: Arc::from(api_key.into()),
        }
    }

    /// Allows the request only when the presented key equals the configured one.
    /// An empty configured key matches nothing.
    pub fn check(&self, presented: Option<&str>) -> Result<(), ServiceError> {
        if self.expected.is_empty() {
            return Err(ServiceError::Unauthorized(
                "API key is not configured".to_string(),
            ));
        }
        match presented {
            None => Err(ServiceError::Unauthorized(format!(
                "missing {} header",
                API_KEY_HEADER
            ))),
            Some(key) if key == &*self.expected => Ok(()),
            Some(_) => Err(ServiceError::Unauthorized("invalid API key".to_string())),
        }
    }

    pub fn check_headers(&self, headers: &HeaderMap) -> Result<(), ServiceError> {
        // A header that is not valid UTF-8 cannot match and is reported as invalid
        let presented = headers
            .get(API_KEY_HEADER)
            .map(|value| value.to_str().unwrap_or_default());
        self.check(presented)
    }
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate")
            .field("expected", &"<redacted>")
            .finish()
    }
}

/// Middleware rejecting requests without a matching `x-api-key` header
pub async fn require_api_key(
    State(gate): State<ApiKeyGate>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if let Err(err) = gate.check_headers(request.headers()) {
        warn!(uri = %request.uri(), "rejected request: {}", err);
        return Err(err);
    }
    Ok(next.run(request).await)
}
