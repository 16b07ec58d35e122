#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use sheets_inventory_api::{
    config::AppConfig,
    models::InventoryEvent,
    sheets::{AppendReceipt, InMemorySheetStore, SheetError, SheetStore},
    AppState,
};
use tower::ServiceExt;

pub const TEST_API_KEY: &str = "test-api-key-123";

/// Helper harness wrapping the full router around an in-memory sheet.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub sheet: Arc<InMemorySheetStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_sheet(InMemorySheetStore::new("Data"))
    }

    /// Start from an existing grid, header row included.
    pub fn with_grid(grid: Vec<Vec<String>>) -> Self {
        Self::with_sheet(InMemorySheetStore::with_grid("Data", grid))
    }

    fn with_sheet(sheet: InMemorySheetStore) -> Self {
        let sheet = Arc::new(sheet);
        let state = AppState::new(test_config(), sheet.clone());
        Self {
            router: sheets_inventory_api::app_router(state.clone()),
            state,
            sheet,
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        api_key: Option<&str>,
    ) -> Response {
        send(&self.router, method, uri, body, api_key).await
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(TEST_API_KEY)).await
    }

    /// Sends a raw body without forcing a JSON content type.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: &'static str,
        content_type: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-api-key", TEST_API_KEY);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        let request = builder.body(Body::from(body)).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(TEST_API_KEY, "test");
    cfg.sheet_backend = "in-memory".into();
    cfg.timezone = "Europe/Sofia".into();
    cfg
}

/// Router backed by an arbitrary store.
pub fn router_with_store(store: Arc<dyn SheetStore>) -> Router {
    sheets_inventory_api::app_router(AppState::new(test_config(), store))
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    api_key: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    let body = if let Some(json) = body {
        builder = builder.header("content-type", "application/json");
        Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
    } else {
        Body::empty()
    };

    let request = builder.body(body).expect("failed to build request");
    router
        .clone()
        .oneshot(request)
        .await
        .expect("router error during test request")
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Store whose every call fails the way an unreachable Sheets API would.
pub struct FailingStore {
    pub status: StatusCode,
}

impl Default for FailingStore {
    fn default() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[async_trait]
impl SheetStore for FailingStore {
    async fn append(&self, _event: &InventoryEvent) -> Result<AppendReceipt, SheetError> {
        Err(SheetError::Status {
            status: self.status,
            body: "backend unavailable".into(),
        })
    }

    async fn read_all(&self) -> Result<Vec<InventoryEvent>, SheetError> {
        Err(SheetError::Status {
            status: self.status,
            body: "backend unavailable".into(),
        })
    }
}

/// Store that never answers within any reasonable deadline.
pub struct SlowStore;

#[async_trait]
impl SheetStore for SlowStore {
    async fn append(&self, _event: &InventoryEvent) -> Result<AppendReceipt, SheetError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(SheetError::Status {
            status: StatusCode::GATEWAY_TIMEOUT,
            body: "too slow".into(),
        })
    }

    async fn read_all(&self) -> Result<Vec<InventoryEvent>, SheetError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

pub fn header() -> Vec<String> {
    row(&["timestamp", "location", "product", "quantity", "note", "user"])
}
