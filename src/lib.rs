//! Sheets Inventory API Library
//!
//! HTTP service that records inventory events as rows of a Google Sheets tab
//! and reports the latest event logged for a location.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod services;
pub mod sheets;
pub mod tracing;

use std::{sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use tower::ServiceBuilder;

use crate::auth::ApiKeyGate;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::services::InventoryLogService;
use crate::sheets::SheetStore;

// Headroom over the outbound Sheets timeout so a token exchange plus one call can finish
const INBOUND_TIMEOUT_HEADROOM: Duration = Duration::from_secs(5);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub inventory: InventoryLogService,
    pub api_key: ApiKeyGate,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn SheetStore>) -> Self {
        let inventory = InventoryLogService::new(store, config.tz());
        let api_key = ApiKeyGate::new(config.api_key.clone());
        Self {
            config: Arc::new(config),
            inventory,
            api_key,
        }
    }
}

/// Routes that require the `x-api-key` header
pub fn protected_routes(gate: ApiKeyGate) -> Router<AppState> {
    Router::new()
        .route("/append", post(handlers::inventory::append_event))
        .route("/last-product", get(handlers::inventory::last_product))
        .route("/search", post(handlers::inventory::search_events))
        .route_layer(middleware::from_fn_with_state(gate, auth::require_api_key))
}

async fn handle_timeout_error(err: BoxError) -> ServiceError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ServiceError::Timeout("request exceeded the server deadline".to_string())
    } else {
        ServiceError::InternalError(format!("unhandled middleware error: {}", err))
    }
}

/// Full application router without CORS; the binary adds CORS from config.
pub fn app_router(state: AppState) -> Router {
    let inbound_timeout = state.config.request_timeout() * 2 + INBOUND_TIMEOUT_HEADROOM;

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .merge(protected_routes(state.api_key.clone()))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(inbound_timeout),
        )
        // Outermost so the id exists before the trace span and handlers run
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}
