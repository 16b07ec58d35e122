use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    /// Zone used for server-assigned timestamps
    #[schema(example = "Europe/Sofia")]
    pub timezone: String,
    pub version: &'static str,
}

/// Liveness check; does not touch the sheet
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timezone: state.inventory.timezone().name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
