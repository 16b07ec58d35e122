use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::common::{json_body, not_blank, query_params, validate_input};
use crate::{
    errors::{ErrorResponse, ServiceError},
    models::InventoryEvent,
    services::NewInventoryEvent,
    sheets::{AppendReceipt, SearchFilters},
    AppState,
};

const DEFAULT_SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AppendEventRequest {
    #[validate(custom = "not_blank")]
    #[schema(example = "Kaufland Plovdiv")]
    pub location: String,
    #[validate(custom = "not_blank")]
    #[schema(example = "Squishies")]
    pub product: String,
    /// Whole number; negative values record stock leaving the location
    #[schema(example = 40)]
    pub quantity: i64,
    pub note: Option<String>,
    pub user: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppendEventResponse {
    pub ok: bool,
    pub appended: InventoryEvent,
    pub update: AppendReceipt,
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LastProductQuery {
    /// Location to look up; matched exactly after trimming
    #[validate(custom = "not_blank")]
    pub location: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LastProductResponse {
    pub found: bool,
    #[schema(example = "Kaufland Plovdiv")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<InventoryEvent>,
    /// Product cell of the latest event, split on commas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<String>>,
    /// Last entry of `products`, empty when the cell held no product
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_product: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct SearchRequest {
    pub location: Option<String>,
    pub product: Option<String>,
    /// Inclusive lower bound, UNIX seconds
    pub since_ts: Option<f64>,
    /// Inclusive upper bound, UNIX seconds
    pub until_ts: Option<f64>,
    #[validate(range(min = 1, max = 500))]
    #[schema(example = 50)]
    pub limit: Option<u32>,
}

impl SearchRequest {
    fn into_filters(self) -> SearchFilters {
        let blank_to_none = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        SearchFilters {
            location: blank_to_none(self.location),
            product: blank_to_none(self.product),
            since_ts: self.since_ts,
            until_ts: self.until_ts,
            limit: self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT) as usize,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub rows: Vec<InventoryEvent>,
}

/// Append one inventory event to the sheet
#[utoipa::path(
    post,
    path = "/append",
    request_body = AppendEventRequest,
    responses(
        (status = 200, description = "Row appended", body = AppendEventResponse),
        (status = 400, description = "Invalid body", body = ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 502, description = "Sheets API failure", body = ErrorResponse)
    ),
    security(("api_key" = [])),
    tag = "Inventory"
)]
pub async fn append_event(
    State(state): State<AppState>,
    payload: Result<Json<AppendEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let payload = json_body(payload)?;
    validate_input(&payload)?;

    let recorded = state
        .inventory
        .record(NewInventoryEvent {
            location: payload.location,
            product: payload.product,
            quantity: payload.quantity,
            note: payload.note,
            user: payload.user,
        })
        .await?;

    Ok(Json(AppendEventResponse {
        ok: true,
        appended: recorded.event,
        update: recorded.receipt,
    }))
}

/// Latest event recorded for a location
#[utoipa::path(
    get,
    path = "/last-product",
    params(LastProductQuery),
    responses(
        (status = 200, description = "Lookup result; `found` is false when the location has no rows", body = LastProductResponse),
        (status = 400, description = "Missing or blank location", body = ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 502, description = "Sheets API failure", body = ErrorResponse)
    ),
    security(("api_key" = [])),
    tag = "Inventory"
)]
pub async fn last_product(
    State(state): State<AppState>,
    query: Result<Query<LastProductQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = query_params(query)?;
    validate_input(&query)?;
    let location = query.location.trim().to_string();

    let latest = state.inventory.latest_for_location(&location).await?;
    let response = match latest {
        Some(event) => {
            let products = event.products();
            LastProductResponse {
                found: true,
                location,
                last_product: Some(products.last().cloned().unwrap_or_default()),
                products: Some(products),
                event: Some(event),
            }
        }
        None => LastProductResponse {
            found: false,
            location,
            event: None,
            products: None,
            last_product: None,
        },
    };

    Ok(Json(response))
}

/// Filter logged events by location, product token and time window
#[utoipa::path(
    post,
    path = "/search",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching rows in sheet order", body = SearchResponse),
        (status = 400, description = "Invalid filters", body = ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 502, description = "Sheets API failure", body = ErrorResponse)
    ),
    security(("api_key" = [])),
    tag = "Inventory"
)]
pub async fn search_events(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let payload = json_body(payload)?;
    validate_input(&payload)?;

    if let (Some(since), Some(until)) = (payload.since_ts, payload.until_ts) {
        if since > until {
            return Err(ServiceError::ValidationError(
                "since_ts must not be after until_ts".to_string(),
            ));
        }
    }

    let rows = state.inventory.search(&payload.into_filters()).await?;
    Ok(Json(SearchResponse { rows }))
}
