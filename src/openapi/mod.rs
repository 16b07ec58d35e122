use axum::Json;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use crate::auth::API_KEY_HEADER;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sheets Inventory API",
        description = r#"
Logs inventory events (location, product, quantity) as rows of a Google Sheets tab
and answers "what was last recorded at this location?".

## Authentication

`/append`, `/last-product` and `/search` require the shared secret in a header:

```
x-api-key: <your-api-key>
```

## Error Handling

Failures use one JSON shape:

```json
{
  "error": "Bad Request",
  "message": "Validation error: location must not be empty",
  "request_id": "0b6f6c4e-8d43-4e58-9a49-5a2f1d7b1c11",
  "timestamp": "2026-10-19T10:30:00.000Z"
}
```

Problems talking to Google are reported as `502 Bad Gateway`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Inventory", description = "Inventory event log endpoints"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::inventory::append_event,
        crate::handlers::inventory::last_product,
        crate::handlers::inventory::search_events,
    ),
    components(
        schemas(
            crate::models::InventoryEvent,
            crate::sheets::AppendReceipt,
            crate::handlers::health::HealthResponse,
            crate::handlers::inventory::AppendEventRequest,
            crate::handlers::inventory::AppendEventResponse,
            crate::handlers::inventory::LastProductResponse,
            crate::handlers::inventory::SearchRequest,
            crate::handlers::inventory::SearchResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&ApiKeySecurity)
)]
pub struct ApiDoc;

struct ApiKeySecurity;

impl Modify for ApiKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

/// Serves the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
