/*!
 * # Sheet access
 *
 * [`SheetStore`] is the only seam between the HTTP layer and the spreadsheet
 * that acts as the system of record. Two implementations exist:
 *
 * - [`GoogleSheetsClient`] talks to the Sheets v4 REST API
 * - [`InMemorySheetStore`] keeps the grid in process memory (local runs, tests)
 *
 * Both hold the tab as a grid of string cells whose first row is the header;
 * [`layout`] turns that grid into [`InventoryEvent`]s.
 */

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::InventoryEvent;

pub mod credentials;
pub mod google;
pub mod layout;
pub mod memory;
pub mod query;

pub use credentials::{ServiceAccountKey, TokenSource};
pub use google::GoogleSheetsClient;
pub use memory::InMemorySheetStore;
pub use query::{latest_for_location, search_events, SearchFilters};

/// Errors raised while talking to the spreadsheet
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Spreadsheet API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Token exchange failed: {0}")]
    Token(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Sheet layout error: {0}")]
    Layout(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

impl SheetError {
    /// Whether the failure originates in the remote service rather than local setup.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SheetError::Http(_)
                | SheetError::Status { .. }
                | SheetError::Token(_)
                | SheetError::Decode(_)
                | SheetError::Layout(_)
        )
    }
}

/// What the remote service reported after an append
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AppendReceipt {
    /// A1 range the row landed in, e.g. `Data!A42:F42`
    pub updated_range: Option<String>,
    pub updated_rows: Option<i64>,
    pub updated_cells: Option<i64>,
}

/// Capability interface over the backing sheet
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Appends exactly one row for `event`.
    async fn append(&self, event: &InventoryEvent) -> Result<AppendReceipt, SheetError>;

    /// Reads every data row of the tab, in sheet order.
    async fn read_all(&self) -> Result<Vec<InventoryEvent>, SheetError>;

    /// Most recent event for `location`, or `None` when no row matches.
    async fn find_latest(
        &self,
        location: &str,
        tz: Tz,
    ) -> Result<Option<InventoryEvent>, SheetError> {
        let events = self.read_all().await?;
        Ok(latest_for_location(&events, location, tz).cloned())
    }
}

/// Selects the backend named by `sheet_backend`.
pub fn store_from_config(
    cfg: &crate::config::AppConfig,
) -> Result<std::sync::Arc<dyn SheetStore>, SheetError> {
    if cfg.uses_in_memory_sheet() {
        tracing::warn!("Using in-memory sheet backend; events are lost on restart");
        Ok(std::sync::Arc::new(InMemorySheetStore::new(cfg.tab_name.clone())))
    } else {
        Ok(std::sync::Arc::new(GoogleSheetsClient::from_config(cfg)?))
    }
}
