use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{error, info, instrument};

use super::credentials::{ServiceAccountKey, TokenSource};
use super::layout::{cell_to_string, events_from_grid, header_row};
use super::{AppendReceipt, SheetError, SheetStore};
use crate::config::AppConfig;
use crate::models::InventoryEvent;

/// Columns covered by the event log, `timestamp` through `user`
const COLUMN_SPAN: (&str, &str) = ("A", "F");

/// Connection settings for [`GoogleSheetsClient`]
#[derive(Debug, Clone)]
pub struct GoogleSheetsSettings {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub tab_name: String,
    pub timeout: Duration,
}

/// Sheets v4 REST client bound to one spreadsheet tab
#[derive(Debug)]
pub struct GoogleSheetsClient {
    http: Client,
    base_url: Url,
    spreadsheet_id: String,
    range: String,
    header_range: String,
    tokens: TokenSource,
    /// Set once the tab is known to start with a header row
    header_ready: OnceCell<()>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    updated_range: Option<String>,
    updated_rows: Option<i64>,
    updated_cells: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AppendValuesResponse {
    #[serde(default)]
    updates: UpdateValuesResponse,
}

/// A1 range covering the event columns of `tab`, e.g. `Data!A:F`
pub fn a1_range(tab: &str) -> String {
    format!("{}!{}:{}", tab, COLUMN_SPAN.0, COLUMN_SPAN.1)
}

/// A1 range of the header row of `tab`, e.g. `Data!A1:F1`
pub fn header_a1_range(tab: &str) -> String {
    format!("{}!{}1:{}1", tab, COLUMN_SPAN.0, COLUMN_SPAN.1)
}

impl GoogleSheetsClient {
    pub fn new(settings: GoogleSheetsSettings, tokens: TokenSource) -> Result<Self, SheetError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| SheetError::Endpoint(format!("{}: {}", settings.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(SheetError::Endpoint(settings.base_url));
        }
        let http = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            http,
            base_url,
            spreadsheet_id: settings.spreadsheet_id,
            range: a1_range(&settings.tab_name),
            header_range: header_a1_range(&settings.tab_name),
            tokens,
            header_ready: OnceCell::new(),
        })
    }

    /// Builds the client from configuration, loading the credential it names.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, SheetError> {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let tokens = if let Some(token) = non_empty(&cfg.sheets_access_token) {
            TokenSource::Static(token)
        } else if let Some(path) = non_empty(&cfg.service_account_file) {
            TokenSource::service_account(ServiceAccountKey::from_file(path)?, cfg.request_timeout())?
        } else if let Some(json) = non_empty(&cfg.service_account_json) {
            TokenSource::service_account(ServiceAccountKey::from_json(&json)?, cfg.request_timeout())?
        } else {
            return Err(SheetError::Credential(
                "no service account or access token configured".to_string(),
            ));
        };

        let spreadsheet_id = non_empty(&cfg.sheet_id)
            .ok_or_else(|| SheetError::Credential("no spreadsheet id configured".to_string()))?;

        let settings = GoogleSheetsSettings {
            base_url: cfg.sheets_api_base_url.clone(),
            spreadsheet_id,
            tab_name: cfg.tab_name.clone(),
            timeout: cfg.request_timeout(),
        };
        info!(
            spreadsheet_id = %settings.spreadsheet_id,
            tab = %settings.tab_name,
            "Using Google Sheets backend"
        );
        Self::new(settings, tokens)
    }

    pub fn range(&self) -> &str {
        &self.range
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{suffix}` with each segment escaped
    fn values_url(&self, range: &str, suffix: &str) -> Result<Url, SheetError> {
        let range_segment = format!("{}{}", range, suffix);
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SheetError::Endpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range_segment.as_str(),
            ]);
        Ok(url)
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(%status, body = %body, "spreadsheet API call failed");
        Err(SheetError::Status { status, body })
    }

    async fn fetch_values(&self, token: &str, range: &str) -> Result<ValueRange, SheetError> {
        let response = self
            .http
            .get(self.values_url(range, "")?)
            .bearer_auth(token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SheetError::Decode(format!("values response: {}", e)))
    }

    async fn append_rows(
        &self,
        token: &str,
        rows: Value,
    ) -> Result<AppendValuesResponse, SheetError> {
        let response = self
            .http
            .post(self.values_url(&self.range, ":append")?)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({
                "majorDimension": "ROWS",
                "values": rows,
            }))
            .send()
            .await?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SheetError::Decode(format!("append response: {}", e)))
    }

    /// Writes the header row first when the tab is empty; checked once per client.
    async fn ensure_header(&self, token: &str) -> Result<(), SheetError> {
        self.header_ready
            .get_or_try_init(|| async {
                let first = self.fetch_values(token, &self.header_range).await?;
                let has_header = first.values.first().is_some_and(|row| {
                    row.iter()
                        .any(|cell| !cell_to_string(cell).trim().is_empty())
                });
                if !has_header {
                    info!(range = %self.header_range, "Writing header row to empty tab");
                    self.append_rows(token, json!([header_row()])).await?;
                }
                Ok::<(), SheetError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsClient {
    #[instrument(skip(self, event), fields(range = %self.range, location = %event.location))]
    async fn append(&self, event: &InventoryEvent) -> Result<AppendReceipt, SheetError> {
        let token = self.tokens.bearer_token().await?;
        self.ensure_header(&token).await?;

        let body = self.append_rows(&token, json!([event.to_cells()])).await?;
        Ok(AppendReceipt {
            updated_range: body.updates.updated_range,
            updated_rows: body.updates.updated_rows,
            updated_cells: body.updates.updated_cells,
        })
    }

    #[instrument(skip(self), fields(range = %self.range))]
    async fn read_all(&self) -> Result<Vec<InventoryEvent>, SheetError> {
        let token = self.tokens.bearer_token().await?;
        let body = self.fetch_values(&token, &self.range).await?;

        let grid: Vec<Vec<String>> = body
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();
        events_from_grid(&grid)
    }
}
