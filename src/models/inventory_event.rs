use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Column order used when writing rows; the header row of the tab names the same columns.
pub const SHEET_COLUMNS: [&str; 6] = ["timestamp", "location", "product", "quantity", "note", "user"];

/// One logged change to stock at a location. Rows are never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InventoryEvent {
    /// Server-assigned on append (RFC 3339); older rows may hold `DD-MM-YYYY` or UNIX seconds
    #[schema(example = "2026-10-19T13:45:12.345+03:00")]
    pub timestamp: String,
    #[schema(example = "Kaufland Plovdiv")]
    pub location: String,
    /// Free text; may list several products separated by commas
    #[schema(example = "Squishies")]
    pub product: String,
    /// Always present on append; `null` when a stored cell is blank or not an integer
    #[schema(example = 40)]
    pub quantity: Option<i64>,
    pub note: Option<String>,
    pub user: Option<String>,
}

impl InventoryEvent {
    /// Cells in [`SHEET_COLUMNS`] order. Absent optionals become empty cells.
    pub fn to_cells(&self) -> Vec<Value> {
        vec![
            Value::String(self.timestamp.clone()),
            Value::String(self.location.clone()),
            Value::String(self.product.clone()),
            self.quantity
                .map(Value::from)
                .unwrap_or_else(|| Value::String(String::new())),
            Value::String(self.note.clone().unwrap_or_default()),
            Value::String(self.user.clone().unwrap_or_default()),
        ]
    }

    /// Product tokens of this event, see [`split_products`].
    pub fn products(&self) -> Vec<String> {
        split_products(&self.product)
    }
}

/// Splits a product cell on commas, trimming tokens and dropping empty ones.
pub fn split_products(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
