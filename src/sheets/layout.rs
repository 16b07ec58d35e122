//! Header-driven mapping between the tab's cell grid and [`InventoryEvent`]s.

use serde_json::Value;

use super::SheetError;
use crate::models::{InventoryEvent, SHEET_COLUMNS};

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    timestamp: usize,
    location: usize,
    product: usize,
    quantity: usize,
    note: usize,
    user: usize,
}

impl SheetLayout {
    /// Resolves every required column by name; header cells are trimmed and compared
    /// case-insensitively so a reordered tab still reads correctly.
    pub fn from_header(header: &[String]) -> Result<Self, SheetError> {
        let position = |name: &str| {
            header
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(name))
        };

        let missing: Vec<&str> = SHEET_COLUMNS
            .iter()
            .copied()
            .filter(|name| position(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(SheetError::Layout(format!(
                "header must include {:?}; missing {:?}",
                SHEET_COLUMNS, missing
            )));
        }

        let [timestamp, location, product, quantity, note, user] =
            SHEET_COLUMNS.map(|name| position(name).unwrap_or_default());
        Ok(Self {
            timestamp,
            location,
            product,
            quantity,
            note,
            user,
        })
    }

    /// Builds an event from one data row; cells past the end of a short row are empty.
    pub fn event_from_row(&self, row: &[String]) -> InventoryEvent {
        let cell = |idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or_default();
        let optional = |idx: usize| Some(cell(idx)).filter(|s| !s.is_empty()).map(str::to_string);

        InventoryEvent {
            timestamp: cell(self.timestamp).to_string(),
            location: cell(self.location).to_string(),
            product: cell(self.product).to_string(),
            quantity: cell(self.quantity).parse::<i64>().ok(),
            note: optional(self.note),
            user: optional(self.user),
        }
    }
}

/// Converts a full grid (header first) into events, skipping rows with no content.
/// An empty grid, or one holding only the header, yields no events.
pub fn events_from_grid(grid: &[Vec<String>]) -> Result<Vec<InventoryEvent>, SheetError> {
    let Some((header, rows)) = grid.split_first() else {
        return Ok(Vec::new());
    };
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let layout = SheetLayout::from_header(header)?;
    Ok(rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| layout.event_from_row(row))
        .collect())
}

/// Renders a cell returned by the REST API as the string Sheets would display.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        other => other.to_string(),
    }
}

/// Header row written to a fresh tab.
pub fn header_row() -> Vec<String> {
    SHEET_COLUMNS.iter().map(|s| s.to_string()).collect()
}
