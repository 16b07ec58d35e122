pub mod inventory_event;
pub mod timestamp;

pub use inventory_event::{split_products, InventoryEvent, SHEET_COLUMNS};
