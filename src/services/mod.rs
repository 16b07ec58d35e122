pub mod inventory_log;

pub use inventory_log::{InventoryLogService, NewInventoryEvent, RecordedEvent};
