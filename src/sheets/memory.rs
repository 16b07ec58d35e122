use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::layout::{cell_to_string, events_from_grid, header_row};
use super::{AppendReceipt, SheetError, SheetStore};
use crate::models::{InventoryEvent, SHEET_COLUMNS};

/// Sheet kept in process memory. Rows go through the same header-driven layout
/// as the remote tab, and call counters let callers observe spreadsheet traffic.
#[derive(Debug)]
pub struct InMemorySheetStore {
    tab_name: String,
    grid: Mutex<Vec<Vec<String>>>,
    appends: AtomicUsize,
    reads: AtomicUsize,
}

impl InMemorySheetStore {
    /// Empty tab holding only the header row.
    pub fn new(tab_name: impl Into<String>) -> Self {
        Self::with_grid(tab_name, vec![header_row()])
    }

    /// Tab pre-populated with `grid` (header row first).
    pub fn with_grid(tab_name: impl Into<String>, grid: Vec<Vec<String>>) -> Self {
        Self {
            tab_name: tab_name.into(),
            grid: Mutex::new(grid),
            appends: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn append_count(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Total spreadsheet calls served so far.
    pub fn call_count(&self) -> usize {
        self.append_count() + self.read_count()
    }

    /// Snapshot of the raw grid, header included.
    pub fn grid(&self) -> Vec<Vec<String>> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<String>>> {
        self.grid.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SheetStore for InMemorySheetStore {
    async fn append(&self, event: &InventoryEvent) -> Result<AppendReceipt, SheetError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        let row: Vec<String> = event.to_cells().iter().map(cell_to_string).collect();

        let mut grid = self.lock();
        grid.push(row);
        let row_number = grid.len();

        Ok(AppendReceipt {
            updated_range: Some(format!(
                "{}!A{}:F{}",
                self.tab_name, row_number, row_number
            )),
            updated_rows: Some(1),
            updated_cells: Some(SHEET_COLUMNS.len() as i64),
        })
    }

    async fn read_all(&self) -> Result<Vec<InventoryEvent>, SheetError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let grid = self.lock();
        events_from_grid(&grid)
    }
}
