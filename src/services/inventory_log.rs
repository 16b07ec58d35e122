use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{info, instrument};

use crate::errors::ServiceError;
use crate::models::{timestamp::EventClock, InventoryEvent};
use crate::sheets::{search_events, AppendReceipt, SearchFilters, SheetStore};

/// Caller-supplied part of an event; the timestamp is assigned on record.
#[derive(Debug, Clone)]
pub struct NewInventoryEvent {
    pub location: String,
    pub product: String,
    pub quantity: i64,
    pub note: Option<String>,
    pub user: Option<String>,
}

/// Event as written, together with what the sheet reported
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub event: InventoryEvent,
    pub receipt: AppendReceipt,
}

/// Appends to and queries the inventory event log held in the sheet
#[derive(Clone)]
pub struct InventoryLogService {
    store: Arc<dyn SheetStore>,
    clock: Arc<EventClock>,
}

fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl InventoryLogService {
    pub fn new(store: Arc<dyn SheetStore>, tz: Tz) -> Self {
        Self {
            store,
            clock: Arc::new(EventClock::new(tz)),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.clock.timezone()
    }

    /// Stamps the event and appends exactly one row for it.
    #[instrument(skip(self, input), fields(location = %input.location))]
    pub async fn record(&self, input: NewInventoryEvent) -> Result<RecordedEvent, ServiceError> {
        let location = input.location.trim().to_string();
        let product = input.product.trim().to_string();
        if location.is_empty() {
            return Err(ServiceError::ValidationError(
                "location must not be empty".to_string(),
            ));
        }
        if product.is_empty() {
            return Err(ServiceError::ValidationError(
                "product must not be empty".to_string(),
            ));
        }

        let event = InventoryEvent {
            timestamp: self.clock.now_rfc3339(),
            location,
            product,
            quantity: Some(input.quantity),
            note: trimmed_optional(input.note),
            user: trimmed_optional(input.user),
        };

        let receipt = self.store.append(&event).await?;
        info!(
            updated_range = receipt.updated_range.as_deref().unwrap_or("unknown"),
            "Recorded inventory event"
        );
        Ok(RecordedEvent { event, receipt })
    }

    /// Latest event for `location`; `Ok(None)` when the sheet has no matching row.
    #[instrument(skip(self))]
    pub async fn latest_for_location(
        &self,
        location: &str,
    ) -> Result<Option<InventoryEvent>, ServiceError> {
        Ok(self.store.find_latest(location, self.timezone()).await?)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, filters: &SearchFilters) -> Result<Vec<InventoryEvent>, ServiceError> {
        let events = self.store.read_all().await?;
        Ok(search_events(&events, filters, self.timezone())
            .into_iter()
            .cloned()
            .collect())
    }
}
