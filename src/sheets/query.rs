//! Row selection over events read from the sheet.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::{timestamp::parse_timestamp, InventoryEvent};

/// Latest event whose location equals `location` (both sides trimmed, case-sensitive).
///
/// Rows are scanned in sheet order and a row replaces the current pick when its
/// timestamp is greater than or equal to it, so on ties the row nearer the end of
/// the sheet wins. Unparseable timestamps rank below every parseable one.
pub fn latest_for_location<'a>(
    events: &'a [InventoryEvent],
    location: &str,
    tz: Tz,
) -> Option<&'a InventoryEvent> {
    let wanted = location.trim();
    let mut best: Option<(Option<DateTime<Utc>>, &InventoryEvent)> = None;

    for event in events.iter().filter(|e| e.location.trim() == wanted) {
        let key = parse_timestamp(&event.timestamp, tz);
        match &best {
            Some((best_key, _)) if key < *best_key => {}
            _ => best = Some((key, event)),
        }
    }

    best.map(|(_, event)| event)
}

/// Filters for the search route; every filter is optional.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilters {
    /// Exact location match, as for [`latest_for_location`]
    pub location: Option<String>,
    /// Case-insensitive match against any comma-separated product token
    pub product: Option<String>,
    /// Inclusive lower bound, UNIX seconds
    pub since_ts: Option<f64>,
    /// Inclusive upper bound, UNIX seconds
    pub until_ts: Option<f64>,
    pub limit: usize,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            location: None,
            product: None,
            since_ts: None,
            until_ts: None,
            limit: 50,
        }
    }
}

impl SearchFilters {
    fn matches(&self, event: &InventoryEvent, tz: Tz) -> bool {
        if let Some(location) = &self.location {
            if event.location.trim() != location.trim() {
                return false;
            }
        }

        if let Some(product) = &self.product {
            let wanted = product.trim().to_lowercase();
            if !event
                .products()
                .iter()
                .any(|token| token.to_lowercase() == wanted)
            {
                return false;
            }
        }

        if self.since_ts.is_some() || self.until_ts.is_some() {
            let Some(at) = parse_timestamp(&event.timestamp, tz) else {
                return false;
            };
            let secs = at.timestamp_millis() as f64 / 1000.0;
            if self.since_ts.is_some_and(|since| secs < since) {
                return false;
            }
            if self.until_ts.is_some_and(|until| secs > until) {
                return false;
            }
        }

        true
    }
}

/// Matching events in sheet order, at most `filters.limit` of them.
pub fn search_events<'a>(
    events: &'a [InventoryEvent],
    filters: &SearchFilters,
    tz: Tz,
) -> Vec<&'a InventoryEvent> {
    events
        .iter()
        .filter(|event| filters.matches(event, tz))
        .take(filters.limit)
        .collect()
}
