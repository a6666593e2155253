//! The canonical dataset, i.e. the list of events that are currently published on the site

use std::collections::HashMap;

use crate::{Event, EventId};
use crate::traits::EventSource;

/// What fetching the canonical dataset gave
#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalSnapshot {
    /// Published events, by ID
    Available(HashMap<EventId, Event>),
    /// The dataset could not be fetched or decoded
    Unavailable(String),
}

impl CanonicalSnapshot {
    pub fn is_available(&self) -> bool {
        matches!(self, CanonicalSnapshot::Available(_))
    }
}

/// Fetch the canonical dataset. This never fails, see [`CanonicalSnapshot`].
///
/// Malformed records are skipped, the rest of the dataset is still used.
pub async fn fetch_canonical<S: EventSource + ?Sized>(source: &S) -> CanonicalSnapshot {
    let records = match source.fetch_events().await {
        Err(err) => {
            log::warn!("Unable to fetch the canonical dataset: {}", err);
            return CanonicalSnapshot::Unavailable(err.to_string());
        },
        Ok(records) => records,
    };

    CanonicalSnapshot::Available(index_records(records))
}

fn index_records(records: Vec<serde_json::Value>) -> HashMap<EventId, Event> {
    let mut events = HashMap::new();
    for record in records {
        let event: Event = match serde_json::from_value(record) {
            Err(err) => {
                log::warn!("Ignoring malformed event in the canonical dataset: {}", err);
                continue;
            },
            Ok(event) => event,
        };
        if let Some(previous) = events.insert(event.id().clone(), event) {
            log::warn!("Duplicate event ID {} in the canonical dataset, keeping the last one", previous.id());
        }
    }
    events
}
