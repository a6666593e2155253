use std::collections::HashMap;

use chrono::NaiveDate;

use crate::{Event, EventId};
use super::OwnershipLedger;

/// Prune a ledger against the canonical dataset.
///
/// * an ID that is unknown to `canonical` is kept. The dataset is only rebuilt once a deployment finishes, so it may not contain an event that has just been submitted.
/// * a known ID is kept as long as its event takes place `today` or later.
///
/// Reconciling the output again against the same dataset gives the same ledger.
pub fn reconcile(ledger: &OwnershipLedger, canonical: &HashMap<EventId, Event>, today: NaiveDate) -> OwnershipLedger {
    let mut pruned = ledger.clone();
    pruned.retain(|id| {
        match canonical.get(id) {
            None => {
                log::debug!("Event {} is not published yet, keeping it", id);
                true
            },
            Some(event) => {
                let keep = event.is_upcoming(today);
                if keep == false {
                    log::debug!("Event {} took place on {}, forgetting it", id, event.date());
                }
                keep
            },
        }
    });
    pruned
}


#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EventId {
        s.parse().unwrap()
    }

    fn event(s: &str, date: NaiveDate) -> Event {
        Event::new(id(s), date, "10:00".into(), "11:00".into(), "T".into(), "L".into(), "R".into())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn dataset(events: Vec<Event>) -> HashMap<EventId, Event> {
        events.into_iter().map(|e| (e.id().clone(), e)).collect()
    }

    #[test]
    fn past_events_are_pruned_unknown_ones_kept() {
        let yesterday = today().pred_opt().unwrap();
        let canonical = dataset(vec![
            event("past", yesterday),
            event("today", today()),
            event("future", today().succ_opt().unwrap()),
        ]);
        let ledger: OwnershipLedger = vec![id("past"), id("unknown"), id("today"), id("future")].into_iter().collect();

        let pruned = reconcile(&ledger, &canonical, today());
        assert_eq!(pruned.iter().map(|id| id.as_str()).collect::<Vec<_>>(), vec!["unknown", "today", "future"]);
    }

    #[test]
    fn unknown_ids_survive_an_empty_dataset() {
        let ledger: OwnershipLedger = vec![id("a"), id("b")].into_iter().collect();
        assert_eq!(reconcile(&ledger, &HashMap::new(), today()), ledger);
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let dates = [-3i64, -1, 0, 1, 30];
        let mut events = Vec::new();
        for (i, offset) in dates.iter().enumerate() {
            events.push(event(&format!("e{}", i), today() + chrono::Duration::days(*offset)));
        }
        let canonical = dataset(events);

        let ledgers: Vec<OwnershipLedger> = vec![
            OwnershipLedger::new(),
            vec![id("e0"), id("e1"), id("e2"), id("e3"), id("e4")].into_iter().collect(),
            vec![id("x"), id("e1"), id("y"), id("e3")].into_iter().collect(),
            vec![id("e0")].into_iter().collect(),
        ];
        for ledger in ledgers {
            let once = reconcile(&ledger, &canonical, today());
            let twice = reconcile(&once, &canonical, today());
            assert_eq!(once, twice);
        }
    }
}
