//! Properties of the ownership ledger that must hold for any cookie payload and any dataset

use scenarii::*;

use std::collections::{BTreeMap, HashMap};

use proptest::prelude::*;
use serde_json::Value;

use event_drop::{Event, EventId};
use event_drop::config::OWNERSHIP_COOKIE_NAME;
use event_drop::cookie::{MemoryCookieJar, encode_value};
use event_drop::ledger::{LedgerRead, LedgerStore, OwnershipLedger, reconcile};


fn event_id() -> impl Strategy<Value = EventId> {
    "[a-z0-9-]{1,6}".prop_map(|s| s.parse().unwrap())
}

fn ledger() -> impl Strategy<Value = OwnershipLedger> {
    proptest::collection::vec(event_id(), 0..12)
        .prop_map(|ids| ids.into_iter().collect())
}

/// Published events, dated up to 30 days around [`today`]
fn dataset() -> impl Strategy<Value = HashMap<EventId, Event>> {
    proptest::collection::vec((event_id(), -30..30i64), 0..12)
        .prop_map(|records| {
            records.into_iter()
                .map(|(id, offset)| {
                    let on = (today() + chrono::Duration::days(offset)).to_string();
                    (id.clone(), event(id.as_str(), &on))
                })
                .collect()
        })
}

/// Any JSON value that is not an array
fn non_array_json() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        ".*".prop_map(Value::String),
        proptest::collection::btree_map("[a-z]{1,4}", any::<i64>(), 0..4)
            .prop_map(|m: BTreeMap<String, i64>| Value::Object(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())),
    ]
}

/// A member that makes a ledger array invalid
fn bad_member() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::String(String::new())),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        proptest::collection::vec("[a-z]{1,4}".prop_map(Value::String), 0..3).prop_map(Value::Array),
    ]
}

fn read_raw(raw: &str) -> LedgerRead {
    let jar = MemoryCookieJar::with_cookie(OWNERSHIP_COOKIE_NAME, raw);
    let read = LedgerStore::new(&jar, None).read();
    read
}


proptest! {
    #[test]
    fn prop_reconcile_is_idempotent(owned in ledger(), canonical in dataset()) {
        let once = reconcile(&owned, &canonical, today());
        let twice = reconcile(&once, &canonical, today());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_reconcile_keeps_unknown_and_upcoming_ids(owned in ledger(), canonical in dataset()) {
        let pruned = reconcile(&owned, &canonical, today());
        for id in owned.iter() {
            match canonical.get(id) {
                None => prop_assert!(pruned.contains(id), "unknown id {} was dropped", id),
                Some(event) if event.date() < today() => prop_assert!(!pruned.contains(id), "past id {} was kept", id),
                Some(_) => prop_assert!(pruned.contains(id), "upcoming id {} was dropped", id),
            }
        }
        // Nothing is ever added
        prop_assert!(pruned.iter().all(|id| owned.contains(id)));
    }

    #[test]
    fn prop_non_array_payloads_read_as_empty(payload in non_array_json()) {
        let read = read_raw(&encode_value(&payload.to_string()));
        prop_assert!(read.is_degraded());
        prop_assert!(read.into_ledger().is_empty());
    }

    #[test]
    fn prop_one_bad_member_spoils_the_payload(
        ids in proptest::collection::vec("[a-z0-9]{1,6}", 0..6),
        bad in bad_member(),
        position in any::<prop::sample::Index>(),
    ) {
        let mut members: Vec<Value> = ids.into_iter().map(Value::String).collect();
        let at = position.index(members.len() + 1);
        members.insert(at, bad);

        let read = read_raw(&encode_value(&Value::Array(members).to_string()));
        prop_assert!(read.is_degraded());
        prop_assert!(read.into_ledger().is_empty());
    }

    #[test]
    fn prop_any_raw_value_reads_without_panicking(raw in ".*") {
        match read_raw(&raw) {
            LedgerRead::Decoded(owned) => prop_assert!(owned.iter().all(|id| id.as_str().is_empty() == false)),
            LedgerRead::Degraded(_) => {},
            LedgerRead::Absent => prop_assert!(false, "a cookie was set"),
        }
    }
}
