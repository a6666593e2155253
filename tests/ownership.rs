//! What happens on page load: the ownership cookie is read, pruned against the canonical dataset, and edit links are added.

use scenarii::*;

use std::sync::Arc;

use minidom::Element;

use event_drop::annotator::{EDIT_LINK_CLASS, annotate};
use event_drop::config::{OWNERSHIP_COOKIE_NAME, SiteConfig};
use event_drop::cookie::MemoryCookieJar;
use event_drop::ledger::{LedgerStore, OwnershipLedger, load_ownership};
use event_drop::mock::{MockBehaviour, MockServer};
use event_drop::submission::EventSubmission;
use event_drop::traits::{CookieJar, EventSource, SubmissionTransport};
use event_drop::validation::FormFields;


fn ids(ledger: &OwnershipLedger) -> Vec<&str> {
    ledger.iter().map(|id| id.as_str()).collect()
}

fn ownership_writes(jar: &MemoryCookieJar) -> Vec<String> {
    jar.written().into_iter()
        .filter(|w| w.starts_with(OWNERSHIP_COOKIE_NAME))
        .collect()
}

#[tokio::test]
async fn expired_events_are_pruned() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = MockServer::new();
    server.add_published(event("past", "2026-10-10"));
    server.add_published(event("today", "2026-10-16"));
    server.add_published(event("future", "2026-11-01"));

    let jar = owner_jar(&["past", "today", "future", "unpublished"]);
    let store = LedgerStore::new(&jar, None);
    let view = load_ownership(&store, &server, &clock()).await;

    assert!(view.reconciled);
    assert_eq!(ids(&view.owned), vec!["today", "future", "unpublished"]);

    // The cookie has been rewritten, with a renewed lifetime
    assert_eq!(store.read().into_ledger(), view.owned);
    let written = jar.last_written(OWNERSHIP_COOKIE_NAME).unwrap();
    assert!(written.contains("Max-Age=604800"));

    // Running it again prunes nothing more, but still renews the cookie
    let n_writes = ownership_writes(&jar).len();
    let again = load_ownership(&store, &server, &clock()).await;
    assert_eq!(again.owned, view.owned);
    assert_eq!(ownership_writes(&jar).len(), n_writes + 1);
    assert_eq!(jar.last_written(OWNERSHIP_COOKIE_NAME), Some(written));
}

#[tokio::test]
async fn regular_visits_keep_the_cookie_alive() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = MockServer::new();
    server.add_published(event("far", "2026-11-06"));
    let jar = owner_jar(&["far"]);
    let store = LedgerStore::new(&jar, None);

    // A visit a day for three weeks: nothing gets pruned, yet every visit renews the 7-day lifetime
    for day in 0..21 {
        let view = load_ownership(&store, &server, &clock_in_days(day)).await;
        assert_eq!(ids(&view.owned), vec!["far"]);
        assert_eq!(ownership_writes(&jar).len(), day as usize + 1);
        assert!(jar.last_written(OWNERSHIP_COOKIE_NAME).unwrap().contains("Max-Age=604800"));
    }
}

#[tokio::test]
async fn deployment_lag_is_tolerated() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = MockServer::new();
    let jar = owner_jar(&[]);
    let store = LedgerStore::new(&jar, None);

    let form = FormFields { date: "2026-10-18".to_string(), ..valid_form() };
    let response = server.create_event(&EventSubmission::from_form(&form, "Kim", None)).await.unwrap();
    let new_id = id(&response.id.unwrap());
    store.remember(new_id.clone());

    // The site has not been rebuilt yet: the new event is unknown, and kept
    let view = load_ownership(&store, &server, &clock()).await;
    assert!(view.reconciled);
    assert!(view.owned.contains(&new_id));

    // Days go by, the site is still not rebuilt: still kept
    let view = load_ownership(&store, &server, &clock_in_days(30)).await;
    assert!(view.owned.contains(&new_id));

    // Once it is published, it is kept until it has passed
    server.publish();
    let view = load_ownership(&store, &server, &clock_in_days(2)).await;
    assert!(view.owned.contains(&new_id));

    let view = load_ownership(&store, &server, &clock_in_days(3)).await;
    assert!(view.owned.is_empty());
    assert!(jar.get(OWNERSHIP_COOKIE_NAME).is_none());
    assert!(jar.last_written(OWNERSHIP_COOKIE_NAME).unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn unavailable_dataset_keeps_the_cookie() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = MockServer::with_behaviour(MockBehaviour::fail_now(1));
    server.add_published(event("past", "2026-10-10"));

    let jar = owner_jar(&["past", "b"]);
    let store = LedgerStore::new(&jar, None);
    let view = load_ownership(&store, &server, &clock()).await;

    assert!(view.reconciled == false);
    assert_eq!(ids(&view.owned), vec!["past", "b"]);
    assert!(ownership_writes(&jar).is_empty());

    // Next page load works
    let view = load_ownership(&store, &server, &clock()).await;
    assert!(view.reconciled);
    assert_eq!(ids(&view.owned), vec!["b"]);
}

#[tokio::test]
async fn no_fetch_without_ownership() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = MockServer::with_behaviour(MockBehaviour::fail_now(1));

    for jar in vec![fresh_jar(), MemoryCookieJar::with_cookie(OWNERSHIP_COOKIE_NAME, "%5Bnot-json")] {
        let store = LedgerStore::new(&jar, None);
        let view = load_ownership(&store, &server, &clock()).await;
        assert!(view.owned.is_empty());
        assert!(jar.written().is_empty());
    }

    // The single scheduled failure has not been consumed: the dataset has never been requested
    assert!(server.fetch_events().await.is_err());
    assert!(server.fetch_events().await.is_ok());
}

#[tokio::test]
async fn owned_rows_get_edit_links() {
    let _ = env_logger::builder().is_test(true).try_init();

    let server = Arc::new(MockServer::new());
    server.add_published(event("past", "2026-10-10"));
    server.add_published(event("mine", "2026-10-20"));
    server.add_published(event("theirs", "2026-10-21"));

    let jar = owner_jar(&["past", "mine"]);
    let store = LedgerStore::new(&jar, None);
    let view = load_ownership(&store, &server, &clock()).await;

    let mut page: Element = r#"<section xmlns="http://www.w3.org/1999/xhtml">
        <article data-event-id="past" data-event-date="2026-10-10"><h2>Past</h2></article>
        <article data-event-id="mine" data-event-date="2026-10-20"><h2>Mine</h2></article>
        <article data-event-id="theirs" data-event-date="2026-10-21"><h2>Theirs</h2></article>
    </section>"#.parse().unwrap();
    let config = SiteConfig::new("https://example.org/").unwrap();
    assert_eq!(annotate(&mut page, &view.owned, today(), &config), 1);

    let links: Vec<(&str, &str)> = page.children()
        .flat_map(|row| row.children().map(move |child| (row, child)))
        .filter(|(_, child)| child.name() == "a")
        .map(|(row, child)| (row.attr("data-event-id").unwrap(), child.attr("href").unwrap()))
        .collect();
    assert_eq!(links, vec![("mine", "/redigera?id=mine")]);
    let link = page.children().nth(1).unwrap().children().find(|c| c.name() == "a").unwrap();
    assert_eq!(link.attr("class"), Some(EDIT_LINK_CLASS));
}
