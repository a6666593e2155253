//! Adds "edit" links to the event rows of a rendered page, for the events this visitor owns
//!
//! The page is produced by the site build. Every element that stands for an event carries two markers:
//! [`EVENT_ID_ATTR`] and [`EVENT_DATE_ATTR`] (an ISO date).

use chrono::NaiveDate;
use minidom::Element;

use crate::EventId;
use crate::config::SiteConfig;
use crate::event::is_upcoming;
use crate::ledger::OwnershipLedger;

pub const EVENT_ID_ATTR: &str = "data-event-id";
pub const EVENT_DATE_ATTR: &str = "data-event-date";

/// The class of the injected links. It is also used to detect links that have already been injected
pub const EDIT_LINK_CLASS: &str = "edit-link";

const EDIT_LINK_LABEL: &str = "Redigera";


/// Walk a rendered page, and add an edit link to every upcoming event row that `owned` contains.
///
/// Rows that are `<details>` disclosures get their link in their `<summary>`, so that it is visible without expanding them. \
/// Calling this again on the same tree does not add a second link to a row.
///
/// Returns how many links have been added.
pub fn annotate(root: &mut Element, owned: &OwnershipLedger, today: NaiveDate, config: &SiteConfig) -> usize {
    if owned.is_empty() {
        return 0;
    }
    let mut added = 0;
    annotate_element(root, owned, today, config, &mut added);
    log::debug!("Added {} edit link(s)", added);
    added
}

fn annotate_element(element: &mut Element, owned: &OwnershipLedger, today: NaiveDate, config: &SiteConfig, added: &mut usize) {
    if let Some(id) = owned_upcoming_event(element, owned, today) {
        let href = config.edit_link_for(&id);
        if element.name() == "details" {
            match element.children_mut().find(|child| child.name() == "summary") {
                Some(summary) => {
                    if inject_link(summary, &href) {
                        *added += 1;
                    }
                },
                None => log::warn!("Event row {} is a <details> without <summary>, not adding an edit link", id),
            }
        } else if inject_link(element, &href) {
            *added += 1;
        }
    }

    for child in element.children_mut() {
        annotate_element(child, owned, today, config, added);
    }
}

/// The ID of the event this element stands for, in case it is owned and has not passed
fn owned_upcoming_event(element: &Element, owned: &OwnershipLedger, today: NaiveDate) -> Option<EventId> {
    let id: EventId = element.attr(EVENT_ID_ATTR)?.parse().ok()?;
    if owned.contains(&id) == false {
        return None;
    }

    let date = match element.attr(EVENT_DATE_ATTR).map(|d| d.parse::<NaiveDate>()) {
        Some(Ok(date)) => date,
        _ => {
            log::warn!("Event row {} has no valid {}, not adding an edit link", id, EVENT_DATE_ATTR);
            return None;
        },
    };

    if is_upcoming(date, today) {
        Some(id)
    } else {
        None
    }
}

fn has_edit_link(element: &Element) -> bool {
    element.children().any(|child| {
        child.name() == "a"
            && child.attr("class").map(|classes| classes.split_whitespace().any(|c| c == EDIT_LINK_CLASS)) == Some(true)
    })
}

/// Append an edit link to an element. Returns `false` in case it already had one
fn inject_link(target: &mut Element, href: &str) -> bool {
    if has_edit_link(target) {
        return false;
    }
    let mut link = Element::builder("a", target.ns())
        .attr("class", EDIT_LINK_CLASS)
        .attr("href", href)
        .build();
    link.append_text_node(EDIT_LINK_LABEL);
    target.append_child(link);
    true
}
