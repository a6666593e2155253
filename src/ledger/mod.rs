//! The ownership ledger: the list of events this visitor has submitted, and may therefore edit
//!
//! There are no accounts. Ownership is only tracked by a cookie that holds a URL-encoded JSON array of event IDs. \
//! Ownership tracking is a convenience, not a guarantee: failing to read the cookie or to fetch the canonical dataset never blocks anything, it only degrades the ownership view.
//!
//! A page load usually calls [`load_ownership`], which reads the cookie, fetches the canonical dataset, prunes the ledger and writes it back.

use std::fmt::{Display, Formatter};

use crate::EventId;
use crate::config::{OWNERSHIP_COOKIE_MAX_AGE, OWNERSHIP_COOKIE_NAME};
use crate::consent::ConsentRecord;
use crate::cookie::{SetCookie, decode_value, encode_value};
use crate::traits::{Clock, CookieJar, EventSource};

pub mod canonical;
pub use canonical::{CanonicalSnapshot, fetch_canonical};
mod reconcile;
pub use reconcile::reconcile;


/// An ordered set of event IDs.
///
/// Duplicates collapse. The insertion order is kept (so that the cookie payload is stable), but it has no meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnershipLedger {
    ids: Vec<EventId>,
}

impl OwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an ID. Returns `false` in case it was already there
    pub fn insert(&mut self, id: EventId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.ids.iter().any(|owned| owned == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Keep only the IDs for which `keep` returns `true`
    pub fn retain<F: FnMut(&EventId) -> bool>(&mut self, keep: F) {
        self.ids.retain(keep)
    }

    /// The cookie payload, before URL-encoding
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.ids)
    }

    /// Decode a raw cookie value
    fn decode(raw: &str) -> Result<Self, String> {
        let json = decode_value(raw)
            .map_err(|err| format!("invalid URL encoding: {}", err))?;
        let value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|err| format!("invalid JSON: {}", err))?;
        let members = match value {
            serde_json::Value::Array(members) => members,
            other => return Err(format!("expected an array, got {}", other)),
        };

        let mut ledger = Self::new();
        for member in members {
            let id = match member {
                serde_json::Value::String(s) => s.parse::<EventId>()?,
                other => return Err(format!("expected string members, got {}", other)),
            };
            ledger.insert(id);
        }
        Ok(ledger)
    }
}

impl std::iter::FromIterator<EventId> for OwnershipLedger {
    fn from_iter<I: IntoIterator<Item = EventId>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for id in iter {
            ledger.insert(id);
        }
        ledger
    }
}

impl Display for OwnershipLedger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.ids.iter().map(|id| id.as_str()).collect();
        write!(f, "[{}]", ids.join(", "))
    }
}


/// What reading the ownership cookie gave
#[derive(Clone, Debug, PartialEq)]
pub enum LedgerRead {
    /// There is no ownership cookie
    Absent,
    /// The cookie has been decoded
    Decoded(OwnershipLedger),
    /// The cookie exists but could not be decoded. It is treated as an empty ledger
    Degraded(String),
}

impl LedgerRead {
    /// The ledger this read stands for. Absent and degraded reads stand for an empty ledger
    pub fn into_ledger(self) -> OwnershipLedger {
        match self {
            LedgerRead::Decoded(ledger) => ledger,
            LedgerRead::Absent | LedgerRead::Degraded(_) => OwnershipLedger::new(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, LedgerRead::Degraded(_))
    }
}

/// What [`LedgerStore::write`] has done
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerWrite {
    /// The cookie has been set
    Stored,
    /// The ledger was empty, the cookie has been deleted
    Removed,
    /// Cookie consent has not been granted, nothing has been written
    Refused,
}


/// Reads and writes the ownership cookie.
///
/// This is the only thing that is allowed to write this cookie.
pub struct LedgerStore<'j, J: CookieJar> {
    jar: &'j J,
    domain: Option<String>,
}

impl<'j, J: CookieJar> LedgerStore<'j, J> {
    /// `domain` must match the domain the server uses when it sets this cookie by itself
    pub fn new(jar: &'j J, domain: Option<String>) -> Self {
        Self { jar, domain }
    }

    /// Decode the ownership cookie. This never fails, see [`LedgerRead`]
    pub fn read(&self) -> LedgerRead {
        let raw = match self.jar.get(OWNERSHIP_COOKIE_NAME) {
            None => return LedgerRead::Absent,
            Some(raw) => raw,
        };

        match OwnershipLedger::decode(&raw) {
            Ok(ledger) => {
                log::debug!("Ownership cookie holds {}", ledger);
                LedgerRead::Decoded(ledger)
            },
            Err(err) => {
                log::warn!("Ignoring unreadable ownership cookie: {}", err);
                LedgerRead::Degraded(err)
            },
        }
    }

    /// Persist a ledger.
    ///
    /// An empty ledger deletes the cookie. Otherwise, the cookie is (re-)set for 7 days, provided the visitor consented to cookies.
    pub fn write(&self, ledger: &OwnershipLedger) -> LedgerWrite {
        if ledger.is_empty() {
            log::debug!("Ownership ledger is empty, removing its cookie");
            self.jar.set(SetCookie::removal(OWNERSHIP_COOKIE_NAME, self.domain.clone()));
            return LedgerWrite::Removed;
        }

        if ConsentRecord::new(self.jar, self.domain.clone()).is_granted() == false {
            log::warn!("Not storing ownership of {} event(s): cookie consent has not been granted", ledger.len());
            return LedgerWrite::Refused;
        }

        let json = match ledger.to_json() {
            Ok(json) => json,
            Err(err) => {
                log::error!("Unable to serialize ownership ledger: {}", err);
                return LedgerWrite::Refused;
            },
        };
        self.jar.set(SetCookie::new(
            OWNERSHIP_COOKIE_NAME,
            encode_value(&json),
            OWNERSHIP_COOKIE_MAX_AGE,
            self.domain.clone(),
        ));
        log::debug!("Stored ownership ledger {}", ledger);
        LedgerWrite::Stored
    }

    /// Add an event to the ledger, e.g. after it has been successfully submitted
    pub fn remember(&self, id: EventId) -> LedgerWrite {
        let mut ledger = self.read().into_ledger();
        log::info!("Remembering ownership of event {}", id);
        ledger.insert(id);
        self.write(&ledger)
    }
}


/// The result of [`load_ownership`]
#[derive(Clone, Debug, PartialEq)]
pub struct OwnershipView {
    /// The events this visitor owns
    pub owned: OwnershipLedger,
    /// Whether the canonical dataset could be used to prune `owned`
    pub reconciled: bool,
}

/// What a page does on load: read the ledger, fetch the canonical dataset, prune expired events and persist the result.
///
/// The result is written back even when nothing has been pruned, so that the cookie lifetime slides with every visit.
///
/// In case the dataset is unavailable, the unreconciled ledger is returned and the cookie is left untouched.
pub async fn load_ownership<J, S, C>(store: &LedgerStore<'_, J>, source: &S, clock: &C) -> OwnershipView
where
    J: CookieJar,
    S: EventSource + ?Sized,
    C: Clock + ?Sized,
{
    let read = store.read();
    let had_cookie = matches!(read, LedgerRead::Decoded(_));
    let ledger = read.into_ledger();
    if ledger.is_empty() {
        // Nothing to reconcile, spare a request
        return OwnershipView { owned: ledger, reconciled: false };
    }

    let canonical = match fetch_canonical(source).await {
        CanonicalSnapshot::Available(events) => events,
        CanonicalSnapshot::Unavailable(reason) => {
            log::warn!("Canonical dataset is unavailable ({}), using unreconciled ownership data", reason);
            return OwnershipView { owned: ledger, reconciled: false };
        },
    };

    let pruned = reconcile(&ledger, &canonical, clock.today());
    if pruned != ledger {
        log::info!("Pruned ownership ledger from {} to {} event(s)", ledger.len(), pruned.len());
    }
    if had_cookie {
        // Every visit renews the 7-day lifetime
        store.write(&pruned);
    }
    OwnershipView { owned: pruned, reconciled: true }
}
