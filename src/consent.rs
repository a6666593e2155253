//! The visitor's cookie-consent decision
//!
//! Consent only governs whether the ownership cookie may be written. It never prevents an event from being submitted.

use std::fmt::{Display, Formatter};

use crate::config::{CONSENT_COOKIE_MAX_AGE, CONSENT_COOKIE_NAME, OWNERSHIP_COOKIE_NAME};
use crate::cookie::SetCookie;
use crate::traits::CookieJar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentDecision {
    Accepted,
    Declined,
}

impl ConsentDecision {
    fn as_cookie_value(&self) -> &'static str {
        match self {
            ConsentDecision::Accepted => "accepted",
            ConsentDecision::Declined => "declined",
        }
    }

    fn from_cookie_value(value: &str) -> Option<Self> {
        match value {
            "accepted" => Some(ConsentDecision::Accepted),
            "declined" => Some(ConsentDecision::Declined),
            _ => None,
        }
    }
}

impl Display for ConsentDecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_cookie_value())
    }
}


/// Reads and records the consent decision, in its own cookie
pub struct ConsentRecord<'j, J: CookieJar> {
    jar: &'j J,
    domain: Option<String>,
}

impl<'j, J: CookieJar> ConsentRecord<'j, J> {
    pub fn new(jar: &'j J, domain: Option<String>) -> Self {
        Self { jar, domain }
    }

    /// The decision on record, or `None` in case the visitor has never been asked (or the record is unreadable)
    pub fn decision(&self) -> Option<ConsentDecision> {
        let raw = self.jar.get(CONSENT_COOKIE_NAME)?;
        let decision = ConsentDecision::from_cookie_value(&raw);
        if decision.is_none() {
            log::warn!("Ignoring unexpected consent cookie value {:?}", raw);
        }
        decision
    }

    pub fn is_granted(&self) -> bool {
        self.decision() == Some(ConsentDecision::Accepted)
    }

    /// Store a decision.
    ///
    /// A declined consent is recorded as well, so that the visitor is not asked again. Declining also removes any existing ownership cookie.
    pub fn record(&self, decision: ConsentDecision) {
        log::info!("Recording cookie consent: {}", decision);
        self.jar.set(SetCookie::new(
            CONSENT_COOKIE_NAME,
            decision.as_cookie_value().to_string(),
            CONSENT_COOKIE_MAX_AGE,
            self.domain.clone(),
        ));
        if decision == ConsentDecision::Declined {
            self.remove_ownership_cookie();
        }
    }

    /// Forget the decision, e.g. when the visitor withdraws their consent.
    ///
    /// The ownership ledger is governed by this consent, so it is destroyed as well.
    pub fn revoke(&self) {
        log::info!("Cookie consent revoked");
        self.jar.set(SetCookie::removal(CONSENT_COOKIE_NAME, self.domain.clone()));
        self.remove_ownership_cookie();
    }

    fn remove_ownership_cookie(&self) {
        if self.jar.get(OWNERSHIP_COOKIE_NAME).is_some() {
            self.jar.set(SetCookie::removal(OWNERSHIP_COOKIE_NAME, self.domain.clone()));
        }
    }
}
