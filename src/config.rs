//! Support for library configuration options

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use url::Url;

/// Name of the cookie that holds the ownership ledger.
/// The server uses the same name when it sets this cookie after a successful submission.
pub const OWNERSHIP_COOKIE_NAME: &str = "owned_events";

/// Name of the cookie that records the visitor's cookie-consent decision
pub const CONSENT_COOKIE_NAME: &str = "cookie_consent";

/// Lifetime of the ownership cookie, in seconds (7 days, renewed on every write)
pub const OWNERSHIP_COOKIE_MAX_AGE: u64 = 7 * 24 * 60 * 60;

/// Lifetime of the consent cookie, in seconds
pub const CONSENT_COOKIE_MAX_AGE: u64 = 365 * 24 * 60 * 60;

/// The `Domain` attribute of the ownership cookie.
///
/// It must equal the domain the server uses when it sets the same cookie. It defaults to the `EVENTS_COOKIE_DOMAIN` variable at build time.
/// Feel free to override it when initing this library.
pub static COOKIE_DOMAIN: Lazy<Arc<Mutex<Option<String>>>> = Lazy::new(|| {
    let domain = option_env!("EVENTS_COOKIE_DOMAIN")
        .filter(|d| d.is_empty() == false)
        .map(|d| d.to_string());
    Arc::new(Mutex::new(domain))
});

/// Read the current value of [`COOKIE_DOMAIN`]
pub fn cookie_domain() -> Option<String> {
    match COOKIE_DOMAIN.lock() {
        Ok(domain) => domain.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}


/// Where the site and its endpoints live
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    /// Root URL of the static site
    pub base_url: Url,
    /// Path of the canonical dataset
    pub events_path: String,
    /// Path of the endpoint that creates events
    pub submit_endpoint: String,
    /// Path of the endpoint that edits existing events
    pub edit_endpoint: String,
    /// Path of the page that edits an event. The event ID is appended as an `id` query parameter
    pub edit_page: String,
    /// `Domain` attribute for the ownership cookie
    pub cookie_domain: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost/").unwrap(/* this is a valid constant URL */),
            events_path: "/events.json".to_string(),
            submit_endpoint: "/add-event".to_string(),
            edit_endpoint: "/edit-event".to_string(),
            edit_page: "/redigera".to_string(),
            cookie_domain: cookie_domain(),
        }
    }
}

impl SiteConfig {
    /// Create a config with the default endpoints, for a site rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, Box<dyn Error>> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { base_url, ..Self::default() })
    }

    /// Load a config from a JSON file. Missing keys get their default value
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let config = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(config)
    }

    pub fn events_url(&self) -> Result<Url, Box<dyn Error>> {
        Ok(self.base_url.join(&self.events_path)?)
    }

    pub fn submit_url(&self) -> Result<Url, Box<dyn Error>> {
        Ok(self.base_url.join(&self.submit_endpoint)?)
    }

    pub fn edit_url(&self) -> Result<Url, Box<dyn Error>> {
        Ok(self.base_url.join(&self.edit_endpoint)?)
    }

    /// The site-relative link to the edit page of an event
    pub fn edit_link_for(&self, id: &crate::EventId) -> String {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id", id.as_str())
            .finish();
        format!("{}?{}", self.edit_page, query)
    }
}
