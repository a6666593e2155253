//! Cookies, as written by this crate and as stored by a browser

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::traits::CookieJar;

/// Characters that are escaped in cookie values.
/// This mimics what browsers' `encodeURIComponent` does, so that the server can decode values the same way.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-').remove(b'_').remove(b'.').remove(b'!')
    .remove(b'~').remove(b'*').remove(b'\'').remove(b'(').remove(b')');

/// URL-encode a cookie value
pub fn encode_value(raw: &str) -> String {
    utf8_percent_encode(raw, COOKIE_VALUE).to_string()
}

/// URL-decode a cookie value. Fails in case the decoded bytes are not valid UTF-8
pub fn decode_value(encoded: &str) -> Result<String, std::str::Utf8Error> {
    percent_decode_str(encoded).decode_utf8().map(|cow| cow.into_owned())
}


/// A cookie to set (or to delete, when its `max_age` is zero)
///
/// Cookies written by this crate are always `Secure` and `SameSite=Strict`.
///
/// Its `Display` implementation renders it the way a `document.cookie` assignment or a `Set-Cookie` header expects it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    /// Already URL-encoded value
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub max_age: u64,
}

impl SetCookie {
    /// A secure, same-site-strict cookie valid for the whole site
    pub fn new(name: &str, value: String, max_age: u64, domain: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            value,
            path: "/".to_string(),
            domain,
            max_age,
        }
    }

    /// A cookie that removes any existing cookie with the same name
    pub fn removal(name: &str, domain: Option<String>) -> Self {
        Self::new(name, String::new(), 0, domain)
    }

    pub fn is_removal(&self) -> bool {
        self.max_age == 0
    }
}

impl Display for SetCookie {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}; Path={}; Max-Age={}", self.name, self.value, self.path, self.max_age)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        write!(f, "; Secure; SameSite=Strict")
    }
}


/// A [`CookieJar`] that lives in memory, and behaves like a browser would regarding `Max-Age=0`.
///
/// It also remembers every cookie string that has been written, so that tests can check the attributes.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    values: Mutex<HashMap<String, String>>,
    written: Mutex<Vec<String>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// A jar that already holds a cookie with the given raw value
    pub fn with_cookie(name: &str, raw_value: &str) -> Self {
        let jar = Self::new();
        if let Ok(mut values) = jar.values.lock() {
            values.insert(name.to_string(), raw_value.to_string());
        }
        jar
    }

    /// Every cookie string that has been written so far, oldest first
    pub fn written(&self) -> Vec<String> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// The last cookie string that has been written for a given cookie name
    pub fn last_written(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.written()
            .into_iter()
            .rev()
            .find(|line| line.starts_with(&prefix))
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.values.lock().ok()?.get(name).cloned()
    }

    fn set(&self, cookie: SetCookie) {
        if let Ok(mut written) = self.written.lock() {
            written.push(cookie.to_string());
        }
        if let Ok(mut values) = self.values.lock() {
            if cookie.is_removal() {
                values.remove(&cookie.name);
            } else {
                values.insert(cookie.name, cookie.value);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_encoded_like_encode_uri_component() {
        assert_eq!(encode_value(r#"["a b","ö"]"#), "%5B%22a%20b%22%2C%22%C3%B6%22%5D");
        assert_eq!(encode_value("keep-these_.!~*'()"), "keep-these_.!~*'()");
        assert_eq!(decode_value("%5B%22a%20b%22%5D").unwrap(), r#"["a b"]"#);
        assert!(decode_value("%FF%FE").is_err());
    }

    #[test]
    fn cookie_attributes() {
        let cookie = SetCookie::new("owned_events", "x".to_string(), 604800, Some("example.org".to_string()));
        assert_eq!(cookie.to_string(), "owned_events=x; Path=/; Max-Age=604800; Domain=example.org; Secure; SameSite=Strict");

        let removal = SetCookie::removal("owned_events", None);
        assert_eq!(removal.to_string(), "owned_events=; Path=/; Max-Age=0; Secure; SameSite=Strict");
    }

    #[test]
    fn memory_jar_honours_removals() {
        let jar = MemoryCookieJar::with_cookie("a", "1");
        assert_eq!(jar.get("a").as_deref(), Some("1"));
        jar.set(SetCookie::removal("a", None));
        assert_eq!(jar.get("a"), None);
        assert!(jar.last_written("a").unwrap().contains("Max-Age=0"));
    }
}
