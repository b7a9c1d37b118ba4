//! Origins and the cookie collaborator

use std::cell::RefCell;
use std::collections::HashMap;

use url::Url;

/// Security origin of a document
///
/// `about:`, `data:` and unparseable URLs get a fresh opaque origin that is
/// only same-origin with itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityOrigin(url::Origin);

impl SecurityOrigin {
    pub fn from_url(url: &Url) -> Self {
        Self(url.origin())
    }

    pub fn opaque() -> Self {
        Self(url::Origin::new_opaque())
    }

    pub fn is_opaque(&self) -> bool {
        !self.0.is_tuple()
    }

    /// Basic same-origin check
    pub fn can_access(&self, other: &SecurityOrigin) -> bool {
        self.0 == other.0
    }

    pub fn host(&self) -> Option<String> {
        match &self.0 {
            url::Origin::Tuple(_, host, _) => Some(host.to_string()),
            url::Origin::Opaque(_) => None,
        }
    }

    /// `scheme://host[:port]`, or `null` when opaque
    pub fn serialize(&self) -> String {
        self.0.ascii_serialization()
    }
}

/// Cookie storage reached through `document.cookie`
pub trait CookieJar {
    /// `name=value` pairs visible to `url`, joined with `; `
    fn cookies(&self, url: &Url) -> String;

    /// Store one `Set-Cookie`-style string
    fn set_cookie(&self, url: &Url, cookie: &str);
}

/// In-memory jar keyed by host; attributes after the first `;` are ignored
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    by_host: RefCell<HashMap<String, Vec<(String, String)>>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn cookies(&self, url: &Url) -> String {
        let Some(host) = url.host_str() else {
            return String::new();
        };
        self.by_host
            .borrow()
            .get(host)
            .map(|pairs| {
                pairs
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default()
    }

    fn set_cookie(&self, url: &Url, cookie: &str) {
        let Some(host) = url.host_str() else { return };
        let pair = cookie.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            tracing::debug!(cookie, "Ignoring cookie without '='");
            return;
        };
        let (name, value) = (name.trim().to_string(), value.trim().to_string());
        if name.is_empty() {
            return;
        }

        let mut by_host = self.by_host.borrow_mut();
        let pairs = by_host.entry(host.to_string()).or_default();
        match pairs.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => pairs.push((name, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_origin() {
        let a = SecurityOrigin::from_url(&url("https://example.com/a"));
        let b = SecurityOrigin::from_url(&url("https://example.com:443/b?q"));
        let c = SecurityOrigin::from_url(&url("http://example.com/"));

        assert!(a.can_access(&b));
        assert!(!a.can_access(&c));
        assert_eq!(a.host().as_deref(), Some("example.com"));
        assert_eq!(a.serialize(), "https://example.com");
    }

    #[test]
    fn test_opaque_origins() {
        let blank = SecurityOrigin::from_url(&url("about:blank"));
        assert!(blank.is_opaque());
        assert!(blank.can_access(&blank.clone()));
        assert!(!blank.can_access(&SecurityOrigin::opaque()));
        assert_eq!(blank.serialize(), "null");
    }

    #[test]
    fn test_memory_cookie_jar() {
        let jar = MemoryCookieJar::new();
        let page = url("https://example.com/");
        jar.set_cookie(&page, "a=1; Path=/");
        jar.set_cookie(&page, "b=2");
        jar.set_cookie(&page, "a=3");
        jar.set_cookie(&page, "garbage");

        assert_eq!(jar.cookies(&page), "a=3; b=2");
        assert_eq!(jar.cookies(&url("https://other.com/")), "");
    }
}
