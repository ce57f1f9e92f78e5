//! Baseline browser headers.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ordered header list a browser sends on a top-level navigation.
///
/// Lookups are case-insensitive; inserting an existing name replaces the
/// value in place so the original position is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set `name`, replacing any existing value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Add `value` to `name`, folding it into an existing entry. Repeated
    /// values are comma-joined, except `Cookie` which joins with `; `.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(entry) => {
                let sep = if name.eq_ignore_ascii_case("cookie") { "; " } else { ", " };
                entry.1.push_str(sep);
                entry.1.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(pos).1)
    }

    /// Overlay `other` on top of `self`; values from `other` win.
    pub fn merge(&mut self, other: &HeaderSet) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into an `http::HeaderMap`, in order.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidRequest(format!("header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidRequest(format!("header value for {}: {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl TryFrom<&HeaderMap> for HeaderSet {
    type Error = Error;

    fn try_from(map: &HeaderMap) -> Result<Self> {
        let mut set = HeaderSet::new();
        for (name, value) in map {
            let value = value
                .to_str()
                .map_err(|e| Error::InvalidRequest(format!("header {}: {}", name, e)))?;
            set.append(name.as_str(), value);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overrides_case_insensitively() {
        let mut set: HeaderSet = [("Accept", "a"), ("DNT", "1")].into_iter().collect();
        set.insert("accept", "b");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("ACCEPT"), Some("b"));
        // position kept
        assert_eq!(set.iter().next(), Some(("Accept", "b")));
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base: HeaderSet = [("Accept", "a"), ("Connection", "keep-alive")].into_iter().collect();
        let extra: HeaderSet = [("accept", "b"), ("X-Extra", "1")].into_iter().collect();
        base.merge(&extra);
        assert_eq!(base.get("Accept"), Some("b"));
        assert_eq!(base.get("x-extra"), Some("1"));
        assert_eq!(base.get("Connection"), Some("keep-alive"));
    }

    #[test]
    fn test_from_header_map_keeps_repeated_values() {
        let mut map = HeaderMap::new();
        map.append("x-forwarded-for", HeaderValue::from_static("1.1.1.1"));
        map.append("x-forwarded-for", HeaderValue::from_static("2.2.2.2"));
        map.append("cookie", HeaderValue::from_static("a=1"));
        map.append("cookie", HeaderValue::from_static("b=2"));
        let set = HeaderSet::try_from(&map).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("X-Forwarded-For"), Some("1.1.1.1, 2.2.2.2"));
        assert_eq!(set.get("cookie"), Some("a=1; b=2"));
    }

    #[test]
    fn test_remove() {
        let mut set: HeaderSet = [("Host", "example.com")].into_iter().collect();
        assert_eq!(set.remove("host").as_deref(), Some("example.com"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_to_header_map_rejects_bad_value() {
        let set: HeaderSet = [("X-Bad", "line\nbreak")].into_iter().collect();
        assert!(set.to_header_map().is_err());
    }
}
