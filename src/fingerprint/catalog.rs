//! Lookup table binding browser (client, version) pairs to headers and
//! ClientHello specs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::headers::HeaderSet;
use super::profiles;
use super::tls::TlsFingerprint;
use crate::error::{Error, Result};

/// Baseline headers shared by the listed clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub clients: Vec<String>,
    pub headers: HeaderSet,
}

/// ClientHello spec shared by the listed (client, version) combinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsEntry {
    pub clients: Vec<String>,
    pub versions: Vec<String>,
    pub fingerprint: Arc<TlsFingerprint>,
}

/// Immutable catalog of browser fingerprints.
///
/// Built once (from [`Catalog::builtin`] or JSON) and shared by reference.
/// Lookups return the first matching entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub headers: Vec<HeaderEntry>,
    pub tls: Vec<TlsEntry>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Catalog {
    /// Empty catalog; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog covering every client/version the identity grammar emits.
    pub fn builtin() -> Self {
        let safari = Arc::new(profiles::safari());
        Self {
            headers: vec![
                HeaderEntry {
                    clients: strings(&["Firefox"]),
                    headers: profiles::firefox_headers(),
                },
                HeaderEntry {
                    clients: strings(&["Safari"]),
                    headers: profiles::safari_headers(),
                },
                HeaderEntry {
                    clients: strings(&["FxiOS"]),
                    headers: profiles::fxios_headers(),
                },
            ],
            tls: vec![
                TlsEntry {
                    clients: strings(&["Firefox"]),
                    versions: strings(&["99.0"]),
                    fingerprint: Arc::new(profiles::firefox_99()),
                },
                TlsEntry {
                    clients: strings(&["Firefox"]),
                    versions: strings(&["102.0"]),
                    fingerprint: Arc::new(profiles::firefox_102()),
                },
                TlsEntry {
                    clients: strings(&["Firefox"]),
                    versions: strings(&["105.0"]),
                    fingerprint: Arc::new(profiles::firefox_105()),
                },
                TlsEntry {
                    clients: strings(&["Safari"]),
                    versions: strings(&["15.6.1", "16.5.2", "16.6.1"]),
                    fingerprint: Arc::clone(&safari),
                },
                TlsEntry {
                    clients: strings(&["FxiOS"]),
                    versions: strings(&["99.0", "102.0", "105.0"]),
                    fingerprint: safari,
                },
            ],
        }
    }

    /// Load a catalog from JSON, rejecting invalid fingerprints.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        for entry in &self.tls {
            if entry.clients.is_empty() || entry.versions.is_empty() {
                return Err(Error::InvalidConfig(
                    "TLS entry must name at least one client and version".into(),
                ));
            }
            entry.fingerprint.validate()?;
        }
        if self.headers.iter().any(|e| e.clients.is_empty()) {
            return Err(Error::InvalidConfig("header entry must name a client".into()));
        }
        Ok(())
    }

    pub fn with_headers(mut self, entry: HeaderEntry) -> Self {
        self.headers.push(entry);
        self
    }

    pub fn with_tls(mut self, entry: TlsEntry) -> Self {
        self.tls.push(entry);
        self
    }

    /// Baseline headers for `client`.
    pub fn header_set_for(&self, client: &str) -> Option<&HeaderSet> {
        self.headers
            .iter()
            .find(|e| e.clients.iter().any(|c| c == client))
            .map(|e| &e.headers)
    }

    /// ClientHello spec registered for exactly `(client, version)`.
    pub fn tls_fingerprint_for(&self, client: &str, version: &str) -> Option<&Arc<TlsFingerprint>> {
        self.tls
            .iter()
            .find(|e| e.clients.iter().any(|c| c == client) && e.versions.iter().any(|v| v == version))
            .map(|e| &e.fingerprint)
    }

    /// Every registered (client, version) pair.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tls.iter().flat_map(|e| {
            e.clients.iter().flat_map(move |c| e.versions.iter().map(move |v| (c.as_str(), v.as_str())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Token, TokenKind};

    #[test]
    fn test_builtin_covers_every_browser_token() {
        let catalog = Catalog::builtin();
        for token in Token::ALL.iter().filter(|t| t.kind().is_browser()) {
            let (client, version) = (token.client().unwrap(), token.version().unwrap());
            assert!(catalog.header_set_for(client).is_some(), "no headers for {}", client);
            assert!(
                catalog.tls_fingerprint_for(client, version).is_some(),
                "no TLS spec for {} {}",
                client,
                version
            );
        }
    }

    #[test]
    fn test_fxios_shares_safari_hello() {
        let catalog = Catalog::builtin();
        let fxios = catalog.tls_fingerprint_for("FxiOS", "105.0").unwrap();
        let safari = catalog.tls_fingerprint_for("Safari", "16.6.1").unwrap();
        assert!(Arc::ptr_eq(fxios, safari));
        let firefox = catalog.tls_fingerprint_for("Firefox", "105.0").unwrap();
        assert!(!Arc::ptr_eq(fxios, firefox));
    }

    #[test]
    fn test_misses() {
        let catalog = Catalog::builtin();
        assert!(catalog.header_set_for("Chrome").is_none());
        assert!(catalog.tls_fingerprint_for("Firefox", "16.6.1").is_none());
        assert!(Catalog::new().header_set_for("Firefox").is_none());
    }

    #[test]
    fn test_json_round_trip_preserves_lookups() {
        let catalog = Catalog::builtin();
        let loaded = Catalog::from_json(&catalog.to_json().unwrap()).unwrap();
        assert_eq!(loaded, catalog);
        assert_eq!(
            loaded.header_set_for("Firefox").and_then(|h| h.get("dnt")),
            Some("1")
        );
    }

    #[test]
    fn test_from_json_rejects_invalid_fingerprint() {
        let json = r#"{
            "headers": [],
            "tls": [{
                "clients": ["Firefox"],
                "versions": ["1.0"],
                "fingerprint": {
                    "min_version": 772,
                    "max_version": 771,
                    "cipher_suites": [49195],
                    "extensions": []
                }
            }]
        }"#;
        assert!(matches!(Catalog::from_json(json), Err(Error::InvalidConfig(_))));
        assert!(matches!(Catalog::from_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn test_pairs() {
        let pairs: Vec<_> = Catalog::builtin().pairs().collect();
        assert_eq!(pairs.len(), 9);
        assert!(pairs.contains(&("FxiOS", "99.0")));
        let kinds = [TokenKind::Firefox, TokenKind::FirefoxMobile, TokenKind::Safari];
        assert_eq!(kinds.iter().map(|k| Token::of_kind(*k).count()).sum::<usize>(), pairs.len());
    }
}
