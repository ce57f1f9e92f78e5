//! Binds generated identities to catalog entries.

use std::sync::Arc;
use std::time::Duration;

use super::Agent;
use crate::error::{Error, Result};
use crate::fingerprint::{Catalog, HeaderSet};
use crate::identity::{Generator, TokenFilter};
use crate::transport::connector::Verification;

/// Rolls agents from a generator and a catalog.
///
/// Every agent it returns carries headers and a ClientHello that the catalog
/// registers for the same (client, version).
#[derive(Debug, Clone)]
pub struct Roller {
    catalog: Arc<Catalog>,
    generator: Generator,
    verification: Verification,
}

impl Roller {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            generator: Generator::new(),
            verification: Verification::default(),
        }
    }

    /// Restrict the tokens identities may contain.
    pub fn with_filter(mut self, filter: TokenFilter) -> Self {
        self.generator = self.generator.with_filter(filter);
        self
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.generator = self.generator.with_length(length);
        self
    }

    /// Certificate policy handed to every rolled agent.
    pub fn with_verification(mut self, verification: Verification) -> Self {
        self.verification = verification;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Generate an identity for `seed` and bind it to the catalog.
    pub fn roll(&self, seed: u64, dial_timeout: Option<Duration>) -> Result<Agent> {
        let identity = self.generator.generate(seed);

        let (Some(client), Some(version)) = (identity.client.clone(), identity.version.clone())
        else {
            // Truncated identities never name a browser, so no entry can match.
            return Err(Error::UnfulfilledHeaderCondition {
                client: identity.client,
            });
        };

        let baseline = self
            .catalog
            .header_set_for(&client)
            .ok_or_else(|| Error::UnfulfilledHeaderCondition {
                client: Some(client.clone()),
            })?;
        let fingerprint = self
            .catalog
            .tls_fingerprint_for(&client, &version)
            .ok_or_else(|| Error::UnfulfilledTlsCondition {
                client: Some(client.clone()),
                version: Some(version.clone()),
            })?;

        // User-Agent leads, the baseline follows in catalog order.
        let mut headers = HeaderSet::new();
        headers.insert("User-Agent", identity.user_agent.clone());
        for (name, value) in baseline.iter() {
            if !name.eq_ignore_ascii_case("user-agent") {
                headers.insert(name, value);
            }
        }

        tracing::debug!(seed, %client, %version, user_agent = %identity.user_agent, "rolled agent");
        Ok(Agent::new(
            client,
            version,
            Arc::clone(fingerprint),
            headers,
            dial_timeout,
            self.verification.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::HeaderEntry;
    use crate::identity::{Token, TokenKind};

    fn firefox_105_roller(catalog: Catalog) -> Roller {
        Roller::new(Arc::new(catalog)).with_filter(TokenFilter::allow([
            Token::Mozilla5,
            Token::X11,
            Token::Linux,
            Token::X86_64,
            Token::Revision105,
            Token::Gecko20100101,
            Token::Firefox105,
        ]))
    }

    #[test]
    fn test_roll_binds_catalog_entries() {
        let catalog = Catalog::builtin();
        let agent = firefox_105_roller(catalog.clone()).roll(7, None).unwrap();
        assert_eq!(agent.client(), "Firefox");
        assert_eq!(agent.version(), "105.0");
        assert_eq!(
            agent.user_agent(),
            Some("Mozilla/5.0 (X11; Linux x86_64; rv:105.0) Gecko/20100101 Firefox/105.0")
        );
        let registered = catalog.tls_fingerprint_for("Firefox", "105.0").unwrap();
        assert_eq!(agent.fingerprint().as_ref(), registered.as_ref());
        assert_eq!(agent.headers().iter().next().map(|(k, _)| k), Some("User-Agent"));
        assert_eq!(agent.headers().get("dnt"), Some("1"));
    }

    #[test]
    fn test_missing_headers() {
        let err = firefox_105_roller(Catalog::new()).roll(7, None).unwrap_err();
        assert!(matches!(
            err,
            Error::UnfulfilledHeaderCondition { client: Some(ref c) } if c == "Firefox"
        ));
    }

    #[test]
    fn test_missing_tls() {
        let catalog = Catalog::new().with_headers(HeaderEntry {
            clients: vec!["Firefox".into()],
            headers: HeaderSet::new(),
        });
        let err = firefox_105_roller(catalog).roll(7, None).unwrap_err();
        assert!(matches!(err, Error::UnfulfilledTlsCondition { .. }));
    }

    #[test]
    fn test_truncated_identity_is_a_catalog_miss() {
        let roller = Roller::new(Arc::new(Catalog::builtin()))
            .with_filter(TokenFilter::kinds([TokenKind::BrowserIdentifier]));
        let err = roller.roll(1, None).unwrap_err();
        assert!(matches!(err, Error::UnfulfilledHeaderCondition { client: None }));
    }

    #[test]
    fn test_roll_is_deterministic() {
        let roller = Roller::new(Arc::new(Catalog::builtin()));
        for seed in 0..20 {
            match (roller.roll(seed, None), roller.roll(seed, None)) {
                (Ok(a), Ok(b)) => {
                    assert_eq!(a.user_agent(), b.user_agent());
                    assert_ne!(a.id(), b.id());
                }
                (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
                (a, b) => panic!("seed {} diverged: {:?} vs {:?}", seed, a, b),
            }
        }
    }
}
