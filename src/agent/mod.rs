//! Spoofed browser agents.
//!
//! An [`Agent`] is one internally consistent browser identity: the baseline
//! headers and the ClientHello spec the catalog registers for the same
//! (client, version). [`Roller`] is the only way to build one, and
//! [`AgentPool`] keeps a fixed number of them in rotation.

mod pool;
mod roller;

pub use pool::AgentPool;
pub use roller::Roller;

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use boring::ssl::SslConnector;

use crate::error::{Error, Result};
use crate::fingerprint::{HeaderSet, TlsFingerprint};
use crate::transport::connector::{self, TlsStream, Verification};

static NEXT_AGENT_ID: AtomicU64 = AtomicU64::new(1);

/// One spoofed browser identity.
pub struct Agent {
    id: u64,
    client: String,
    version: String,
    fingerprint: Arc<TlsFingerprint>,
    headers: HeaderSet,
    dial_timeout: Option<Duration>,
    verification: Verification,
    /// Built on first dial; holds the TLS session cache.
    connector: Mutex<Option<SslConnector>>,
    stopped: AtomicBool,
}

impl Agent {
    pub(crate) fn new(
        client: String,
        version: String,
        fingerprint: Arc<TlsFingerprint>,
        headers: HeaderSet,
        dial_timeout: Option<Duration>,
        verification: Verification,
    ) -> Self {
        Self {
            id: NEXT_AGENT_ID.fetch_add(1, Ordering::Relaxed),
            client,
            version,
            fingerprint,
            headers,
            dial_timeout,
            verification,
            connector: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Process-unique identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn fingerprint(&self) -> &Arc<TlsFingerprint> {
        &self.fingerprint
    }

    /// Baseline headers with this identity's `User-Agent`.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get("User-Agent")
    }

    pub fn dial_timeout(&self) -> Option<Duration> {
        self.dial_timeout
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    /// Connect to `addr` (`host:port`) and run the spoofed handshake for
    /// `server_name`.
    pub async fn dial_tls(&self, addr: &str, server_name: &str) -> Result<TlsStream> {
        self.dial_tls_with_timeout(addr, server_name, None).await
    }

    /// Like [`Agent::dial_tls`], with a deadline on the TLS handshake.
    pub async fn dial_tls_with_timeout(
        &self,
        addr: &str,
        server_name: &str,
        handshake_timeout: Option<Duration>,
    ) -> Result<TlsStream> {
        let connector = self.connector()?;
        tracing::trace!(agent = self.id, client = %self.client, version = %self.version, addr, "dialing");
        connector::connect(
            &connector,
            addr,
            server_name,
            &self.verification,
            self.dial_timeout,
            handshake_timeout,
        )
        .await
    }

    fn connector(&self) -> Result<SslConnector> {
        if self.is_stopped() {
            return Err(Error::AgentStopped);
        }
        let mut slot = self.connector.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(connector) = slot.as_ref() {
            return Ok(connector.clone());
        }
        let connector = connector::build_connector(&self.fingerprint, &self.verification)?;
        *slot = Some(connector.clone());
        Ok(connector)
    }

    /// Drop the connector and its session cache. Later dials fail with
    /// [`Error::AgentStopped`]. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.connector
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        tracing::debug!(agent = self.id, client = %self.client, version = %self.version, "agent stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("version", &self.version)
            .field("user_agent", &self.user_agent())
            .field("dial_timeout", &self.dial_timeout)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::profiles;

    fn agent() -> Agent {
        Agent::new(
            "Firefox".into(),
            "105.0".into(),
            Arc::new(profiles::firefox_105()),
            profiles::firefox_headers(),
            Some(Duration::from_secs(1)),
            Verification::default(),
        )
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(agent().id(), agent().id());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let agent = agent();
        assert!(agent.connector().is_ok());
        agent.stop();
        agent.stop();
        assert!(agent.is_stopped());
        assert!(matches!(agent.connector(), Err(Error::AgentStopped)));
    }

    #[tokio::test]
    async fn test_stopped_agent_refuses_to_dial() {
        let agent = agent();
        agent.stop();
        let res = agent.dial_tls("127.0.0.1:1", "localhost").await;
        assert!(matches!(res, Err(Error::AgentStopped)));
    }
}
