//! Timeout configuration for agents and requests.
//!
//! # Timeout Types
//!
//! - **dial**: TCP connect to the target
//! - **handshake**: TLS handshake once the socket is open
//! - **total**: Absolute deadline for checkout, handshake and exchange
//! - **pool_acquire**: Time to wait for an idle agent
//!
//! # Usage
//!
//! ```rust,ignore
//! use fakebro::{RoundTripper, Timeouts};
//! use std::time::Duration;
//!
//! let rt = RoundTripper::builder()
//!     .timeouts(Timeouts::api_defaults().handshake(Duration::from_secs(5)))
//!     .build()?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Timeout configuration.
///
/// All timeouts are optional. When `None`, no timeout is applied for that phase.
/// None of them reset: each is a deadline for its phase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Timeout for the TCP connect, handed to every agent the pool rolls.
    ///
    /// Default: 10s for api_defaults()
    pub dial: Option<Duration>,

    /// Timeout for the TLS handshake.
    ///
    /// Default: 10s for api_defaults()
    pub handshake: Option<Duration>,

    /// Total request deadline: absolute time limit for the whole round trip,
    /// including the wait for an agent.
    ///
    /// Default: 120s for api_defaults()
    pub total: Option<Duration>,

    /// Pool acquire timeout: time waiting for an idle agent.
    ///
    /// Under high load, this prevents requests from queueing indefinitely.
    ///
    /// Default: 5s for api_defaults()
    pub pool_acquire: Option<Duration>,
}

impl Timeouts {
    /// Create a new Timeouts with all timeouts set to None.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensible defaults for normal API calls.
    ///
    /// - dial: 10s
    /// - handshake: 10s
    /// - total: 120s
    /// - pool_acquire: 5s
    pub fn api_defaults() -> Self {
        Self {
            dial: Some(Duration::from_secs(10)),
            handshake: Some(Duration::from_secs(10)),
            total: Some(Duration::from_secs(120)),
            pool_acquire: Some(Duration::from_secs(5)),
        }
    }

    /// Set dial timeout.
    pub fn dial(mut self, timeout: Duration) -> Self {
        self.dial = Some(timeout);
        self
    }

    /// Set handshake timeout.
    pub fn handshake(mut self, timeout: Duration) -> Self {
        self.handshake = Some(timeout);
        self
    }

    /// Set total request deadline.
    pub fn total(mut self, timeout: Duration) -> Self {
        self.total = Some(timeout);
        self
    }

    /// Set pool acquire timeout.
    pub fn pool_acquire(mut self, timeout: Duration) -> Self {
        self.pool_acquire = Some(timeout);
        self
    }

    /// Disable total timeout.
    pub fn no_total_timeout(mut self) -> Self {
        self.total = None;
        self
    }

    /// Disable pool acquire timeout.
    pub fn no_pool_acquire_timeout(mut self) -> Self {
        self.pool_acquire = None;
        self
    }
}

/// Run `fut` under an optional deadline, mapping expiry with `on_timeout`.
pub(crate) async fn with_deadline<T, F>(
    limit: Option<Duration>,
    fut: F,
    on_timeout: impl FnOnce(Duration) -> Error,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit))),
        None => fut.await,
    }
}
