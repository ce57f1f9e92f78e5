//! HTTP transport that sends every request through a pooled browser agent.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Uri, Version};
use tower::Service;

use crate::agent::{Agent, AgentPool, Roller};
use crate::error::{Error, Result};
use crate::fingerprint::{Catalog, HeaderSet};
use crate::identity::TokenFilter;
use crate::response::Response;
use crate::timeouts::{with_deadline, Timeouts};
use crate::transport::connector::{AlpnProtocol, Verification};
use crate::transport::{h1::H1Connection, h2};

/// Number of agents a [`RoundTripper`] keeps unless configured otherwise.
pub const DEFAULT_POOL_SIZE: usize = 4;

/// What a request produced, as seen by the bad-agent classifier.
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    Response(&'a Response),
    Error(&'a Error),
}

/// Decides whether an outcome means the agent should be rotated out.
pub type Classifier = Arc<dyn Fn(Outcome<'_>) -> bool + Send + Sync>;

/// Rotate agents whose handshake failed or stalled; keep them on any
/// response and on every other error.
pub fn default_classifier(outcome: Outcome<'_>) -> bool {
    matches!(outcome, Outcome::Error(err) if err.is_handshake_failure())
}

/// Where a request goes: socket address, TLS server name and `Host` value.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    addr: String,
    server_name: String,
    host: String,
    uri: Uri,
}

impl Target {
    fn from_uri(uri: &Uri) -> Result<Self> {
        match uri.scheme_str() {
            Some("https") | None => {}
            Some(other) => {
                return Err(Error::InvalidRequest(format!(
                    "scheme {:?} is not supported, agents only speak TLS",
                    other
                )))
            }
        }
        let authority = uri
            .authority()
            .ok_or_else(|| Error::InvalidRequest(format!("request URI {} has no host", uri)))?;
        let host = authority.host();
        if host.is_empty() {
            return Err(Error::InvalidRequest(format!("request URI {} has no host", uri)));
        }
        let port = authority.port_u16().unwrap_or(443);
        let server_name = host.trim_start_matches('[').trim_end_matches(']').to_string();
        let host_header = if port == 443 {
            host.to_string()
        } else {
            format!("{}:{}", host, port)
        };
        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        let uri = Uri::builder()
            .scheme("https")
            .authority(authority.as_str())
            .path_and_query(path)
            .build()
            .map_err(|e| Error::InvalidRequest(format!("invalid URI {}: {}", uri, e)))?;

        Ok(Self {
            addr: format!("{}:{}", host, port),
            server_name,
            host: host_header,
            uri,
        })
    }

    fn origin_form(&self) -> &str {
        self.uri.path_and_query().map(|p| p.as_str()).unwrap_or("/")
    }
}

/// Pluggable HTTP transport backed by an [`AgentPool`].
///
/// Each request checks out one agent, dials the target with the agent's
/// ClientHello, and speaks whichever protocol the server selected via ALPN.
#[derive(Clone)]
pub struct RoundTripper {
    pool: AgentPool,
    extra_headers: HeaderSet,
    classifier: Classifier,
    timeouts: Timeouts,
}

impl RoundTripper {
    pub fn builder() -> RoundTripperBuilder {
        RoundTripperBuilder::new()
    }

    /// Round tripper over the built-in catalog, rotating agents for which
    /// `classify` returns true on an error.
    pub fn new(
        dial_timeout: Duration,
        pool_size: usize,
        filter: TokenFilter,
        extra_headers: HeaderSet,
        classify: impl Fn(&Error) -> bool + Send + Sync + 'static,
    ) -> Result<Self> {
        Self::builder()
            .dial_timeout(dial_timeout)
            .pool_size(pool_size)
            .filter(filter)
            .headers(extra_headers)
            .classify_errors(classify)
            .build()
    }

    pub fn pool(&self) -> &AgentPool {
        &self.pool
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Close the agent pool; later requests fail with [`Error::PoolClosed`].
    pub fn close(&self) {
        self.pool.close();
    }

    /// Send `request` through one agent and return the full response.
    ///
    /// Header precedence, lowest first: the agent's baseline, the extra
    /// headers, the request's own headers. `Host` always names the target.
    pub async fn round_trip(&self, request: Request<Bytes>) -> Result<Response> {
        let target = Target::from_uri(request.uri())?;
        let work = self.pool.run(|agent| async move {
            let result = self.exchange(&agent, &target, request).await;
            let is_bad = match &result {
                Ok(response) => (self.classifier)(Outcome::Response(response)),
                Err(err) => (self.classifier)(Outcome::Error(err)),
            };
            if is_bad {
                tracing::debug!(agent = agent.id(), "classifier flagged agent as bad");
            }
            (is_bad, result)
        });
        with_deadline(self.timeouts.total, work, Error::TotalTimeout).await
    }

    async fn exchange(
        &self,
        agent: &Agent,
        target: &Target,
        request: Request<Bytes>,
    ) -> Result<Response> {
        let request_headers = HeaderSet::try_from(request.headers())?;
        let mut headers = agent.headers().clone();
        headers.merge(&self.extra_headers);
        headers.merge(&request_headers);
        headers.insert("Host", target.host.clone());

        let stream = agent
            .dial_tls_with_timeout(&target.addr, &target.server_name, self.timeouts.handshake)
            .await?;
        let alpn = stream.alpn();
        tracing::debug!(
            agent = agent.id(),
            addr = %target.addr,
            alpn = alpn.as_str(),
            "dispatching request"
        );

        let (mut parts, body) = request.into_parts();
        match alpn {
            AlpnProtocol::Http1 => {
                let mut conn = H1Connection::new(stream);
                conn.send_request(&parts.method, target.origin_form(), &headers, &body)
                    .await
            }
            AlpnProtocol::H2 | AlpnProtocol::None => {
                parts.version = Version::HTTP_2;
                parts.uri = target.uri.clone();
                parts.headers = headers.to_header_map()?;
                h2::send_request(stream, Request::from_parts(parts, body)).await
            }
            AlpnProtocol::Other(name) => Err(Error::UnsupportedProtocol(name)),
        }
    }
}

impl fmt::Debug for RoundTripper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundTripper")
            .field("pool", &self.pool)
            .field("extra_headers", &self.extra_headers)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl Service<Request<Bytes>> for RoundTripper {
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        if self.pool.is_closed() {
            Poll::Ready(Err(Error::PoolClosed))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let this = self.clone();
        Box::pin(async move { this.round_trip(request).await })
    }
}

/// Builder for [`RoundTripper`].
pub struct RoundTripperBuilder {
    pool_size: usize,
    seed: Option<u64>,
    filter: TokenFilter,
    length: Option<usize>,
    headers: HeaderSet,
    classifier: Classifier,
    catalog: Option<Arc<Catalog>>,
    verification: Verification,
    timeouts: Timeouts,
}

impl RoundTripperBuilder {
    pub fn new() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            seed: None,
            filter: TokenFilter::Any,
            length: None,
            headers: HeaderSet::new(),
            classifier: Arc::new(default_classifier),
            catalog: None,
            verification: Verification::default(),
            timeouts: Timeouts::api_defaults(),
        }
    }

    /// TCP connect timeout handed to every agent.
    pub fn dial_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.dial = Some(timeout);
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Seed for the pool's identities. Random when unset.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Restrict the tokens generated identities may contain.
    pub fn filter(mut self, filter: TokenFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Number of token slots per identity.
    pub fn identity_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Headers layered over each agent's baseline and under the request's.
    pub fn headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Bad-agent classifier over responses and errors.
    pub fn classify(mut self, f: impl Fn(Outcome<'_>) -> bool + Send + Sync + 'static) -> Self {
        self.classifier = Arc::new(f);
        self
    }

    /// Bad-agent classifier over errors only; responses never rotate.
    pub fn classify_errors(mut self, f: impl Fn(&Error) -> bool + Send + Sync + 'static) -> Self {
        self.classifier = Arc::new(move |outcome: Outcome<'_>| match outcome {
            Outcome::Error(err) => f(err),
            Outcome::Response(_) => false,
        });
        self
    }

    /// Catalog to bind identities against. [`Catalog::builtin`] when unset.
    pub fn catalog(mut self, catalog: Arc<Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn verification(mut self, verification: Verification) -> Self {
        self.verification = verification;
        self
    }

    /// Replace every timeout, including the dial timeout.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Roll the pool and build the round tripper.
    pub fn build(self) -> Result<RoundTripper> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool size must be at least 1".into()));
        }
        let catalog = self.catalog.unwrap_or_else(|| Arc::new(Catalog::builtin()));
        let mut roller = Roller::new(catalog)
            .with_filter(self.filter)
            .with_verification(self.verification);
        if let Some(length) = self.length {
            roller = roller.with_length(length);
        }
        let seed = self.seed.unwrap_or_else(rand::random);

        let pool = AgentPool::new(self.timeouts.dial, self.pool_size, roller, seed)?
            .with_acquire_timeout(self.timeouts.pool_acquire);
        tracing::debug!(size = self.pool_size, seed, "round tripper ready");

        Ok(RoundTripper {
            pool,
            extra_headers: self.headers,
            classifier: self.classifier,
            timeouts: self.timeouts,
        })
    }
}

impl Default for RoundTripperBuilder {
    fn default() -> Self {
        Self::new()
    }
}
