//! # fakebro
//!
//! Fake browser identities for outbound HTTPS.
//!
//! A seeded generator assembles a browser User-Agent from a token grammar, a
//! catalog binds the resulting (client, version) to that browser's baseline
//! headers and TLS ClientHello, and a pool of such agents backs an HTTP
//! transport that speaks HTTP/1.1 or HTTP/2 depending on what the server
//! selects via ALPN.
//!
//! ```rust,ignore
//! use fakebro::{RoundTripper, TokenFilter, TokenKind};
//!
//! let rt = RoundTripper::builder()
//!     .pool_size(4)
//!     .filter(TokenFilter::predicate(|t| t.kind() != TokenKind::Android))
//!     .build()?;
//! let response = rt
//!     .round_trip(http::Request::get("https://example.com/").body(bytes::Bytes::new())?)
//!     .await?;
//! println!("{} {}", response.http_version(), response.status);
//! ```

pub mod agent;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod response;
pub mod timeouts;
pub mod transport;

pub use agent::{Agent, AgentPool, Roller};
pub use error::{Error, Result};
pub use fingerprint::{Catalog, HeaderSet, TlsFingerprint};
pub use identity::{generate, Generator, Identity, Token, TokenFilter, TokenKind};
pub use response::Response;
pub use timeouts::Timeouts;
pub use transport::{Outcome, RoundTripper, RoundTripperBuilder, Verification};
