//! Network side of an agent.
//!
//! - `connector`: BoringSSL connector shaped by a ClientHello spec
//! - `h1`: hand-written HTTP/1.1 over the handshaked stream
//! - `h2`: HTTP/2 via hyper over the handshaked stream
//! - `round_tripper`: pooled transport that dispatches on the negotiated ALPN

pub mod connector;
pub mod h1;
pub mod h2;
pub mod round_tripper;

pub use connector::{AlpnProtocol, TlsStream, Verification};
pub use round_tripper::{
    default_classifier, Classifier, Outcome, RoundTripper, RoundTripperBuilder, DEFAULT_POOL_SIZE,
};
