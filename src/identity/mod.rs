//! Browser identity generation.
//!
//! A [`Generator`] turns a seed into a plausible User-Agent string together
//! with the browser client and version it claims to be. The client/version
//! pair is what [`crate::fingerprint::Catalog`] uses to find a matching TLS
//! and header fingerprint.

mod generator;
mod grammar;
mod token;

pub use generator::{generate, Generator, Identity, TokenFilter, DEFAULT_IDENTITY_LENGTH};
pub use grammar::{android_devices, compatible};
pub use token::{Token, TokenKind};
