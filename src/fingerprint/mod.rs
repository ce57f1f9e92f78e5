//! Browser fingerprints: ClientHello specs, baseline headers and the catalog
//! binding them to a (client, version) pair.

pub mod catalog;
pub mod headers;
pub mod profiles;
pub mod tls;

pub use catalog::{Catalog, HeaderEntry, TlsEntry};
pub use headers::HeaderSet;
pub use tls::{CertCompression, TlsExtension, TlsFingerprint};
