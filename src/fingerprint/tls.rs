//! TLS ClientHello fingerprint (JA3).
//!
//! A [`TlsFingerprint`] lists the ClientHello fields of one browser build in
//! wire order. The connector maps what BoringSSL can express onto an
//! `SslConnector`; the full extension order is kept for JA3 rendering.

use std::fmt::Write as _;

use boring::hash::{hash, MessageDigest};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const VERSION_TLS10: u16 = 0x0301;
pub const VERSION_TLS11: u16 = 0x0302;
pub const VERSION_TLS12: u16 = 0x0303;
pub const VERSION_TLS13: u16 = 0x0304;

/// Placeholder for a GREASE value (RFC 8701). The real value is picked per
/// connection by BoringSSL.
pub const GREASE_PLACEHOLDER: u16 = 0x0a0a;

/// Whether `value` is one of the reserved GREASE code points.
pub fn is_grease(value: u16) -> bool {
    value & 0x0f0f == 0x0a0a && value >> 8 == value & 0xff
}

/// Certificate compression algorithm (RFC 8879).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertCompression {
    Zlib,
    Brotli,
}

impl CertCompression {
    pub fn id(self) -> u16 {
        match self {
            Self::Zlib => 1,
            Self::Brotli => 2,
        }
    }
}

/// One ClientHello extension with the data that shapes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TlsExtension {
    ServerName,
    ExtendedMasterSecret,
    RenegotiationInfo,
    SupportedGroups(Vec<u16>),
    EcPointFormats(Vec<u8>),
    SessionTicket,
    Alpn(Vec<String>),
    StatusRequest,
    DelegatedCredentials(Vec<u16>),
    KeyShare(Vec<u16>),
    SupportedVersions(Vec<u16>),
    SignatureAlgorithms(Vec<u16>),
    PskKeyExchangeModes(Vec<u8>),
    RecordSizeLimit(u16),
    SignedCertificateTimestamp,
    CompressCertificate(Vec<CertCompression>),
    Grease,
    Padding,
}

impl TlsExtension {
    /// IANA extension type.
    pub fn id(&self) -> u16 {
        match self {
            Self::ServerName => 0,
            Self::StatusRequest => 5,
            Self::SupportedGroups(_) => 10,
            Self::EcPointFormats(_) => 11,
            Self::SignatureAlgorithms(_) => 13,
            Self::Alpn(_) => 16,
            Self::SignedCertificateTimestamp => 18,
            Self::Padding => 21,
            Self::ExtendedMasterSecret => 23,
            Self::CompressCertificate(_) => 27,
            Self::RecordSizeLimit(_) => 28,
            Self::DelegatedCredentials(_) => 34,
            Self::SessionTicket => 35,
            Self::SupportedVersions(_) => 43,
            Self::PskKeyExchangeModes(_) => 45,
            Self::KeyShare(_) => 51,
            Self::RenegotiationInfo => 65281,
            Self::Grease => GREASE_PLACEHOLDER,
        }
    }
}

/// ClientHello layout of one browser build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsFingerprint {
    pub min_version: u16,
    pub max_version: u16,
    /// Cipher suites in wire order, GREASE included.
    pub cipher_suites: Vec<u16>,
    #[serde(default = "default_compression")]
    pub compression_methods: Vec<u8>,
    /// Extensions in wire order.
    pub extensions: Vec<TlsExtension>,
}

fn default_compression() -> Vec<u8> {
    vec![0]
}

impl TlsFingerprint {
    /// Check internal consistency. Catalog loading rejects invalid entries.
    pub fn validate(&self) -> Result<()> {
        if self.min_version > self.max_version {
            return Err(Error::InvalidConfig(format!(
                "min TLS version {:#06x} above max {:#06x}",
                self.min_version, self.max_version
            )));
        }
        if !(VERSION_TLS10..=VERSION_TLS13).contains(&self.min_version)
            || !(VERSION_TLS10..=VERSION_TLS13).contains(&self.max_version)
        {
            return Err(Error::InvalidConfig(format!(
                "unsupported TLS version range {:#06x}..={:#06x}",
                self.min_version, self.max_version
            )));
        }
        if self.cipher_suites.iter().all(|c| is_grease(*c)) {
            return Err(Error::InvalidConfig("fingerprint has no cipher suites".into()));
        }
        Ok(())
    }

    fn find<T>(&self, f: impl Fn(&TlsExtension) -> Option<T>) -> Option<T> {
        self.extensions.iter().find_map(f)
    }

    pub fn has_extension(&self, id: u16) -> bool {
        self.extensions.iter().any(|e| e.id() == id)
    }

    /// ALPN protocols offered, in preference order.
    pub fn alpn_protocols(&self) -> &[String] {
        self.find(|e| match e {
            TlsExtension::Alpn(protos) => Some(protos.as_slice()),
            _ => None,
        })
        .unwrap_or(&[])
    }

    /// ALPN list in the length-prefixed wire format BoringSSL expects.
    pub fn alpn_wire(&self) -> Vec<u8> {
        let mut wire = Vec::new();
        for proto in self.alpn_protocols() {
            if proto.is_empty() || proto.len() > 255 {
                continue;
            }
            wire.push(proto.len() as u8);
            wire.extend_from_slice(proto.as_bytes());
        }
        wire
    }

    /// Supported groups without GREASE.
    pub fn curves(&self) -> Vec<u16> {
        self.find(|e| match e {
            TlsExtension::SupportedGroups(groups) => Some(groups.clone()),
            _ => None,
        })
        .unwrap_or_default()
        .into_iter()
        .filter(|g| !is_grease(*g))
        .collect()
    }

    pub fn point_formats(&self) -> &[u8] {
        self.find(|e| match e {
            TlsExtension::EcPointFormats(formats) => Some(formats.as_slice()),
            _ => None,
        })
        .unwrap_or(&[])
    }

    pub fn signature_algorithms(&self) -> &[u16] {
        self.find(|e| match e {
            TlsExtension::SignatureAlgorithms(algs) => Some(algs.as_slice()),
            _ => None,
        })
        .unwrap_or(&[])
    }

    pub fn cert_compression(&self) -> &[CertCompression] {
        self.find(|e| match e {
            TlsExtension::CompressCertificate(algs) => Some(algs.as_slice()),
            _ => None,
        })
        .unwrap_or(&[])
    }

    /// Whether GREASE appears anywhere in the hello.
    pub fn uses_grease(&self) -> bool {
        self.extensions.iter().any(|e| {
            matches!(e, TlsExtension::Grease)
                || matches!(e, TlsExtension::SupportedGroups(v) | TlsExtension::SupportedVersions(v) | TlsExtension::KeyShare(v) if v.iter().any(|x| is_grease(*x)))
        }) || self.cipher_suites.iter().any(|c| is_grease(*c))
    }

    /// Extension types in wire order.
    pub fn extension_ids(&self) -> Vec<u16> {
        self.extensions.iter().map(TlsExtension::id).collect()
    }

    /// JA3 string: `version,ciphers,extensions,curves,point_formats`.
    ///
    /// GREASE values are excluded. The version is the legacy ClientHello
    /// version, which caps at TLS 1.2.
    pub fn ja3(&self) -> String {
        fn join<T: Copy + Into<u32>>(values: impl IntoIterator<Item = T>) -> String {
            let mut out = String::new();
            for (i, v) in values.into_iter().enumerate() {
                if i > 0 {
                    out.push('-');
                }
                let _ = write!(out, "{}", v.into());
            }
            out
        }

        let legacy_version = self.max_version.min(VERSION_TLS12);
        let ciphers = self.cipher_suites.iter().copied().filter(|c| !is_grease(*c));
        let extensions = self.extension_ids().into_iter().filter(|e| !is_grease(*e));
        format!(
            "{},{},{},{},{}",
            legacy_version,
            join(ciphers),
            join(extensions),
            join(self.curves()),
            join(self.point_formats().iter().copied()),
        )
    }

    /// MD5 of [`ja3`](Self::ja3), lower-case hex.
    pub fn ja3_hash(&self) -> Result<String> {
        let digest = hash(MessageDigest::md5(), self.ja3().as_bytes())
            .map_err(|e| Error::tls(format!("md5 failed: {}", e)))?;
        let mut out = String::with_capacity(32);
        for b in digest.iter() {
            let _ = write!(out, "{:02x}", b);
        }
        Ok(out)
    }

    /// BoringSSL cipher string for the TLS 1.2 suites.
    ///
    /// TLS 1.3 suites are fixed by BoringSSL and GREASE is injected by the
    /// library, so both are skipped along with suites it does not implement.
    pub fn cipher_list(&self) -> String {
        self.cipher_suites
            .iter()
            .filter_map(|c| cipher_name(*c))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// BoringSSL curves string; groups it cannot offer (FFDHE) are skipped.
    pub fn curves_list(&self) -> String {
        self.curves()
            .into_iter()
            .filter_map(curve_name)
            .collect::<Vec<_>>()
            .join(":")
    }

    /// BoringSSL signature algorithm string, duplicates removed.
    pub fn sigalgs_list(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        for name in self.signature_algorithms().iter().filter_map(|s| sigalg_name(*s)) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.join(":")
    }
}

/// BoringSSL name of a TLS 1.2 cipher suite.
pub fn cipher_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0xc02b => "ECDHE-ECDSA-AES128-GCM-SHA256",
        0xc02f => "ECDHE-RSA-AES128-GCM-SHA256",
        0xc02c => "ECDHE-ECDSA-AES256-GCM-SHA384",
        0xc030 => "ECDHE-RSA-AES256-GCM-SHA384",
        0xcca9 => "ECDHE-ECDSA-CHACHA20-POLY1305",
        0xcca8 => "ECDHE-RSA-CHACHA20-POLY1305",
        0xc009 => "ECDHE-ECDSA-AES128-SHA",
        0xc00a => "ECDHE-ECDSA-AES256-SHA",
        0xc013 => "ECDHE-RSA-AES128-SHA",
        0xc014 => "ECDHE-RSA-AES256-SHA",
        0x009c => "AES128-GCM-SHA256",
        0x009d => "AES256-GCM-SHA384",
        0x002f => "AES128-SHA",
        0x0035 => "AES256-SHA",
        0x000a => "DES-CBC3-SHA",
        _ => return None,
    })
}

/// BoringSSL name of a named group.
pub fn curve_name(id: u16) -> Option<&'static str> {
    Some(match id {
        29 => "X25519",
        23 => "P-256",
        24 => "P-384",
        25 => "P-521",
        _ => return None,
    })
}

/// BoringSSL name of a signature scheme.
pub fn sigalg_name(id: u16) -> Option<&'static str> {
    Some(match id {
        0x0403 => "ecdsa_secp256r1_sha256",
        0x0503 => "ecdsa_secp384r1_sha384",
        0x0603 => "ecdsa_secp521r1_sha512",
        0x0203 => "ecdsa_sha1",
        0x0804 => "rsa_pss_rsae_sha256",
        0x0805 => "rsa_pss_rsae_sha384",
        0x0806 => "rsa_pss_rsae_sha512",
        0x0401 => "rsa_pkcs1_sha256",
        0x0501 => "rsa_pkcs1_sha384",
        0x0601 => "rsa_pkcs1_sha512",
        0x0201 => "rsa_pkcs1_sha1",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TlsFingerprint {
        TlsFingerprint {
            min_version: VERSION_TLS12,
            max_version: VERSION_TLS13,
            cipher_suites: vec![GREASE_PLACEHOLDER, 0x1301, 0xc02b, 0xc02f, 0x000a, 0xc008],
            compression_methods: vec![0],
            extensions: vec![
                TlsExtension::Grease,
                TlsExtension::ServerName,
                TlsExtension::SupportedGroups(vec![GREASE_PLACEHOLDER, 29, 23, 256]),
                TlsExtension::EcPointFormats(vec![0]),
                TlsExtension::Alpn(vec!["h2".into(), "http/1.1".into()]),
                TlsExtension::SignatureAlgorithms(vec![0x0403, 0x0805, 0x0805, 0x0201]),
                TlsExtension::Padding,
            ],
        }
    }

    #[test]
    fn test_grease_detection() {
        for v in [0x0a0a, 0x1a1a, 0xfafa] {
            assert!(is_grease(v));
        }
        for v in [0x0a1a, 0x1301, 0x0000] {
            assert!(!is_grease(v));
        }
    }

    #[test]
    fn test_ja3_skips_grease() {
        assert_eq!(sample().ja3(), "771,4865-49195-49199-10-49160,0-10-11-16-13-21,29-23-256,0");
    }

    #[test]
    fn test_ja3_hash_is_hex_md5() {
        let h = sample().ja3_hash().unwrap();
        assert_eq!(h.len(), 32);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_boring_strings() {
        let fp = sample();
        assert_eq!(fp.cipher_list(), "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:DES-CBC3-SHA");
        assert_eq!(fp.curves_list(), "X25519:P-256");
        assert_eq!(fp.sigalgs_list(), "ecdsa_secp256r1_sha256:rsa_pss_rsae_sha384:rsa_pkcs1_sha1");
        assert_eq!(fp.alpn_wire(), b"\x02h2\x08http/1.1".to_vec());
        assert!(fp.uses_grease());
    }

    #[test]
    fn test_validate_rejects_inverted_versions() {
        let mut fp = sample();
        fp.min_version = VERSION_TLS13;
        fp.max_version = VERSION_TLS12;
        assert!(fp.validate().is_err());
    }

    #[test]
    fn test_extension_serde_shape() {
        let json = serde_json::to_string(&TlsExtension::Alpn(vec!["h2".into()])).unwrap();
        assert_eq!(json, r#"{"type":"alpn","value":["h2"]}"#);
        let back: TlsExtension = serde_json::from_str(r#"{"type":"server_name"}"#).unwrap();
        assert_eq!(back, TlsExtension::ServerName);
    }
}
