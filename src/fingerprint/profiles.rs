//! Built-in browser profiles: ClientHello specs and baseline headers.
//!
//! ClientHello layouts follow the uTLS parrots for the same builds.

use super::headers::HeaderSet;
use super::tls::{
    CertCompression, TlsExtension, TlsFingerprint, GREASE_PLACEHOLDER, VERSION_TLS10,
    VERSION_TLS11, VERSION_TLS12, VERSION_TLS13,
};

// cipher suites
const TLS_AES_128_GCM_SHA256: u16 = 0x1301;
const TLS_AES_256_GCM_SHA384: u16 = 0x1302;
const TLS_CHACHA20_POLY1305_SHA256: u16 = 0x1303;
const ECDHE_ECDSA_AES_128_GCM_SHA256: u16 = 0xc02b;
const ECDHE_RSA_AES_128_GCM_SHA256: u16 = 0xc02f;
const ECDHE_ECDSA_AES_256_GCM_SHA384: u16 = 0xc02c;
const ECDHE_RSA_AES_256_GCM_SHA384: u16 = 0xc030;
const ECDHE_ECDSA_CHACHA20_POLY1305: u16 = 0xcca9;
const ECDHE_RSA_CHACHA20_POLY1305: u16 = 0xcca8;
const ECDHE_ECDSA_AES_128_CBC_SHA: u16 = 0xc009;
const ECDHE_ECDSA_AES_256_CBC_SHA: u16 = 0xc00a;
const ECDHE_RSA_AES_128_CBC_SHA: u16 = 0xc013;
const ECDHE_RSA_AES_256_CBC_SHA: u16 = 0xc014;
const RSA_AES_128_GCM_SHA256: u16 = 0x009c;
const RSA_AES_256_GCM_SHA384: u16 = 0x009d;
const RSA_AES_128_CBC_SHA: u16 = 0x002f;
const RSA_AES_256_CBC_SHA: u16 = 0x0035;
const RSA_3DES_EDE_CBC_SHA: u16 = 0x000a;
const ECDHE_ECDSA_3DES_EDE_CBC_SHA: u16 = 0xc008;
const ECDHE_RSA_3DES_EDE_CBC_SHA: u16 = 0xc012;

// named groups
const X25519: u16 = 29;
const P256: u16 = 23;
const P384: u16 = 24;
const P521: u16 = 25;
const FFDHE2048: u16 = 256;
const FFDHE3072: u16 = 257;

// signature schemes
const ECDSA_P256_SHA256: u16 = 0x0403;
const ECDSA_P384_SHA384: u16 = 0x0503;
const ECDSA_P521_SHA512: u16 = 0x0603;
const ECDSA_SHA1: u16 = 0x0203;
const PSS_SHA256: u16 = 0x0804;
const PSS_SHA384: u16 = 0x0805;
const PSS_SHA512: u16 = 0x0806;
const PKCS1_SHA256: u16 = 0x0401;
const PKCS1_SHA384: u16 = 0x0501;
const PKCS1_SHA512: u16 = 0x0601;
const PKCS1_SHA1: u16 = 0x0201;

const PSK_DHE_KE: u8 = 1;

const FIREFOX_CIPHERS: &[u16] = &[
    TLS_AES_128_GCM_SHA256,
    TLS_CHACHA20_POLY1305_SHA256,
    TLS_AES_256_GCM_SHA384,
    ECDHE_ECDSA_AES_128_GCM_SHA256,
    ECDHE_RSA_AES_128_GCM_SHA256,
    ECDHE_ECDSA_CHACHA20_POLY1305,
    ECDHE_RSA_CHACHA20_POLY1305,
    ECDHE_ECDSA_AES_256_GCM_SHA384,
    ECDHE_RSA_AES_256_GCM_SHA384,
    ECDHE_ECDSA_AES_256_CBC_SHA,
    ECDHE_ECDSA_AES_128_CBC_SHA,
    ECDHE_RSA_AES_128_CBC_SHA,
    ECDHE_RSA_AES_256_CBC_SHA,
    RSA_AES_128_GCM_SHA256,
    RSA_AES_256_GCM_SHA384,
    RSA_AES_128_CBC_SHA,
    RSA_AES_256_CBC_SHA,
];

const FIREFOX_SIGALGS: &[u16] = &[
    ECDSA_P256_SHA256,
    ECDSA_P384_SHA384,
    ECDSA_P521_SHA512,
    PSS_SHA256,
    PSS_SHA384,
    PSS_SHA512,
    PKCS1_SHA256,
    PKCS1_SHA384,
    PKCS1_SHA512,
    ECDSA_SHA1,
    PKCS1_SHA1,
];

fn firefox_hello(
    min_version: u16,
    ciphers: Vec<u16>,
    alpn: &[&str],
    versions: Vec<u16>,
) -> TlsFingerprint {
    TlsFingerprint {
        min_version,
        max_version: VERSION_TLS13,
        cipher_suites: ciphers,
        compression_methods: vec![0],
        extensions: vec![
            TlsExtension::ServerName,
            TlsExtension::ExtendedMasterSecret,
            TlsExtension::RenegotiationInfo,
            TlsExtension::SupportedGroups(vec![X25519, P256, P384, P521, FFDHE2048, FFDHE3072]),
            TlsExtension::EcPointFormats(vec![0]),
            TlsExtension::SessionTicket,
            TlsExtension::Alpn(alpn.iter().map(|p| p.to_string()).collect()),
            TlsExtension::StatusRequest,
            TlsExtension::DelegatedCredentials(vec![
                ECDSA_P256_SHA256,
                ECDSA_P384_SHA384,
                ECDSA_P521_SHA512,
                ECDSA_SHA1,
            ]),
            TlsExtension::KeyShare(vec![X25519, P256]),
            TlsExtension::SupportedVersions(versions),
            TlsExtension::SignatureAlgorithms(FIREFOX_SIGALGS.to_vec()),
            TlsExtension::PskKeyExchangeModes(vec![PSK_DHE_KE]),
            TlsExtension::RecordSizeLimit(0x4001),
            TlsExtension::Padding,
        ],
    }
}

/// Firefox 99: still offers TLS 1.0/1.1 and 3DES.
pub fn firefox_99() -> TlsFingerprint {
    let mut ciphers = FIREFOX_CIPHERS.to_vec();
    ciphers.push(RSA_3DES_EDE_CBC_SHA);
    firefox_hello(
        VERSION_TLS10,
        ciphers,
        &["h2", "http/1.1"],
        vec![VERSION_TLS13, VERSION_TLS12, VERSION_TLS11, VERSION_TLS10],
    )
}

/// Firefox 102 as captured advertises only `h2` in ALPN.
pub fn firefox_102() -> TlsFingerprint {
    firefox_hello(
        VERSION_TLS10,
        FIREFOX_CIPHERS.to_vec(),
        &["h2"],
        vec![VERSION_TLS13, VERSION_TLS12],
    )
}

pub fn firefox_105() -> TlsFingerprint {
    firefox_hello(
        VERSION_TLS12,
        FIREFOX_CIPHERS.to_vec(),
        &["h2", "http/1.1"],
        vec![VERSION_TLS13, VERSION_TLS12],
    )
}

/// Safari 16 on macOS and iOS. iOS browsers share the WebKit network stack,
/// so FxiOS sends the same hello.
pub fn safari() -> TlsFingerprint {
    TlsFingerprint {
        min_version: VERSION_TLS10,
        max_version: VERSION_TLS13,
        cipher_suites: vec![
            GREASE_PLACEHOLDER,
            TLS_AES_128_GCM_SHA256,
            TLS_AES_256_GCM_SHA384,
            TLS_CHACHA20_POLY1305_SHA256,
            ECDHE_ECDSA_AES_256_GCM_SHA384,
            ECDHE_ECDSA_AES_128_GCM_SHA256,
            ECDHE_ECDSA_CHACHA20_POLY1305,
            ECDHE_RSA_AES_256_GCM_SHA384,
            ECDHE_RSA_AES_128_GCM_SHA256,
            ECDHE_RSA_CHACHA20_POLY1305,
            ECDHE_ECDSA_AES_256_CBC_SHA,
            ECDHE_ECDSA_AES_128_CBC_SHA,
            ECDHE_RSA_AES_256_CBC_SHA,
            ECDHE_RSA_AES_128_CBC_SHA,
            RSA_AES_256_GCM_SHA384,
            RSA_AES_128_GCM_SHA256,
            RSA_AES_256_CBC_SHA,
            RSA_AES_128_CBC_SHA,
            ECDHE_ECDSA_3DES_EDE_CBC_SHA,
            ECDHE_RSA_3DES_EDE_CBC_SHA,
            RSA_3DES_EDE_CBC_SHA,
        ],
        compression_methods: vec![0],
        extensions: vec![
            TlsExtension::Grease,
            TlsExtension::ServerName,
            TlsExtension::ExtendedMasterSecret,
            TlsExtension::RenegotiationInfo,
            TlsExtension::SupportedGroups(vec![GREASE_PLACEHOLDER, X25519, P256, P384, P521]),
            TlsExtension::EcPointFormats(vec![0]),
            TlsExtension::Alpn(vec!["h2".into(), "http/1.1".into()]),
            TlsExtension::StatusRequest,
            TlsExtension::SignatureAlgorithms(vec![
                ECDSA_P256_SHA256,
                PSS_SHA256,
                PKCS1_SHA256,
                ECDSA_P384_SHA384,
                ECDSA_SHA1,
                PSS_SHA384,
                PSS_SHA384,
                PKCS1_SHA384,
                PSS_SHA512,
                PKCS1_SHA512,
                PKCS1_SHA1,
            ]),
            TlsExtension::SignedCertificateTimestamp,
            TlsExtension::KeyShare(vec![GREASE_PLACEHOLDER, X25519]),
            TlsExtension::PskKeyExchangeModes(vec![PSK_DHE_KE]),
            TlsExtension::SupportedVersions(vec![
                GREASE_PLACEHOLDER,
                VERSION_TLS13,
                VERSION_TLS12,
                VERSION_TLS11,
                VERSION_TLS10,
            ]),
            TlsExtension::CompressCertificate(vec![CertCompression::Zlib]),
            TlsExtension::Grease,
            TlsExtension::Padding,
        ],
    }
}

pub fn firefox_headers() -> HeaderSet {
    [
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("DNT", "1"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Connection", "keep-alive"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
    ]
    .into_iter()
    .collect()
}

pub fn safari_headers() -> HeaderSet {
    [
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-GB,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Connection", "keep-alive"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
    ]
    .into_iter()
    .collect()
}

pub fn fxios_headers() -> HeaderSet {
    [
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Accept-Encoding", "gzip, deflate, br"),
        ("Connection", "keep-alive"),
    ]
    .into_iter()
    .collect()
}
