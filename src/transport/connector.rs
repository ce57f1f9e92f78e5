//! BoringSSL TLS connector shaped by a [`TlsFingerprint`].

use std::io;
use std::io::Read;
use std::os::raw::c_int;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use boring::ssl::{
    SslConnector, SslMethod, SslOptions, SslSessionCacheMode, SslVerifyMode, SslVersion,
};
use boring::x509::X509;
use boring_sys::{CRYPTO_BUFFER, SSL, SSL_CTX};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_boring::SslStream;

use crate::error::{Error, Result};
use crate::fingerprint::tls::{
    CertCompression, TlsFingerprint, VERSION_TLS10, VERSION_TLS11, VERSION_TLS12, VERSION_TLS13,
};
use crate::timeouts::with_deadline;

/// Server certificate policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Verify the chain and hostname against the system roots plus
    /// `extra_roots` (DER or PEM).
    Verify { extra_roots: Vec<Vec<u8>> },
    /// Accept any certificate. Only for targets whose identity does not matter.
    SkipVerification,
}

impl Default for Verification {
    fn default() -> Self {
        Self::Verify {
            extra_roots: Vec::new(),
        }
    }
}

impl Verification {
    /// Verify against the system roots plus `root` (DER or PEM).
    pub fn with_root(root: impl Into<Vec<u8>>) -> Self {
        Self::Verify {
            extra_roots: vec![root.into()],
        }
    }
}

type DecompressFn =
    unsafe extern "C" fn(*mut SSL, *mut *mut CRYPTO_BUFFER, usize, *const u8, usize) -> c_int;

/// Brotli certificate decompression callback for BoringSSL.
unsafe extern "C" fn decompress_brotli_cert(
    _ssl: *mut SSL,
    out: *mut *mut CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let compressed = std::slice::from_raw_parts(in_, in_len);
    let mut decompressed = Vec::with_capacity(uncompressed_len);
    let mut decoder = brotli::Decompressor::new(compressed, uncompressed_len.max(1));
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) if decompressed.len() == uncompressed_len => store_buffer(out, &decompressed),
        _ => 0,
    }
}

/// Zlib certificate decompression callback for BoringSSL.
unsafe extern "C" fn decompress_zlib_cert(
    _ssl: *mut SSL,
    out: *mut *mut CRYPTO_BUFFER,
    uncompressed_len: usize,
    in_: *const u8,
    in_len: usize,
) -> c_int {
    let compressed = std::slice::from_raw_parts(in_, in_len);
    let mut decompressed = Vec::with_capacity(uncompressed_len);
    let mut decoder = flate2::read::ZlibDecoder::new(compressed);
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) if decompressed.len() == uncompressed_len => store_buffer(out, &decompressed),
        _ => 0,
    }
}

/// Copy `data` into a fresh CRYPTO_BUFFER owned by BoringSSL.
unsafe fn store_buffer(out: *mut *mut CRYPTO_BUFFER, data: &[u8]) -> c_int {
    let buffer = boring_sys::CRYPTO_BUFFER_new(data.as_ptr(), data.len(), std::ptr::null_mut());
    if buffer.is_null() {
        return 0;
    }
    *out = buffer;
    1
}

fn ssl_version(version: u16) -> Result<SslVersion> {
    match version {
        VERSION_TLS10 => Ok(SslVersion::TLS1),
        VERSION_TLS11 => Ok(SslVersion::TLS1_1),
        VERSION_TLS12 => Ok(SslVersion::TLS1_2),
        VERSION_TLS13 => Ok(SslVersion::TLS1_3),
        other => Err(Error::InvalidConfig(format!("unsupported TLS version {:#06x}", other))),
    }
}

/// Build an `SslConnector` that sends the ClientHello described by `fp`.
///
/// BoringSSL fixes the TLS 1.3 suites, key share layout and extension order;
/// everything else in `fp` is applied. See [`TlsFingerprint::ja3`] for the
/// intended wire shape.
pub fn build_connector(fp: &TlsFingerprint, verification: &Verification) -> Result<SslConnector> {
    let mut builder = SslConnector::builder(SslMethod::tls_client())
        .map_err(|e| Error::tls(format!("Failed to create SSL connector: {}", e)))?;

    match verification {
        Verification::Verify { extra_roots } => {
            for cert_bytes in extra_roots {
                let cert = X509::from_der(cert_bytes)
                    .or_else(|_| X509::from_pem(cert_bytes))
                    .map_err(|e| Error::InvalidConfig(format!("invalid root certificate: {}", e)))?;
                builder
                    .cert_store_mut()
                    .add_cert(cert)
                    .map_err(|e| Error::tls(format!("Failed to add root certificate: {}", e)))?;
            }
        }
        Verification::SkipVerification => builder.set_verify(SslVerifyMode::NONE),
    }

    let ciphers = fp.cipher_list();
    if !ciphers.is_empty() {
        builder
            .set_cipher_list(&ciphers)
            .map_err(|e| Error::tls(format!("Failed to set cipher list: {}", e)))?;
    }

    let curves = fp.curves_list();
    if !curves.is_empty() {
        builder
            .set_curves_list(&curves)
            .map_err(|e| Error::tls(format!("Failed to set curves: {}", e)))?;
    }

    let sigalgs = fp.sigalgs_list();
    if !sigalgs.is_empty() {
        builder
            .set_sigalgs_list(&sigalgs)
            .map_err(|e| Error::tls(format!("Failed to set signature algorithms: {}", e)))?;
    }

    builder
        .set_min_proto_version(Some(ssl_version(fp.min_version)?))
        .map_err(|e| Error::tls(format!("Failed to set min TLS version: {}", e)))?;
    builder
        .set_max_proto_version(Some(ssl_version(fp.max_version)?))
        .map_err(|e| Error::tls(format!("Failed to set max TLS version: {}", e)))?;

    let alpn = fp.alpn_wire();
    if !alpn.is_empty() {
        builder
            .set_alpn_protos(&alpn)
            .map_err(|e| Error::tls(format!("Failed to set ALPN: {}", e)))?;
    }

    if fp.has_extension(5) {
        builder.enable_ocsp_stapling();
    }
    if fp.has_extension(18) {
        builder.enable_signed_cert_timestamps();
    }
    if !fp.has_extension(35) {
        builder.set_options(SslOptions::NO_TICKET);
    }

    unsafe {
        let ctx = builder.as_ptr() as *mut SSL_CTX;
        boring_sys::SSL_CTX_set_grease_enabled(ctx, fp.uses_grease() as c_int);

        // Only decompression is registered: a client never sends certificates here.
        for alg in fp.cert_compression() {
            let decompress: DecompressFn = match alg {
                CertCompression::Brotli => decompress_brotli_cert,
                CertCompression::Zlib => decompress_zlib_cert,
            };
            boring_sys::SSL_CTX_add_cert_compression_alg(ctx, alg.id(), None, Some(decompress));
        }
    }

    builder.set_session_cache_mode(SslSessionCacheMode::CLIENT);

    Ok(builder.build())
}

/// Negotiated ALPN protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlpnProtocol {
    /// HTTP/2 ("h2")
    H2,
    /// HTTP/1.1 ("http/1.1")
    Http1,
    /// Server did not select a protocol.
    None,
    /// Anything else, e.g. "h3".
    Other(String),
}

impl AlpnProtocol {
    pub fn from_wire(selected: Option<&[u8]>) -> Self {
        match selected {
            None | Some(b"") => Self::None,
            Some(b"h2") => Self::H2,
            Some(b"http/1.1") => Self::Http1,
            Some(other) => Self::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// Protocol name as negotiated; empty when none was selected.
    pub fn as_str(&self) -> &str {
        match self {
            Self::H2 => "h2",
            Self::Http1 => "http/1.1",
            Self::None => "",
            Self::Other(name) => name,
        }
    }
}

/// A handshaked TLS connection.
#[derive(Debug)]
pub struct TlsStream {
    inner: SslStream<TcpStream>,
}

impl TlsStream {
    /// The protocol selected by the server during the handshake.
    pub fn alpn(&self) -> AlpnProtocol {
        AlpnProtocol::from_wire(self.inner.ssl().selected_alpn_protocol())
    }
}

impl AsyncRead for TlsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Open a TCP connection to `addr` and run the TLS handshake for `server_name`.
pub async fn connect(
    connector: &SslConnector,
    addr: &str,
    server_name: &str,
    verification: &Verification,
    dial_timeout: Option<Duration>,
    handshake_timeout: Option<Duration>,
) -> Result<TlsStream> {
    let tcp = with_deadline(
        dial_timeout,
        async {
            TcpStream::connect(addr)
                .await
                .map_err(|e| Error::connection(format!("Failed to connect to {}: {}", addr, e)))
        },
        Error::ConnectTimeout,
    )
    .await?;
    let _ = tcp.set_nodelay(true);

    let mut config = connector
        .configure()
        .map_err(|e| Error::tls(format!("Failed to configure SSL: {}", e)))?;
    if matches!(verification, Verification::SkipVerification) {
        config.set_verify_hostname(false);
    }

    let stream = with_deadline(
        handshake_timeout,
        async {
            tokio_boring::connect(config, server_name, tcp)
                .await
                .map_err(|e| Error::tls(format!("TLS handshake failed: {}", e)))
        },
        Error::ConnectTimeout,
    )
    .await?;

    tracing::debug!(
        addr,
        server_name,
        alpn = ?stream.ssl().selected_alpn_protocol().map(String::from_utf8_lossy),
        "TLS handshake complete"
    );
    Ok(TlsStream { inner: stream })
}
