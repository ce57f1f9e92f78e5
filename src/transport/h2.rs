//! HTTP/2 exchange via hyper over an already handshaked TLS stream.

use bytes::Bytes;
use http::header::{self, HeaderMap};
use http::Request;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http2;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::response::Response;

/// Headers that are meaningful only for a single HTTP/1.1 hop and must not
/// appear in an HTTP/2 request (RFC 9113 section 8.2.2). `Host` is carried by
/// the `:authority` pseudo-header instead.
const CONNECTION_SPECIFIC: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "upgrade",
    "host",
];

/// Remove headers HTTP/2 forbids. `TE` survives only as `trailers`.
pub fn strip_connection_headers(headers: &mut HeaderMap) {
    for name in CONNECTION_SPECIFIC {
        headers.remove(*name);
    }
    let te_ok = headers
        .get(header::TE)
        .map(|v| v.as_bytes().eq_ignore_ascii_case(b"trailers"))
        .unwrap_or(true);
    if !te_ok {
        headers.remove(header::TE);
    }
}

/// Send one request on a fresh HTTP/2 connection and collect the response.
///
/// The request URI must be absolute so hyper can fill `:scheme` and
/// `:authority`.
pub async fn send_request<S>(stream: S, mut request: Request<Bytes>) -> Result<Response>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    strip_connection_headers(request.headers_mut());
    *request.version_mut() = http::Version::HTTP_2;

    let (mut sender, conn) = http2::Builder::new(TokioExecutor::new())
        .handshake(TokioIo::new(stream))
        .await
        .map_err(|e| Error::http_protocol(format!("HTTP/2 handshake failed: {}", e)))?;

    let conn_task = tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!("HTTP/2 connection error: {}", e);
        }
    });

    let request = request.map(Full::new);
    let result = async {
        let response = sender
            .send_request(request)
            .await
            .map_err(|e| Error::http_protocol(format!("HTTP/2 request failed: {}", e)))?;
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::http_protocol(format!("Failed to read body: {}", e)))?
            .to_bytes();
        Ok(Response::new(parts.status.as_u16(), parts.headers, body, parts.version))
    }
    .await;

    // One request per connection: dropping the sender lets the connection
    // task finish with a GOAWAY.
    drop(sender);
    if result.is_err() {
        conn_task.abort();
    }
    result
}
