//! HTTP/1.1 exchange written directly onto a handshaked stream.
//!
//! The request is serialized by hand so header order and casing match the
//! agent's header set exactly; the response is parsed with httparse.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Version};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::fingerprint::HeaderSet;
use crate::response::Response;

/// Maximum response header size (64KB).
const MAX_HEADERS_SIZE: usize = 64 * 1024;

/// Maximum number of headers to parse.
const MAX_HEADERS_COUNT: usize = 100;

/// Maximum response body size (64MB).
const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

const READ_CHUNK: usize = 8192;

/// One HTTP/1.1 request/response exchange over `S`.
pub struct H1Connection<S> {
    stream: S,
    /// Bytes read from the stream but not consumed yet.
    buf: Vec<u8>,
}

impl<S> H1Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Write the request and read the final response.
    ///
    /// `target` is the origin-form request target (`/path?query`). `headers`
    /// are written in order; `Host` goes first.
    pub async fn send_request(
        &mut self,
        method: &Method,
        target: &str,
        headers: &HeaderSet,
        body: &Bytes,
    ) -> Result<Response> {
        let head = encode_request_head(method, target, headers, body.len())?;
        self.stream
            .write_all(&head)
            .await
            .map_err(|e| Error::http_protocol(format!("Failed to write request: {}", e)))?;
        if !body.is_empty() {
            self.stream
                .write_all(body)
                .await
                .map_err(|e| Error::http_protocol(format!("Failed to write body: {}", e)))?;
        }
        self.stream
            .flush()
            .await
            .map_err(|e| Error::http_protocol(format!("Failed to flush: {}", e)))?;

        loop {
            let response = self.read_response(method).await?;
            if response.status == 101 {
                return Err(Error::http_protocol("Unexpected 101 Switching Protocols"));
            }
            // 1xx responses carry no body; the final response follows.
            if (100..200).contains(&response.status) {
                tracing::trace!(status = response.status, "skipping informational response");
                continue;
            }
            return Ok(response);
        }
    }

    /// Read more bytes into the buffer. Returns the number read.
    async fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self
            .stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::http_protocol(format!("Failed to read response: {}", e)))?;
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    async fn fill_or_eof(&mut self, context: &str) -> Result<()> {
        if self.fill().await? == 0 {
            return Err(Error::http_protocol(format!("Connection closed {}", context)));
        }
        Ok(())
    }

    async fn read_response(&mut self, method: &Method) -> Result<Response> {
        let header_end = loop {
            if let Some(end) = find_header_end(&self.buf) {
                break end;
            }
            if self.buf.len() >= MAX_HEADERS_SIZE {
                return Err(Error::http_protocol("Response headers too large"));
            }
            self.fill_or_eof("before response headers").await?;
        };

        let (status, version, headers) = parse_head(&self.buf[..header_end])?;
        self.buf.drain(..header_end);

        let has_body = !matches!(status, 100..=199 | 204 | 304) && *method != Method::HEAD;
        let body = if !has_body {
            Bytes::new()
        } else {
            match body_framing(&headers)? {
                Framing::Chunked => self.read_chunked().await?,
                Framing::Length(len) => self.read_exact_body(len).await?,
                Framing::Close => self.read_to_close().await?,
            }
        };

        Ok(Response::new(status, headers, body, version))
    }

    async fn read_exact_body(&mut self, len: usize) -> Result<Bytes> {
        if len > MAX_BODY_SIZE {
            return Err(Error::http_protocol(format!("Response body too large: {} bytes", len)));
        }
        while self.buf.len() < len {
            if self.fill().await? == 0 {
                return Err(Error::http_protocol(format!(
                    "Connection closed before receiving full body (got {} of {} bytes)",
                    self.buf.len(),
                    len
                )));
            }
        }
        Ok(Bytes::from(self.buf.drain(..len).collect::<Vec<u8>>()))
    }

    async fn read_to_close(&mut self) -> Result<Bytes> {
        while self.fill().await? > 0 {
            if self.buf.len() > MAX_BODY_SIZE {
                return Err(Error::http_protocol("Response body too large"));
            }
        }
        Ok(Bytes::from(std::mem::take(&mut self.buf)))
    }

    async fn read_line(&mut self, context: &str) -> Result<Vec<u8>> {
        loop {
            if let Some(pos) = find_crlf(&self.buf) {
                let line: Vec<u8> = self.buf.drain(..pos + 2).take(pos).collect();
                return Ok(line);
            }
            self.fill_or_eof(context).await?;
        }
    }

    async fn read_chunked(&mut self) -> Result<Bytes> {
        let mut body = Vec::new();
        loop {
            let line = self.read_line("while reading chunk size").await?;
            let size = parse_chunk_size(&line)?;
            if size == 0 {
                // trailer section ends with an empty line
                loop {
                    match self.read_line("while reading trailers").await {
                        Ok(line) if line.is_empty() => return Ok(Bytes::from(body)),
                        Ok(_) => continue,
                        // a peer closing right after the last chunk is tolerated
                        Err(_) => return Ok(Bytes::from(body)),
                    }
                }
            }
            if size > MAX_BODY_SIZE - body.len() {
                return Err(Error::http_protocol(format!("Chunk of {} bytes exceeds body limit", size)));
            }
            let framed = size + 2;
            while self.buf.len() < framed {
                self.fill_or_eof("while reading chunk data").await?;
            }
            if &self.buf[size..framed] != b"\r\n" {
                return Err(Error::http_protocol("Missing CRLF after chunk data"));
            }
            body.extend_from_slice(&self.buf[..size]);
            self.buf.drain(..framed);
        }
    }
}

enum Framing {
    Chunked,
    Length(usize),
    Close,
}

/// Body framing per RFC 9112 section 6.3: Transfer-Encoding wins over
/// Content-Length, and without either the body runs to connection close.
fn body_framing(headers: &HeaderMap) -> Result<Framing> {
    if let Some(te) = headers.get(http::header::TRANSFER_ENCODING) {
        let te = te.to_str().unwrap_or("");
        let chunked = te
            .rsplit(',')
            .next()
            .map(|s| s.trim().eq_ignore_ascii_case("chunked"))
            .unwrap_or(false);
        return Ok(if chunked { Framing::Chunked } else { Framing::Close });
    }
    match headers.get(http::header::CONTENT_LENGTH) {
        Some(cl) => {
            let cl = cl
                .to_str()
                .map_err(|_| Error::http_protocol("Invalid Content-Length"))?;
            Ok(Framing::Length(parse_content_length(cl)?))
        }
        None => Ok(Framing::Close),
    }
}

fn parse_head(head: &[u8]) -> Result<(u16, Version, HeaderMap)> {
    let mut raw = [httparse::EMPTY_HEADER; MAX_HEADERS_COUNT];
    let mut parsed = httparse::Response::new(&mut raw);
    match parsed
        .parse(head)
        .map_err(|e| Error::http_protocol(format!("Failed to parse response: {}", e)))?
    {
        httparse::Status::Complete(_) => {}
        httparse::Status::Partial => return Err(Error::http_protocol("Incomplete response headers")),
    }

    let status = parsed
        .code
        .ok_or_else(|| Error::http_protocol("Missing status code"))?;
    let version = match parsed.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut headers = HeaderMap::with_capacity(parsed.headers.len());
    for h in parsed.headers.iter().filter(|h| !h.name.is_empty()) {
        let name = HeaderName::from_bytes(h.name.as_bytes())
            .map_err(|e| Error::http_protocol(format!("Invalid header name {:?}: {}", h.name, e)))?;
        let value = HeaderValue::from_bytes(h.value)
            .map_err(|e| Error::http_protocol(format!("Invalid value for {}: {}", h.name, e)))?;
        headers.append(name, value);
    }
    Ok((status, version, headers))
}

/// Serialize the request line and headers.
fn encode_request_head(
    method: &Method,
    target: &str,
    headers: &HeaderSet,
    body_len: usize,
) -> Result<Vec<u8>> {
    for (name, value) in headers.iter() {
        validate_header_name(name)?;
        validate_header_value(value)?;
    }
    if target.is_empty() || target.contains(['\r', '\n', ' ']) {
        return Err(Error::InvalidRequest(format!("invalid request target {:?}", target)));
    }

    let mut out = Vec::with_capacity(1024);
    out.extend_from_slice(method.as_str().as_bytes());
    out.push(b' ');
    out.extend_from_slice(target.as_bytes());
    out.extend_from_slice(b" HTTP/1.1\r\n");

    let mut write = |name: &str, value: &str| {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    };

    // Host is required and goes first.
    let host = headers
        .get("host")
        .ok_or_else(|| Error::InvalidRequest("missing Host header".into()))?;
    write("Host", host);
    for (name, value) in headers.iter().filter(|(n, _)| !n.eq_ignore_ascii_case("host")) {
        write(name, value);
    }

    let framed = headers.contains("content-length") || headers.contains("transfer-encoding");
    if body_len > 0 && !framed {
        write("Content-Length", &body_len.to_string());
    }

    out.extend_from_slice(b"\r\n");
    Ok(out)
}

/// Find the end of HTTP headers (\r\n\r\n).
fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Find the first CRLF in a buffer, returning its position.
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\r\n")
}

/// Parse a chunk-size line, ignoring chunk extensions.
fn parse_chunk_size(line: &[u8]) -> Result<usize> {
    let line = std::str::from_utf8(line)
        .map_err(|_| Error::http_protocol("Invalid chunk size line"))?;
    let size = line.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size, 16)
        .map_err(|_| Error::http_protocol(format!("Invalid chunk size {:?}", size)))
}

/// Validate a header name per RFC 9110 Section 5.1.
fn validate_header_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(is_tchar) {
        return Err(Error::http_protocol(format!("Invalid header name: {:?}", name)));
    }
    Ok(())
}

/// Check if a byte is a valid token character per RFC 9110.
fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z'
    )
}

/// Header values must not contain NUL, CR, or LF.
fn validate_header_value(value: &str) -> Result<()> {
    if value.bytes().any(|b| b == 0 || b == b'\r' || b == b'\n') {
        return Err(Error::http_protocol(
            "Invalid character in header value (CR/LF/NUL not allowed)",
        ));
    }
    Ok(())
}

/// Parse Content-Length per RFC 9112 Section 6.2; repeated values must agree.
fn parse_content_length(value: &str) -> Result<usize> {
    let mut parsed = None;
    for part in value.split(',').map(str::trim) {
        let v = part
            .parse::<usize>()
            .map_err(|_| Error::http_protocol(format!("Invalid Content-Length: {}", value)))?;
        match parsed {
            Some(first) if first != v => {
                return Err(Error::http_protocol(format!(
                    "Conflicting Content-Length values: {}",
                    value
                )))
            }
            _ => parsed = Some(v),
        }
    }
    parsed.ok_or_else(|| Error::http_protocol("Empty Content-Length"))
}
