//! HTTP response handling with explicit decompression.

use std::io::Read;

use bytes::Bytes;
use http::{HeaderMap, Version};

use crate::error::{Error, Result};

/// HTTP response with explicit decompression.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    body: Bytes,
    version: Version,
}

impl Response {
    pub fn new(status: u16, headers: HeaderMap, body: Bytes, version: Version) -> Self {
        Self {
            status,
            headers,
            body,
            version,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Protocol label, e.g. `HTTP/1.1` or `HTTP/2`.
    pub fn http_version(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_2 => "HTTP/2",
            Version::HTTP_3 => "HTTP/3",
            _ => "HTTP/1.1",
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of `name`, if it is valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn content_encoding(&self) -> Option<&str> {
        self.header("content-encoding")
    }

    /// Decode body based on Content-Encoding (gzip, deflate, br, zstd).
    pub fn decoded_body(&self) -> Result<Bytes> {
        match self.content_encoding().map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("gzip") | Some("x-gzip") => decode_gzip(&self.body),
            Some("deflate") => decode_deflate(&self.body),
            Some("br") => decode_brotli(&self.body),
            Some("zstd") => decode_zstd(&self.body),
            _ => Ok(self.body.clone()),
        }
    }

    pub fn text(&self) -> Result<String> {
        let decoded = self.decoded_body()?;
        String::from_utf8(decoded.to_vec())
            .map_err(|e| Error::Decompression(format!("UTF-8 decode error: {}", e)))
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let text = self.text()?;
        serde_json::from_str(&text).map_err(Error::from)
    }

    /// Convert into an `http::Response` carrying the raw body.
    pub fn into_http(self) -> Result<http::Response<Bytes>> {
        let mut builder = http::Response::builder()
            .status(self.status)
            .version(self.version);
        if let Some(headers) = builder.headers_mut() {
            *headers = self.headers;
        }
        builder
            .body(self.body)
            .map_err(|e| Error::http_protocol(format!("invalid response: {}", e)))
    }
}

fn decode_gzip(data: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| Error::Decompression(format!("gzip: {}", e)))?;
    Ok(Bytes::from(decoded))
}

/// `deflate` is zlib-wrapped per RFC 9110, but raw deflate is common in practice.
fn decode_deflate(data: &[u8]) -> Result<Bytes> {
    let mut decoded = Vec::new();
    if flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut decoded)
        .is_ok()
    {
        return Ok(Bytes::from(decoded));
    }
    decoded.clear();
    flate2::read::DeflateDecoder::new(data)
        .read_to_end(&mut decoded)
        .map_err(|e| Error::Decompression(format!("deflate: {}", e)))?;
    Ok(Bytes::from(decoded))
}

fn decode_brotli(data: &[u8]) -> Result<Bytes> {
    let mut decoder = brotli::Decompressor::new(data, 4096);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| Error::Decompression(format!("brotli: {}", e)))?;
    Ok(Bytes::from(decoded))
}

fn decode_zstd(data: &[u8]) -> Result<Bytes> {
    zstd::stream::decode_all(data)
        .map(Bytes::from)
        .map_err(|e| Error::Decompression(format!("zstd: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn with_encoding(encoding: &str, body: Vec<u8>) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("content-encoding", encoding.parse().unwrap());
        Response::new(200, headers, Bytes::from(body), Version::HTTP_11)
    }

    #[test]
    fn test_gzip() {
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"hello gzip").unwrap();
        let res = with_encoding("gzip", enc.finish().unwrap());
        assert_eq!(res.text().unwrap(), "hello gzip");
    }

    #[test]
    fn test_raw_deflate_fallback() {
        let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"raw deflate").unwrap();
        let res = with_encoding("deflate", enc.finish().unwrap());
        assert_eq!(res.text().unwrap(), "raw deflate");
    }

    #[test]
    fn test_brotli() {
        let mut out = Vec::new();
        {
            let mut w = brotli::CompressorWriter::new(&mut out, 4096, 5, 22);
            w.write_all(b"hello brotli").unwrap();
        }
        assert_eq!(with_encoding("br", out).text().unwrap(), "hello brotli");
    }

    #[test]
    fn test_zstd() {
        let data = zstd::stream::encode_all(&b"hello zstd"[..], 3).unwrap();
        assert_eq!(with_encoding("zstd", data).text().unwrap(), "hello zstd");
    }

    #[test]
    fn test_json_and_labels() {
        let res = Response::new(201, HeaderMap::new(), Bytes::from_static(br#"{"a":1}"#), Version::HTTP_2);
        let v: serde_json::Value = res.json().unwrap();
        assert_eq!(v["a"], 1);
        assert_eq!(res.http_version(), "HTTP/2");
        assert!(res.is_success());
        let http = res.into_http().unwrap();
        assert_eq!(http.status(), 201);
    }
}
