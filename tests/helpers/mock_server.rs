use std::convert::Infallible;
use std::time::Duration;

use boring::ssl::SslAcceptor;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What the server saw of one request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub version: http::Version,
    /// `(name, value)` in wire order; HTTP/2 names arrive lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// TLS server on a random local port.
pub struct MockTlsServer {
    listener: TcpListener,
    port: u16,
}

impl MockTlsServer {
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self { listener, port })
    }

    #[allow(dead_code)]
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://127.0.0.1:{}{}", self.port, path)
    }

    /// Answer every request with `response` over raw HTTP/1.1, reporting each
    /// parsed request head.
    #[allow(dead_code)]
    pub fn start_h1(
        self,
        acceptor: SslAcceptor,
        response: &'static [u8],
    ) -> (JoinHandle<()>, mpsc::UnboundedReceiver<CapturedRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Ok((tcp, _)) = self.listener.accept().await {
                let acceptor = acceptor.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut stream = match tokio_boring::accept(&acceptor, tcp).await {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::debug!("TLS accept failed: {}", e);
                            return;
                        }
                    };
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    let head_end = loop {
                        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                            break pos + 4;
                        }
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    };
                    if let Some(request) = parse_h1_head(&buf[..head_end]) {
                        let _ = tx.send(request);
                    }
                    let _ = stream.write_all(response).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        (handle, rx)
    }

    /// Serve HTTP/2 with hyper, answering `hello h2` and reporting each request.
    #[allow(dead_code)]
    pub fn start_h2(
        self,
        acceptor: SslAcceptor,
    ) -> (JoinHandle<()>, mpsc::UnboundedReceiver<CapturedRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Ok((tcp, _)) = self.listener.accept().await {
                let acceptor = acceptor.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let stream = match tokio_boring::accept(&acceptor, tcp).await {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::debug!("TLS accept failed: {}", e);
                            return;
                        }
                    };
                    let service = service_fn(move |req: http::Request<Incoming>| {
                        let tx = tx.clone();
                        async move {
                            let (parts, body) = req.into_parts();
                            let body = body
                                .collect()
                                .await
                                .map(|c| c.to_bytes())
                                .unwrap_or_default();
                            let _ = tx.send(CapturedRequest {
                                method: parts.method.to_string(),
                                target: parts.uri.to_string(),
                                version: parts.version,
                                headers: parts
                                    .headers
                                    .iter()
                                    .map(|(k, v)| {
                                        (k.to_string(), v.to_str().unwrap_or_default().to_string())
                                    })
                                    .collect(),
                                body,
                            });
                            Ok::<_, Infallible>(http::Response::new(Full::new(
                                Bytes::from_static(b"hello h2"),
                            )))
                        }
                    });
                    if let Err(e) = hyper::server::conn::http2::Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        tracing::debug!("HTTP/2 server connection error: {}", e);
                    }
                });
            }
        });
        (handle, rx)
    }

    /// Complete the TLS handshake, then hold the connection without ever
    /// answering.
    #[allow(dead_code)]
    pub fn start_silent(self, acceptor: SslAcceptor) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Ok((tcp, _)) = self.listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    if let Ok(stream) = tokio_boring::accept(&acceptor, tcp).await {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        drop(stream);
                    }
                });
            }
        })
    }
}

fn parse_h1_head(head: &[u8]) -> Option<CapturedRequest> {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);
    req.parse(head).ok()?;
    Some(CapturedRequest {
        method: req.method?.to_string(),
        target: req.path?.to_string(),
        version: http::Version::HTTP_11,
        headers: req
            .headers
            .iter()
            .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
            .collect(),
        body: Bytes::new(),
    })
}
