//! # Raw Streaming Transport (`common::docker::transport`)
//!
//! File: cli/src/common/docker/transport.rs
//!
//! ## Overview
//!
//! `bollard` covers the request/response calls of the Engine API, but build
//! contexts must be streamed *into* the daemon while its JSON progress streams
//! back out, and log/export responses are consumed as raw bytes. This module
//! is the thin HTTP/1 client used for those streaming calls.
//!
//! ## Architecture
//!
//! - `DaemonAddress` parses the configured host (`unix://`, `tcp://`, `http://`).
//! - `DaemonClient::send_streaming_request` opens one connection per request,
//!   performs the hyper handshake, and spawns the connection driver.
//!   - `Content-Type: application/json` unless the caller supplies one.
//!   - A status outside `200..400` is read in full and reported as
//!     `DaemonResponse` with the trimmed body text (or the status reason).
//!   - Connection failures become `Transport` errors. For TCP hosts, any failure
//!     other than "connection refused" carries a hint about TLS, since a TLS
//!     daemon addressed in plain HTTP fails that way.
//! - `DaemonResponse` exposes the content type and the body as a byte stream.
//!
//! ## Examples
//!
//! ```rust
//! let client = DaemonClient::from_config(&config.daemon)?;
//! let response = client
//!     .send_streaming_request(Method::POST, "/images/create?fromImage=busybox", None, &headers)
//!     .await?;
//! if response.is_json() { /* decode */ }
//! ```
//!
use crate::core::config::DaemonConfig;
use crate::core::error::{DockhandError, Result};
use anyhow::{anyhow, Context};
use bytes::Bytes;
use futures_util::{future, Stream, StreamExt};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, BodyStream, Empty};
use hyper::{
    body::Incoming,
    client::conn::http1,
    header::{CONTENT_TYPE, HOST},
    Method, Request, Response,
};
use hyper_util::rt::TokioIo;
use std::{
    collections::HashMap,
    fmt, io,
    path::PathBuf,
    pin::Pin,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, UnixStream},
};
use tracing::{debug, instrument};

/// Streaming request body.
pub type RequestBody = UnsyncBoxBody<Bytes, io::Error>;
/// Streaming response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonAddress {
    Unix(PathBuf),
    Tcp(String),
}

impl DaemonAddress {
    pub fn parse(host: &str) -> Result<Self> {
        if let Some(path) = host.strip_prefix("unix://") {
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        let authority = host
            .strip_prefix("tcp://")
            .or_else(|| host.strip_prefix("http://"))
            .ok_or_else(|| {
                anyhow!(DockhandError::Config(format!(
                    "Unsupported daemon host '{}'",
                    host
                )))
            })?
            .trim_end_matches('/');
        if authority.is_empty() {
            return Err(anyhow!(DockhandError::Config(format!(
                "Daemon host '{}' has no address",
                host
            ))));
        }
        Ok(Self::Tcp(authority.to_string()))
    }

    /// Value of the `Host` header.
    fn host_header(&self) -> &str {
        match self {
            Self::Unix(_) => "localhost",
            Self::Tcp(authority) => authority,
        }
    }
}

impl fmt::Display for DaemonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp(authority) => write!(f, "tcp://{}", authority),
        }
    }
}

/// HTTP/1 client for streaming Engine API calls.
#[derive(Debug, Clone)]
pub struct DaemonClient {
    address: DaemonAddress,
    api_version: String,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(address: DaemonAddress, api_version: &str, timeout: Duration) -> Self {
        Self {
            address,
            api_version: api_version.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &DaemonConfig) -> Result<Self> {
        Ok(Self::new(
            DaemonAddress::parse(&config.host)?,
            &config.api_version,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    /// Prefixes an Engine API path (`/build?...`) with the API version.
    pub fn versioned_path(&self, path: &str) -> String {
        format!("/v{}{}", self.api_version, path)
    }

    /// Sends one request and returns the response once its headers arrive.
    /// `path` must already carry the version prefix and query string.
    #[instrument(skip(self, body, headers), fields(daemon = %self.address))]
    pub async fn send_streaming_request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        headers: &HashMap<String, String>,
    ) -> Result<DaemonResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(HOST, self.address.host_header());
        let mut has_content_type = false;
        for (name, value) in headers {
            has_content_type |= name.eq_ignore_ascii_case(CONTENT_TYPE.as_str());
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !has_content_type {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.unwrap_or_else(empty_body))
            .context("Failed to build daemon request")?;

        let response = match &self.address {
            DaemonAddress::Unix(path) => {
                let stream = self.connect(UnixStream::connect(path)).await?;
                self.exchange(stream, request).await?
            }
            DaemonAddress::Tcp(authority) => {
                let stream = self.connect(TcpStream::connect(authority.as_str())).await?;
                self.exchange(stream, request).await?
            }
        };

        let status = response.status();
        debug!("Daemon answered {}", status);
        if !(200..400).contains(&status.as_u16()) {
            let body = response
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();
            let text = String::from_utf8_lossy(&body).trim().to_string();
            let message = if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown status").to_string()
            } else {
                text
            };
            return Err(anyhow!(DockhandError::DaemonResponse {
                status: status.as_u16(),
                message,
            }));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(DaemonResponse {
            content_type,
            body: response.into_body(),
        })
    }

    async fn connect<S, F>(&self, connecting: F) -> Result<S>
    where
        F: std::future::Future<Output = io::Result<S>>,
    {
        match tokio::time::timeout(self.timeout, connecting).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => {
                let refused = e.kind() == io::ErrorKind::ConnectionRefused;
                Err(self.transport_error(e, refused))
            }
            Err(_) => Err(self.transport_error(
                format!("timed out after {}s", self.timeout.as_secs()),
                false,
            )),
        }
    }

    async fn exchange<S>(
        &self,
        stream: S,
        request: Request<RequestBody>,
    ) -> Result<Response<Incoming>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| self.transport_error(e, false))?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!("Daemon connection closed: {}", e);
            }
        });
        sender
            .send_request(request)
            .await
            .map_err(|e| self.transport_error(e, false))
    }

    fn transport_error(&self, cause: impl fmt::Display, refused: bool) -> anyhow::Error {
        anyhow!(DockhandError::Transport {
            message: format!("Cannot connect to the Docker daemon at {}: {}", self.address, cause),
            tls_hint: matches!(self.address, DaemonAddress::Tcp(_)) && !refused,
        })
    }
}

/// A successful response whose body has not been read yet.
#[derive(Debug)]
pub struct DaemonResponse {
    content_type: Option<String>,
    body: Incoming,
}

impl DaemonResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Whether the body is a JSON message stream.
    pub fn is_json(&self) -> bool {
        self.content_type().is_some_and(is_json_media_type)
    }

    /// The body as a stream of byte chunks.
    pub fn into_stream(self) -> ByteStream {
        let stream = BodyStream::new(self.body).filter_map(|frame| {
            future::ready(match frame {
                Ok(frame) => frame.into_data().ok().map(Ok),
                Err(e) => Some(Err(io::Error::new(io::ErrorKind::Other, e))),
            })
        });
        Box::pin(stream)
    }

    /// Reads the whole body.
    pub async fn read_to_end(self) -> Result<Vec<u8>> {
        let collected = self
            .body
            .collect()
            .await
            .context("Failed to read response body from daemon")?;
        Ok(collected.to_bytes().to_vec())
    }
}

fn is_json_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

/// A body with no content.
pub fn empty_body() -> RequestBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}
