//! Outbound request descriptor and its translation into handler input.
//!
//! # Responsibilities
//! - Describe a client request (origin, path, headers, body, abort signal)
//! - Extract the routing key (hostname) from the origin
//! - Build the host-relative `http::Request` handed to in-memory handlers
//! - Build the absolute-URI `http::Request` sent by network transports
//!
//! # Design Decisions
//! - Multi-valued headers become one header line per value, in order
//! - A missing body stays empty (no zero-length data frame)
//! - Stream bodies are passed through unless buffering is configured

use axum::body::Body;
use axum::http::{header, HeaderValue, Method, Request, Uri};
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::fmt;
use url::Url;

use crate::abort::AbortSignal;
use crate::config::{BodyMode, RequestBodyConfig};
use crate::error::{BoxError, DispatchError, DispatchResult};
use crate::http::headers::{HeaderField, Headers};

/// Body of an outbound request.
#[derive(Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Full(Bytes),
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl RequestBody {
    /// Wrap a chunk stream.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: futures_util::Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        RequestBody::Stream(stream.map(|chunk| chunk.map_err(Into::into)).boxed())
    }

    /// Wrap an already split body; each chunk is yielded in order.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        RequestBody::Stream(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Pass the body through as a stream.
    fn into_streaming_body(self) -> Body {
        match self {
            RequestBody::Empty => Body::empty(),
            RequestBody::Full(bytes) => Body::from(bytes),
            RequestBody::Stream(stream) => Body::from_stream(stream),
        }
    }

    /// Materialize the body, failing once more than `limit` bytes arrive.
    async fn into_buffered_body(self, limit: usize) -> DispatchResult<Body> {
        let stream = match self {
            RequestBody::Stream(stream) => stream,
            other => return Ok(other.into_streaming_body()),
        };
        let collected = Limited::new(Body::from_stream(stream), limit)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    DispatchError::BodyTooLarge { limit }
                } else {
                    DispatchError::RequestBody(e)
                }
            })?;
        Ok(Body::from(collected.to_bytes()))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Full(bytes)
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        RequestBody::Full(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Full(Bytes::from(text))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Full(Bytes::from(bytes))
    }
}

/// A client request as seen by a transport.
#[derive(Debug)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Scheme, host and port. Any path on the origin is ignored.
    pub origin: Url,
    /// Host-relative path including the query string.
    pub path: String,
    pub headers: Headers,
    pub body: RequestBody,
    pub signal: Option<AbortSignal>,
}

impl RequestDescriptor {
    /// Describe a request for an absolute URL.
    pub fn new(method: Method, url: &str) -> DispatchResult<Self> {
        let url = Url::parse(url).map_err(|e| DispatchError::InvalidRequest(format!("url `{url}`: {e}")))?;
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok(Self {
            method,
            origin: url,
            path,
            headers: Headers::new(),
            body: RequestBody::Empty,
            signal: None,
        })
    }

    pub fn get(url: &str) -> DispatchResult<Self> {
        Self::new(Method::GET, url)
    }

    pub fn post(url: &str) -> DispatchResult<Self> {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing a previous field with the same name.
    pub fn header(mut self, name: impl Into<String>, field: impl Into<HeaderField>) -> Self {
        self.headers.insert(name, field);
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Routing key: the origin's hostname without port.
    pub fn hostname(&self) -> Option<&str> {
        self.origin.host_str()
    }

    /// `host[:port]` as it would appear in a `Host` header.
    fn authority(&self) -> Option<String> {
        let host = self.origin.host_str()?;
        Some(match self.origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }

    fn relative_uri(&self) -> DispatchResult<Uri> {
        if !self.path.starts_with('/') {
            return Err(DispatchError::InvalidRequest(format!("path `{}` must start with '/'", self.path)));
        }
        self.path
            .parse::<Uri>()
            .map_err(|e| DispatchError::InvalidRequest(format!("path `{}`: {e}", self.path)))
    }

    fn absolute_uri(&self) -> DispatchResult<Uri> {
        let relative = self.relative_uri()?;
        let absolute = format!("{}{}", self.origin.origin().ascii_serialization(), relative);
        absolute
            .parse::<Uri>()
            .map_err(|e| DispatchError::InvalidRequest(format!("uri `{absolute}`: {e}")))
    }

    /// Translate into the request an in-memory handler receives.
    ///
    /// The URI is host-relative. A `Host` header is derived from the origin when the
    /// client did not provide one.
    pub async fn into_handler_request(self, config: &RequestBodyConfig) -> DispatchResult<Request<Body>> {
        let uri = self.relative_uri()?;
        let mut headers = self.headers.to_header_map()?;
        if !headers.contains_key(header::HOST) {
            if let Some(value) = self.authority().and_then(|a| HeaderValue::from_str(&a).ok()) {
                headers.insert(header::HOST, value);
            }
        }

        let body = match config.mode {
            BodyMode::Stream => self.body.into_streaming_body(),
            BodyMode::Buffer => self.body.into_buffered_body(config.max_buffered_bytes).await?,
        };

        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }

    /// Translate into an absolute-URI request for a network client.
    pub fn into_upstream_request(self) -> DispatchResult<Request<Body>> {
        let uri = self.absolute_uri()?;
        let headers = self.headers.to_header_map()?;

        let mut request = Request::new(self.body.into_streaming_body());
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn stream_config() -> RequestBodyConfig {
        RequestBodyConfig::default()
    }

    fn buffer_config(limit: usize) -> RequestBodyConfig {
        RequestBodyConfig {
            mode: BodyMode::Buffer,
            max_buffered_bytes: limit,
        }
    }

    #[test]
    fn test_descriptor_splits_url() {
        let req = RequestDescriptor::get("http://myserver.local:3000/items?page=2").unwrap();
        assert_eq!(req.hostname(), Some("myserver.local"));
        assert_eq!(req.path, "/items?page=2");
        assert_eq!(req.authority().as_deref(), Some("myserver.local:3000"));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(matches!(
            RequestDescriptor::get("not a url"),
            Err(DispatchError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_handler_request_is_host_relative() {
        let req = RequestDescriptor::get("http://myserver.local/a/b?c=d")
            .unwrap()
            .header("x-multi", ["one", "two"])
            .header("Accept", "text/plain");

        let out = req.into_handler_request(&stream_config()).await.unwrap();
        assert_eq!(out.method(), Method::GET);
        assert_eq!(out.uri(), "/a/b?c=d");
        assert_eq!(out.headers()[header::HOST], "myserver.local");
        assert_eq!(out.headers()["accept"], "text/plain");

        let multi: Vec<_> = out.headers().get_all("x-multi").iter().collect();
        assert_eq!(multi, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_client_host_header_is_kept() {
        let req = RequestDescriptor::get("http://myserver.local/")
            .unwrap()
            .header("host", "virtual.example");

        let out = req.into_handler_request(&stream_config()).await.unwrap();
        assert_eq!(out.headers()[header::HOST], "virtual.example");
    }

    #[tokio::test]
    async fn test_streamed_body_is_passed_through() {
        let req = RequestDescriptor::post("http://myserver.local/upload")
            .unwrap()
            .body(RequestBody::from_chunks(vec![Bytes::from("hello "), Bytes::from("world")]));

        let out = req.into_handler_request(&stream_config()).await.unwrap();
        let bytes = to_bytes(out.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn test_buffered_body_respects_limit() {
        let chunks = vec![Bytes::from(vec![b'a'; 8]), Bytes::from(vec![b'b'; 8])];

        let req = RequestDescriptor::post("http://myserver.local/")
            .unwrap()
            .body(RequestBody::from_chunks(chunks.clone()));
        let out = req.into_handler_request(&buffer_config(16)).await.unwrap();
        let bytes = to_bytes(out.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.len(), 16);

        let req = RequestDescriptor::post("http://myserver.local/")
            .unwrap()
            .body(RequestBody::from_chunks(chunks));
        let err = req.into_handler_request(&buffer_config(10)).await.unwrap_err();
        assert!(matches!(err, DispatchError::BodyTooLarge { limit: 10 }));
    }

    #[tokio::test]
    async fn test_failing_body_stream_is_request_error() {
        let failing = stream::iter(vec![
            Ok(Bytes::from("partial")),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "client went away")),
        ]);
        let req = RequestDescriptor::post("http://myserver.local/")
            .unwrap()
            .body(RequestBody::from_stream(failing));

        let err = req.into_handler_request(&buffer_config(1024)).await.unwrap_err();
        assert!(matches!(err, DispatchError::RequestBody(_)));
    }

    #[tokio::test]
    async fn test_empty_body_has_no_frames() {
        let req = RequestDescriptor::get("http://myserver.local/").unwrap();
        assert!(req.body.is_empty());
        let out = req.into_handler_request(&stream_config()).await.unwrap();
        assert!(hyper::body::Body::is_end_stream(out.body()));
    }

    #[test]
    fn test_upstream_request_is_absolute() {
        let req = RequestDescriptor::get("http://127.0.0.1:8080/status?x=1").unwrap();
        let out = req.into_upstream_request().unwrap();
        assert_eq!(out.uri(), "http://127.0.0.1:8080/status?x=1");
        assert!(!out.headers().contains_key(header::HOST));
    }
}
