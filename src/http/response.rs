//! Response handling and transformation.
//!
//! # Responsibilities
//! - Define the client-side callback contract (`ResponseSink`)
//! - Validate the handler's status code
//! - Normalize headers (repeated names become ordered sequences)
//! - Stream body chunks to the client as they are produced
//!
//! # Design Decisions
//! - Callbacks run strictly in order: headers, chunks, then complete or error
//! - Nothing is delivered after an error, an abort, or a sink `Break`
//! - No body for HEAD requests and 1xx/204/304 responses

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Response, StatusCode};
use bytes::Bytes;
use futures_util::StreamExt;
use std::ops::ControlFlow;

use crate::abort::{is_aborted, until_aborted, AbortSignal};
use crate::error::DispatchError;
use crate::http::headers::Headers;

/// Client-side response callbacks.
///
/// `on_headers` and `on_data` return `ControlFlow::Break(())` when the client no
/// longer wants the response; the dispatch then stops without further calls.
#[async_trait]
pub trait ResponseSink: Send {
    async fn on_headers(&mut self, status: StatusCode, headers: Headers) -> ControlFlow<()>;

    async fn on_data(&mut self, chunk: Bytes) -> ControlFlow<()>;

    async fn on_complete(&mut self);

    async fn on_error(&mut self, error: DispatchError);
}

/// Report `error` unless the request was aborted.
pub(crate) async fn fail(sink: &mut dyn ResponseSink, signal: Option<&AbortSignal>, error: DispatchError) {
    if is_aborted(signal) {
        tracing::debug!(error = %error, "Dropping error for aborted request");
        return;
    }
    sink.on_error(error).await;
}

fn body_allowed(status: StatusCode, head_request: bool) -> bool {
    !(head_request
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Deliver `response` to `sink`.
pub(crate) async fn relay(
    response: Response<Body>,
    sink: &mut dyn ResponseSink,
    signal: Option<&AbortSignal>,
    head_request: bool,
) {
    let status = response.status();
    if !(100..=599).contains(&status.as_u16()) {
        fail(sink, signal, DispatchError::InvalidStatus(status.as_u16())).await;
        return;
    }

    let (parts, body) = response.into_parts();
    let headers = Headers::from_header_map(&parts.headers);

    if is_aborted(signal) || sink.on_headers(status, headers).await.is_break() {
        return;
    }

    if body_allowed(status, head_request) {
        let mut chunks = body.into_data_stream();
        let mut delivered = 0usize;
        loop {
            let Some(next) = until_aborted(signal, chunks.next()).await else {
                tracing::debug!(delivered, "Request aborted while streaming body");
                return;
            };
            match next {
                Some(Ok(chunk)) if chunk.is_empty() => {}
                Some(Ok(chunk)) => {
                    delivered += chunk.len();
                    if is_aborted(signal) || sink.on_data(chunk).await.is_break() {
                        tracing::debug!(delivered, "Client stopped reading body");
                        return;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, delivered, "Response body failed");
                    fail(sink, signal, DispatchError::ResponseBody(e.into())).await;
                    return;
                }
                None => break,
            }
        }
        tracing::trace!(delivered, "Response body finished");
    }

    if !is_aborted(signal) {
        sink.on_complete().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::AbortController;
    use crate::http::headers::HeaderField;
    use futures_util::stream;

    #[derive(Debug, PartialEq)]
    enum Event {
        Headers(u16, Headers),
        Data(Bytes),
        Complete,
        Error(String),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
        stop_after_chunks: Option<usize>,
    }

    #[async_trait]
    impl ResponseSink for Recorder {
        async fn on_headers(&mut self, status: StatusCode, headers: Headers) -> ControlFlow<()> {
            self.events.push(Event::Headers(status.as_u16(), headers));
            ControlFlow::Continue(())
        }

        async fn on_data(&mut self, chunk: Bytes) -> ControlFlow<()> {
            self.events.push(Event::Data(chunk));
            let chunks = self.events.iter().filter(|e| matches!(e, Event::Data(_))).count();
            match self.stop_after_chunks {
                Some(limit) if chunks >= limit => ControlFlow::Break(()),
                _ => ControlFlow::Continue(()),
            }
        }

        async fn on_complete(&mut self) {
            self.events.push(Event::Complete);
        }

        async fn on_error(&mut self, error: DispatchError) {
            self.events.push(Event::Error(error.to_string()));
        }
    }

    fn chunked(parts: Vec<Result<&'static str, std::io::Error>>) -> Body {
        let parts = parts.into_iter().map(|p| p.map(|s| Bytes::from_static(s.as_bytes())));
        Body::from_stream(stream::iter(parts))
    }

    #[tokio::test]
    async fn test_relay_orders_callbacks() {
        let response = Response::builder()
            .status(201)
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .body(chunked(vec![Ok("hello "), Ok(""), Ok("world")]))
            .unwrap();

        let mut sink = Recorder::default();
        relay(response, &mut sink, None, false).await;

        let mut expected_headers = Headers::new();
        expected_headers.insert("set-cookie", HeaderField::from(["a=1", "b=2"]));
        assert_eq!(
            sink.events,
            vec![
                Event::Headers(201, expected_headers),
                Event::Data(Bytes::from_static(b"hello ")),
                Event::Data(Bytes::from_static(b"world")),
                Event::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_body_error_stops_delivery() {
        let broken = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let response = Response::new(chunked(vec![Ok("partial"), Err(broken), Ok("never")]));

        let mut sink = Recorder::default();
        relay(response, &mut sink, None, false).await;

        assert_eq!(sink.events.len(), 3);
        assert!(matches!(sink.events[1], Event::Data(_)));
        assert!(matches!(&sink.events[2], Event::Error(msg) if msg.starts_with("Response body stream failed")));
    }

    #[tokio::test]
    async fn test_no_body_for_head_and_bodiless_statuses() {
        let mut sink = Recorder::default();
        relay(Response::new(Body::from("ignored")), &mut sink, None, true).await;
        assert_eq!(sink.events.len(), 2);
        assert_eq!(sink.events[1], Event::Complete);

        for status in [204_u16, 304, 103] {
            let response = Response::builder().status(status).body(Body::from("ignored")).unwrap();
            let mut sink = Recorder::default();
            relay(response, &mut sink, None, false).await;
            assert_eq!(sink.events.len(), 2, "status {status}");
            assert!(matches!(sink.events[0], Event::Headers(s, _) if s == status));
            assert_eq!(sink.events[1], Event::Complete);
        }
    }

    #[tokio::test]
    async fn test_invalid_status_is_error() {
        let response = Response::builder().status(700).body(Body::empty()).unwrap();
        let mut sink = Recorder::default();
        relay(response, &mut sink, None, false).await;
        assert_eq!(
            sink.events,
            vec![Event::Error("Handler returned invalid status code 700".into())]
        );
    }

    #[tokio::test]
    async fn test_break_stops_relay() {
        let response = Response::new(chunked(vec![Ok("one"), Ok("two"), Ok("three")]));
        let mut sink = Recorder {
            stop_after_chunks: Some(1),
            ..Default::default()
        };
        relay(response, &mut sink, None, false).await;
        assert_eq!(sink.events.len(), 2);
        assert_eq!(sink.events[1], Event::Data(Bytes::from_static(b"one")));
    }

    #[tokio::test]
    async fn test_aborted_request_gets_no_callbacks() {
        let controller = AbortController::new();
        let signal = controller.signal();
        controller.abort();

        let mut sink = Recorder::default();
        relay(Response::new(Body::from("hi")), &mut sink, Some(&signal), false).await;
        fail(&mut sink, Some(&signal), DispatchError::Closed).await;
        assert!(sink.events.is_empty());
    }
}
