//! Shared utilities for integration tests.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::Router;
use bytes::Bytes;
use inproc_dispatcher::{DispatchError, Headers, ResponseSink};
use std::net::SocketAddr;
use std::ops::ControlFlow;
use tokio::net::TcpListener;

/// One callback observed by [`RecordingSink`].
#[allow(dead_code)]
#[derive(Debug)]
pub enum Event {
    Headers(StatusCode, Headers),
    Data(Bytes),
    Complete,
    Error(DispatchError),
}

/// Sink that records every callback in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<Event>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn status(&self) -> Option<StatusCode> {
        self.events.iter().find_map(|e| match e {
            Event::Headers(status, _) => Some(*status),
            _ => None,
        })
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.events.iter().find_map(|e| match e {
            Event::Headers(_, headers) => Some(headers),
            _ => None,
        })
    }

    pub fn body(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Data(chunk) => Some(chunk.to_vec()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, Event::Data(_))).count()
    }

    pub fn error(&self) -> Option<&DispatchError> {
        self.events.iter().find_map(|e| match e {
            Event::Error(error) => Some(error),
            _ => None,
        })
    }

    pub fn completed(&self) -> bool {
        matches!(self.events.last(), Some(Event::Complete))
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn on_headers(&mut self, status: StatusCode, headers: Headers) -> ControlFlow<()> {
        self.events.push(Event::Headers(status, headers));
        ControlFlow::Continue(())
    }

    async fn on_data(&mut self, chunk: Bytes) -> ControlFlow<()> {
        self.events.push(Event::Data(chunk));
        ControlFlow::Continue(())
    }

    async fn on_complete(&mut self) {
        self.events.push(Event::Complete);
    }

    async fn on_error(&mut self, error: DispatchError) {
        self.events.push(Event::Error(error));
    }
}

/// Serve `app` on an ephemeral local port.
#[allow(dead_code)]
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}
