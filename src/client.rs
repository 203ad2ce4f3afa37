//! Future-based request API on top of the sink contract.
//!
//! # Design Decisions
//! - The dispatch runs as its own task; headers arrive over a oneshot, body
//!   chunks over a bounded channel (awaiting the send is the backpressure)
//! - Dropping the pending request or the body aborts the dispatch
//! - The body ends cleanly only after an explicit completion event

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use futures_util::{ready, Stream, StreamExt};
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

use crate::abort::{AbortController, AbortOnDrop};
use crate::dispatcher::Dispatcher;
use crate::error::{DispatchError, DispatchResult};
use crate::http::{Headers, RequestDescriptor, ResponseSink};

/// Body chunks buffered between the dispatch task and the reader.
const BODY_CHANNEL_CAPACITY: usize = 16;

type Head = DispatchResult<(StatusCode, Headers)>;

/// Response returned by [`Dispatcher::request`].
#[derive(Debug)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: ResponseBody,
}

/// Streaming response body.
///
/// A body whose dispatch stops before completing (abort, dropped transport)
/// ends with [`DispatchError::Aborted`] rather than a short read.
#[derive(Debug)]
pub struct ResponseBody {
    rx: mpsc::Receiver<BodyEvent>,
    finished: bool,
    _abort: Option<AbortOnDrop>,
}

impl ResponseBody {
    /// Next chunk, or `None` once the body is complete.
    pub async fn chunk(&mut self) -> DispatchResult<Option<Bytes>> {
        self.next().await.transpose()
    }

    /// Read the whole body.
    pub async fn bytes(mut self) -> DispatchResult<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Read the whole body as UTF-8 text (invalid sequences are replaced).
    pub async fn text(self) -> DispatchResult<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Stream for ResponseBody {
    type Item = DispatchResult<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let item = match ready!(self.rx.poll_recv(cx)) {
            Some(BodyEvent::Data(chunk)) => return Poll::Ready(Some(Ok(chunk))),
            Some(BodyEvent::Complete) => None,
            Some(BodyEvent::Error(error)) => Some(Err(error)),
            // The dispatch ended without completing the body.
            None => Some(Err(DispatchError::Aborted)),
        };
        self.finished = true;
        Poll::Ready(item)
    }
}

/// Messages from the dispatch task to [`ResponseBody`].
#[derive(Debug)]
enum BodyEvent {
    Data(Bytes),
    Complete,
    Error(DispatchError),
}

struct ChannelSink {
    head: Option<oneshot::Sender<Head>>,
    body: mpsc::Sender<BodyEvent>,
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn on_headers(&mut self, status: StatusCode, headers: Headers) -> ControlFlow<()> {
        let Some(head) = self.head.take() else {
            return ControlFlow::Break(());
        };
        if head.send(Ok((status, headers))).is_ok() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }

    async fn on_data(&mut self, chunk: Bytes) -> ControlFlow<()> {
        if self.body.send(BodyEvent::Data(chunk)).await.is_ok() {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }

    async fn on_complete(&mut self) {
        let _ = self.body.send(BodyEvent::Complete).await;
    }

    async fn on_error(&mut self, error: DispatchError) {
        match self.head.take() {
            Some(head) => {
                let _ = head.send(Err(error));
            }
            None => {
                let _ = self.body.send(BodyEvent::Error(error)).await;
            }
        }
    }
}

impl Dispatcher {
    /// Dispatch `request` and resolve once the response headers are available.
    ///
    /// Routing, handler and transport failures are returned as `Err`. A failure
    /// after the headers shows up when reading the body.
    pub async fn request(&self, mut request: RequestDescriptor) -> DispatchResult<ClientResponse> {
        let abort = if request.signal.is_none() {
            let controller = AbortController::new();
            request.signal = Some(controller.signal());
            Some(AbortOnDrop::new(controller))
        } else {
            None
        };

        let (head_tx, head_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let mut sink = ChannelSink {
                head: Some(head_tx),
                body: body_tx,
            };
            dispatcher.dispatch(request, &mut sink).await;
        });

        match head_rx.await {
            Ok(Ok((status, headers))) => Ok(ClientResponse {
                status,
                headers,
                body: ResponseBody {
                    rx: body_rx,
                    finished: false,
                    _abort: abort,
                },
            }),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(DispatchError::Aborted),
        }
    }
}
