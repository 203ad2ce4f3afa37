//! Request dispatch.
//!
//! # Responsibilities
//! - Route each request by hostname to an in-memory handler
//! - Translate, invoke and relay the handler's response
//! - Pass unmatched requests to the fallback transport untouched
//! - Report a routing error when nothing can serve the host
//!
//! # Data Flow
//! ```text
//! dispatch(RequestDescriptor, sink)
//!     → closed?                     → on_error(Closed)
//!     → registry.lookup(hostname)
//!         Some(handler) → request translation → handler.handle() → response relay
//!         None + fallback → fallback.dispatch(request, sink)
//!         None            → on_error(NoRoute(host))
//! ```
//!
//! # Design Decisions
//! - Exactly one path runs per dispatch
//! - Handler errors and panics are contained in the dispatch that caused them
//! - Close is idempotent; in-flight dispatches are left to finish

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::http::Method;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::abort::until_aborted;
use crate::config::{DispatcherConfig, RequestBodyConfig};
use crate::error::DispatchError;
use crate::http::response::{fail, relay};
use crate::http::{RequestDescriptor, ResponseSink};
use crate::routing::{Handler, HandlerRegistry};
use crate::transport::{HyperTransport, Transport};

/// Transport used for hosts without a handler.
enum Fallback {
    /// Closed together with the dispatcher.
    Owned(Box<dyn Transport>),
    /// Left open; its owner decides when to close it.
    Shared(Arc<dyn Transport>),
}

impl Fallback {
    fn transport(&self) -> &dyn Transport {
        match self {
            Fallback::Owned(transport) => transport.as_ref(),
            Fallback::Shared(transport) => transport.as_ref(),
        }
    }
}

struct Inner {
    routes: HandlerRegistry,
    fallback: Option<Fallback>,
    request_body: ArcSwap<RequestBodyConfig>,
    closed: AtomicBool,
}

/// Routes requests to in-memory handlers by hostname.
///
/// Cloning is cheap and every clone shares the same route table.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// A dispatcher without fallback: unmatched hosts always fail.
    pub fn new() -> Self {
        Self::build(None, RequestBodyConfig::default())
    }

    /// A dispatcher that owns `transport` and closes it on [`Dispatcher::close`].
    pub fn with_fallback(transport: impl Transport) -> Self {
        Self::build(Some(Fallback::Owned(Box::new(transport))), RequestBodyConfig::default())
    }

    /// A dispatcher that borrows a transport also used elsewhere.
    pub fn with_shared_fallback(transport: Arc<dyn Transport>) -> Self {
        Self::build(Some(Fallback::Shared(transport)), RequestBodyConfig::default())
    }

    /// Build from configuration, creating an owned network fallback when configured.
    pub fn from_config(config: &DispatcherConfig) -> Self {
        let fallback = config
            .fallback
            .as_ref()
            .map(|fallback| Fallback::Owned(Box::new(HyperTransport::from_config(fallback))));
        Self::build(fallback, config.request_body.clone())
    }

    /// Replace the request body settings.
    ///
    /// Every clone shares the settings; dispatches already past translation keep the old ones.
    pub fn with_request_body(self, request_body: RequestBodyConfig) -> Self {
        self.set_request_body(request_body);
        self
    }

    pub fn set_request_body(&self, request_body: RequestBodyConfig) {
        tracing::debug!(
            mode = ?request_body.mode,
            limit = request_body.max_buffered_bytes,
            "Request body settings updated"
        );
        self.inner.request_body.store(Arc::new(request_body));
    }

    pub fn request_body(&self) -> RequestBodyConfig {
        RequestBodyConfig::clone(&self.inner.request_body.load())
    }

    fn build(fallback: Option<Fallback>, request_body: RequestBodyConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                routes: HandlerRegistry::new(),
                fallback,
                request_body: ArcSwap::from_pointee(request_body),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Serve `host` with `handler`, replacing any previous handler for it.
    pub fn route(&self, host: impl Into<String>, handler: impl Handler) {
        self.route_shared(host, Arc::new(handler));
    }

    /// Like [`Dispatcher::route`] for a handler that is already shared.
    pub fn route_shared(&self, host: impl Into<String>, handler: Arc<dyn Handler>) {
        let host = host.into();
        if self.is_closed() {
            tracing::warn!(host = %host, "Ignoring route registration on closed dispatcher");
            return;
        }
        self.inner.routes.register(host, handler);
    }

    pub fn routes(&self) -> &HandlerRegistry {
        &self.inner.routes
    }

    pub fn has_fallback(&self) -> bool {
        self.inner.fallback.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Perform `request`; the outcome is reported only through `sink`.
    pub async fn dispatch(&self, request: RequestDescriptor, sink: &mut dyn ResponseSink) {
        let span = tracing::debug_span!(
            "dispatch",
            dispatch_id = %Uuid::new_v4(),
            method = %request.method,
            host = request.hostname().unwrap_or(""),
            path = %request.path,
        );
        self.route_request(request, sink).instrument(span).await;
    }

    async fn route_request(&self, request: RequestDescriptor, sink: &mut dyn ResponseSink) {
        let signal = request.signal.clone();
        let signal = signal.as_ref();

        if self.is_closed() {
            fail(sink, signal, DispatchError::Closed).await;
            return;
        }

        let Some(host) = request.hostname().map(str::to_string) else {
            let error = DispatchError::InvalidRequest(format!("origin `{}` has no host", request.origin));
            fail(sink, signal, error).await;
            return;
        };

        if let Some(handler) = self.inner.routes.lookup(&host) {
            tracing::debug!("Dispatching to in-memory handler");
            self.invoke(handler, request, sink).await;
            return;
        }

        match &self.inner.fallback {
            Some(fallback) => {
                tracing::debug!("No handler registered; passing through to fallback");
                fallback.transport().dispatch(request, sink).await;
            }
            None => {
                tracing::warn!("No handler registered and no fallback");
                fail(sink, signal, DispatchError::NoRoute(host)).await;
            }
        }
    }

    async fn invoke(&self, handler: Arc<dyn Handler>, request: RequestDescriptor, sink: &mut dyn ResponseSink) {
        let signal = request.signal.clone();
        let signal = signal.as_ref();
        let head_request = request.method == Method::HEAD;

        let request_body = self.inner.request_body.load_full();
        let translated = until_aborted(signal, request.into_handler_request(&request_body)).await;
        let handler_request = match translated {
            None => return,
            Some(Ok(handler_request)) => handler_request,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Request translation failed");
                fail(sink, signal, e).await;
                return;
            }
        };

        let call = AssertUnwindSafe(handler.handle(handler_request)).catch_unwind();
        let Some(outcome) = until_aborted(signal, call).await else {
            tracing::debug!("Request aborted; handler cancelled");
            return;
        };

        match outcome {
            Ok(Ok(response)) => {
                tracing::debug!(status = response.status().as_u16(), "Handler responded");
                relay(response, sink, signal, head_request).await;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Handler failed");
                fail(sink, signal, DispatchError::Handler(e)).await;
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(panic = %message, "Handler panicked");
                fail(sink, signal, DispatchError::Handler(message.into())).await;
            }
        }
    }

    /// Stop accepting dispatches, drop all routes and close an owned fallback.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.routes.clear();
        if let Some(Fallback::Owned(transport)) = &self.inner.fallback {
            transport.close().await;
        }
        tracing::info!("Dispatcher closed");
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.inner.routes)
            .field("has_fallback", &self.has_fallback())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl Transport for Dispatcher {
    async fn dispatch(&self, request: RequestDescriptor, sink: &mut dyn ResponseSink) {
        Dispatcher::dispatch(self, request, sink).await;
    }

    async fn close(&self) {
        Dispatcher::close(self).await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}
