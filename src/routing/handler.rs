//! In-memory request handlers.
//!
//! # Design Decisions
//! - A handler is a single async method from request to response
//! - Any cloneable tower `Service` over `Request<Body>` is a handler, so an
//!   `axum::Router` can be registered as-is
//! - Each invocation calls a fresh clone of the service (`oneshot`), so
//!   concurrent dispatches never share readiness state

use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tower::{Service, ServiceExt};

use crate::error::BoxError;

/// Future returned by [`Handler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<Body>, BoxError>> + Send>>;

/// Something that can answer a request without touching the network.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: Request<Body>) -> HandlerFuture;
}

impl<S, B> Handler for S
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn handle(&self, request: Request<Body>) -> HandlerFuture {
        let service = self.clone();
        Box::pin(async move {
            let response = service.oneshot(request).await.map_err(Into::into)?;
            Ok(response.map(Body::new))
        })
    }
}
