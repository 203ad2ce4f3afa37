//! Network transport backed by hyper's pooled client.

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::Method;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;

use crate::abort::until_aborted;
use crate::config::FallbackConfig;
use crate::error::DispatchError;
use crate::http::response::{fail, relay};
use crate::http::{RequestDescriptor, ResponseSink};
use crate::transport::Transport;

type HttpClient = Client<HttpConnector, Body>;

/// Plain-HTTP transport that opens real connections.
///
/// Closing drops the pooled client; requests already in flight keep their own
/// handle and finish normally.
pub struct HyperTransport {
    client: ArcSwapOption<HttpClient>,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self::from_config(&FallbackConfig::default())
    }

    pub fn from_config(config: &FallbackConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(connector);

        tracing::debug!(
            connect_timeout_secs = config.connect_timeout_secs,
            pool_idle_timeout_secs = config.pool_idle_timeout_secs,
            "Network transport created"
        );
        Self {
            client: ArcSwapOption::from_pointee(client),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client.load().is_none()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").field("closed", &self.is_closed()).finish()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn dispatch(&self, request: RequestDescriptor, sink: &mut dyn ResponseSink) {
        let signal = request.signal.clone();
        let signal = signal.as_ref();

        let Some(client) = self.client.load_full() else {
            fail(sink, signal, DispatchError::Closed).await;
            return;
        };

        let head_request = request.method == Method::HEAD;
        let upstream = match request.into_upstream_request() {
            Ok(upstream) => upstream,
            Err(e) => {
                fail(sink, signal, e).await;
                return;
            }
        };

        tracing::debug!(uri = %upstream.uri(), "Forwarding to network");
        let Some(result) = until_aborted(signal, client.request(upstream)).await else {
            tracing::debug!("Request aborted before upstream responded");
            return;
        };

        match result {
            Ok(response) => relay(response.map(Body::new), sink, signal, head_request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Upstream request failed");
                fail(sink, signal, DispatchError::Transport(Box::new(e))).await;
            }
        }
    }

    async fn close(&self) {
        if self.client.swap(None).is_some() {
            tracing::debug!("Network transport closed");
        }
    }
}
