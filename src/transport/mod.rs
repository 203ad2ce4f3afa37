//! Client-transport contract.
//!
//! # Responsibilities
//! - Define what an HTTP client hands requests to (`Transport`)
//! - Provide the network-backed fallback (`HyperTransport`)
//!
//! # Design Decisions
//! - `dispatch` has no return value; every outcome reaches the sink
//! - The `Dispatcher` implements this trait too, so dispatchers nest

pub mod network;

use async_trait::async_trait;

use crate::http::{RequestDescriptor, ResponseSink};

pub use network::HyperTransport;

/// Something that can carry a request to a server and report the response.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform `request`, reporting the outcome through `sink`.
    async fn dispatch(&self, request: RequestDescriptor, sink: &mut dyn ResponseSink);

    /// Release resources. Must tolerate repeated calls.
    async fn close(&self) {}
}
