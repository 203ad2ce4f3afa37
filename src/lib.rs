//! In-process HTTP dispatcher.
//!
//! Sends HTTP requests for registered hostnames straight to in-memory handlers
//! (any `axum::Router` or tower `Service`) instead of opening a socket. Other
//! hosts go to an optional fallback transport, or fail with
//! `No server found for <host>`.
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──RequestDescriptor──▶ Dispatcher ──▶ routing::HandlerRegistry
//!                                     │                    │
//!                                     │        handler?    ▼
//!                                     │   ┌───── yes: http::request ──▶ Handler
//!                                     │   │                               │
//!   ResponseSink ◀── http::response ◀─┼───┘◀──────── http::Response ◀─────┘
//!        ▲                            │
//!        └──────── fallback ◀─────────┘ no: transport::Transport (e.g. HyperTransport)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use inproc_dispatcher::{Dispatcher, RequestDescriptor};
//!
//! # async fn run() -> Result<(), inproc_dispatcher::DispatchError> {
//! let dispatcher = Dispatcher::new();
//! dispatcher.route("myserver.local", Router::new().route("/", get(|| async { "hello world" })));
//!
//! let res = dispatcher.request(RequestDescriptor::get("http://myserver.local/")?).await?;
//! assert_eq!(res.body.text().await?, "hello world");
//! # Ok(())
//! # }
//! ```

pub mod abort;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod observability;
pub mod routing;
pub mod transport;

pub use abort::{AbortController, AbortSignal};
pub use client::{ClientResponse, ResponseBody};
pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use error::{BoxError, DispatchError, DispatchResult};
pub use http::{HeaderField, Headers, RequestBody, RequestDescriptor, ResponseSink};
pub use routing::{Handler, HandlerRegistry};
pub use transport::{HyperTransport, Transport};
