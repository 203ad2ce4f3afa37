//! HTTP message translation.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor (client side)
//!     → request.rs (host-relative http::Request for handlers,
//!                   absolute http::Request for network transports)
//!     → [handler or fallback produces http::Response]
//!     → response.rs (status check, header grouping, body streaming)
//!     → ResponseSink callbacks
//! ```

pub mod headers;
pub mod request;
pub mod response;

pub use headers::{HeaderField, Headers};
pub use request::{RequestBody, RequestDescriptor};
pub use response::ResponseSink;
