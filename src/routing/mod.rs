//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor (origin hostname)
//!     → registry.rs (exact hostname lookup)
//!     → Return: Arc<dyn Handler> or None
//!
//! Registration (any time, usually before traffic):
//!     Dispatcher::route(host, handler)
//!     → registry.rs (copy-on-write insert)
//! ```
//!
//! # Design Decisions
//! - One handler per hostname; no path or method matching here, that
//!   belongs to the handler's own router
//! - Deterministic: same hostname always resolves to the latest registration

pub mod handler;
pub mod registry;

pub use handler::{Handler, HandlerFuture};
pub use registry::HandlerRegistry;
