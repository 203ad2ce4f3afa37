//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, transports and translators produce:
//!     → `dispatch` spans (dispatch_id, method, host, path)
//!     → structured events inside those spans
//!
//! Consumers:
//!     → logging.rs (EnvFilter + fmt layer, pretty or JSON)
//! ```

pub mod logging;

pub use logging::{init_logging, LoggingError};
