//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DispatcherConfig (validated, immutable)
//!     → Dispatcher::from_config
//! ```
//!
//! # Design Decisions
//! - Routes are not configuration; handlers are registered in code
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BodyMode, DispatcherConfig, FallbackConfig, LogFormat, LoggingConfig, RequestBodyConfig};
pub use validation::ValidationError;
