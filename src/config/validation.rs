//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits and timeouts > 0)
//! - Check that the log filter parses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatcherConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::DispatcherConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("`{field}` must be greater than zero")]
    Zero { field: &'static str },
    #[error("`logging.filter` is invalid: {0}")]
    LogFilter(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &DispatcherConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.request_body.max_buffered_bytes == 0 {
        errors.push(ValidationError::Zero {
            field: "request_body.max_buffered_bytes",
        });
    }

    if let Some(fallback) = &config.fallback {
        if fallback.connect_timeout_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "fallback.connect_timeout_secs",
            });
        }
        if fallback.pool_idle_timeout_secs == 0 {
            errors.push(ValidationError::Zero {
                field: "fallback.pool_idle_timeout_secs",
            });
        }
    }

    if let Err(e) = EnvFilter::try_new(&config.logging.filter) {
        errors.push(ValidationError::LogFilter(e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
