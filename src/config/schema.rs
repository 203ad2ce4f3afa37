//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for a dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherConfig {
    /// How request bodies are handed to in-memory handlers.
    pub request_body: RequestBodyConfig,

    /// Network transport for hosts without a registered handler.
    /// Absent means unmatched hosts fail with a routing error.
    pub fallback: Option<FallbackConfig>,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Delivery mode of request bodies to handlers.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    /// Forward chunks as the client produces them.
    #[default]
    Stream,
    /// Collect the whole body before invoking the handler.
    Buffer,
}

/// Request body handling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RequestBodyConfig {
    pub mode: BodyMode,

    /// Upper bound for `Buffer` mode, in bytes.
    pub max_buffered_bytes: usize,
}

impl Default for RequestBodyConfig {
    fn default() -> Self {
        Self {
            mode: BodyMode::Stream,
            max_buffered_bytes: 1024 * 1024,
        }
    }
}

/// Pass-through HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FallbackConfig {
    /// TCP connect timeout.
    pub connect_timeout_secs: u64,

    /// Idle pooled connections are closed after this long.
    pub pool_idle_timeout_secs: u64,

    /// Maximum idle pooled connections per upstream host.
    pub pool_max_idle_per_host: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "inproc_dispatcher=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
