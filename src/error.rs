//! Errors surfaced to clients through the response sink.

use thiserror::Error;

/// Boxed error used for failures coming from handlers, bodies and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Everything that can end a dispatch without a complete response.
#[derive(Debug, Error)]
pub enum DispatchError {
    // routing
    #[error("No server found for {0}")]
    NoRoute(String),
    #[error("Dispatcher is closed")]
    Closed,

    // request translation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request body stream failed: {0}")]
    RequestBody(BoxError),
    #[error("Request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    // handler invocation
    #[error("Handler failed: {0}")]
    Handler(BoxError),
    #[error("Handler returned invalid status code {0}")]
    InvalidStatus(u16),
    #[error("Response body stream failed: {0}")]
    ResponseBody(BoxError),

    // pass-through
    #[error(transparent)]
    Transport(BoxError),

    #[error("Request aborted")]
    Aborted,
}

impl DispatchError {
    /// True for failures raised by (or attributed to) the in-memory handler.
    pub fn is_handler_error(&self) -> bool {
        matches!(
            self,
            DispatchError::Handler(_) | DispatchError::InvalidStatus(_) | DispatchError::ResponseBody(_)
        )
    }
}
