use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API error: {code} - {message}")]
    ApiError { code: i32, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ExchangeError {
    /// Whether a retry of the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::ConnectionTimeout(_) => true,
            Self::ApiError { code, .. } => *code >= 500,
            _ => false,
        }
    }
}

/// Failure to turn one inbound frame into a stream message.
///
/// Delivered to the stream handler instead of tearing the socket down, so a
/// single malformed frame never ends the subscription.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Unexpected {kind} message shape: {source}")]
    Shape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a JSON array on the {0} channel")]
    NotAnArray(&'static str),

    #[error("Expected a JSON object on the {0} channel")]
    NotAnObject(&'static str),
}
