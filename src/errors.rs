/// Request-level error types for the P&L service.
/// Any of these aborts the whole computation for one request.
/// Per-strategy failures are isolated in `strategies::StrategyError` instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("chain provider error: {status} {body}")]
    Provider { status: u16, body: String },

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// True when the caller sent something we cannot price (HTTP 400).
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(self, EngineError::InvalidInput(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        EngineError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Snapshot(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
