//! Error types shared by the blocker components.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlockerError>;

#[derive(Debug, Error)]
pub enum BlockerError {
    /// Missing protection email or relay credentials.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The relay answered with a non-2xx status or could not be reached.
    #[error("Relay API error: {}", format_delivery(.status, .detail))]
    Delivery { status: Option<u16>, detail: String },

    /// Installing or removing rules failed.
    #[error("Rule engine error: {0}")]
    RuleEngine(String),

    #[error("Storage error: {0}")]
    Store(String),

    /// User input that the surface must reject before acting on it.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid or expired passcode")]
    PasscodeRejected,
}

fn format_delivery(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("{} - {}", code, detail),
        None => detail.to_string(),
    }
}

impl BlockerError {
    /// Whether re-running the same operation can succeed without the user
    /// changing any configuration first.
    pub fn is_retryable(&self) -> bool {
        match self {
            BlockerError::Delivery { .. } | BlockerError::RuleEngine(_) | BlockerError::Store(_) => {
                true
            }
            BlockerError::PasscodeRejected => true,
            BlockerError::Configuration(_) | BlockerError::InvalidInput(_) => false,
        }
    }
}

impl From<rusqlite::Error> for BlockerError {
    fn from(err: rusqlite::Error) -> Self {
        BlockerError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for BlockerError {
    fn from(err: serde_json::Error) -> Self {
        BlockerError::Store(format!("malformed stored value: {}", err))
    }
}
