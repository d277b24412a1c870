use thiserror::Error;

pub type Result<T> = std::result::Result<T, BananaPromptsError>;

#[derive(Debug, Error)]
pub enum BananaPromptsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl BananaPromptsError {
    /// Timeouts are the only failure worth re-requesting the same page for.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BananaPromptsError::Timeout(_))
    }
}

impl From<reqwest::Error> for BananaPromptsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BananaPromptsError::Timeout(err.to_string())
        } else {
            BananaPromptsError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BananaPromptsError {
    fn from(err: serde_json::Error) -> Self {
        BananaPromptsError::Parse(err.to_string())
    }
}
