use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider ran and reported a failure; the message is its own, verbatim
    #[error("{0}")]
    Failed(String),

    #[error("media tool not found: {0}")]
    ToolNotFound(String),

    #[error("failed to parse provider output: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(value: std::io::Error) -> Self {
        ProviderError::Io(value.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(value: serde_json::Error) -> Self {
        ProviderError::Parse(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
