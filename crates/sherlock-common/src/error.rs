use thiserror::Error;

#[derive(Debug, Error)]
pub enum SherlockError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("Login required (return to {return_url})")]
    LoginRequired { return_url: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SherlockError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SherlockError::Api { status, .. } => Some(*status),
            SherlockError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_login_required(&self) -> bool {
        matches!(self, SherlockError::LoginRequired { .. })
    }
}

pub type Result<T> = std::result::Result<T, SherlockError>;
