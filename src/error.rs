/// Custom error type for build_status_badge operations
#[derive(Debug, thiserror::Error)]
pub enum BadgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to decode event payload: {0}")]
    Decode(String),

    #[error("Storage object '{object}' not found in bucket '{bucket}'")]
    SourceNotFound { bucket: String, object: String },

    #[error("Storage backend error: {0}")]
    Storage(String),

    #[error("Base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Helper type for Results that use BadgeError
pub type Result<T> = std::result::Result<T, BadgeError>;
