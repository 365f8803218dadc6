//! Error types for Jumpmark
//!
//! Provides standardized error handling across the launcher core.

use thiserror::Error;

/// Errors that can occur in Jumpmark
#[derive(Debug, Error)]
pub enum JumpError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable store read/write errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// A usage increment could not be verified after exhausting its retries
    #[error("Usage count for '{id}' could not be verified after {retries} retries")]
    UsageConflict { id: String, retries: u32 },

    /// A usage count is already at its maximum
    #[error("Usage count for '{0}' cannot be incremented past its maximum")]
    UsageOverflow(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias for Jumpmark operations
pub type JumpResult<T> = Result<T, JumpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_conflict_message() {
        let err = JumpError::UsageConflict {
            id: "gh".to_string(),
            retries: 3,
        };
        assert_eq!(
            err.to_string(),
            "Usage count for 'gh' could not be verified after 3 retries"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: JumpError = parse.unwrap_err().into();
        assert!(matches!(err, JumpError::Json(_)));
    }
}
