//! Error types for a daily run.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a run.
#[derive(Error, Debug)]
pub enum RunError {
    /// Day index or prompt text rejected before any call is made
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Required credential not present in the environment
    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// Transport failure talking to an external service
    #[error("network error: {0}")]
    Network(String),

    /// External service answered with an error status
    #[error("api error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Response could not be read as the expected text or JSON
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Response parsed but does not match the persona's output shape
    #[error("schema mismatch for {persona}: {detail}")]
    SchemaMismatch { persona: String, detail: String },

    /// A dated record for this day is already on disk
    #[error("record already exists: {}", path.display())]
    RecordExists { path: PathBuf },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Posting to the social platform failed
    #[error("publish failed: {0}")]
    Publish(String),
}

impl RunError {
    pub fn schema(persona: &str, detail: impl Into<String>) -> Self {
        RunError::SchemaMismatch {
            persona: persona.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result type alias for run operations.
pub type Result<T> = std::result::Result<T, RunError>;

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_multibyte() {
        let s = "今日一念abc";
        assert_eq!(truncate_chars(s, 2), "今日");
        assert_eq!(truncate_chars(s, 100), s);
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_error_display() {
        let err = RunError::Api {
            status: 429,
            body: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "api error (429): slow down");

        let err = RunError::schema("unified", "missing key 'ops'");
        assert!(err.to_string().contains("unified"));
        assert!(err.to_string().contains("missing key 'ops'"));
    }
}
