//! Error types shared by every cookie jar operation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CookieError>;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("Unsupported platform for profile gathering: {0}")]
    UnsupportedPlatform(String),

    #[error("Cookie database does not exist at {0}")]
    MissingDatabase(String),

    #[error("{what} expected {expected:?} - Got {actual:?}")]
    InvalidSchema {
        what: &'static str,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("{0}")]
    Operation(String),

    #[error("Could not commit changes to database, is browser open? - {0}")]
    Commit(String),

    #[error("Please specify something to search by")]
    InvalidQuery,

    #[error("Could not generate unique timestamp after {0} attempts")]
    TimestampGeneration(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CookieError {
    /// Wrap any failure raised inside an operation boundary.
    pub fn operation(err: impl std::fmt::Display) -> Self {
        CookieError::Operation(err.to_string())
    }

    pub fn commit(err: impl std::fmt::Display) -> Self {
        CookieError::Commit(err.to_string())
    }

    /// True for failures reported by add/delete/update/find/dump.
    pub fn is_operation(&self) -> bool {
        matches!(self, CookieError::Operation(_) | CookieError::Commit(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_message_mentions_browser() {
        let err = CookieError::commit("database is locked");
        assert!(err.to_string().contains("is browser open?"));
        assert!(err.to_string().ends_with("database is locked"));
        assert!(err.is_operation());
    }

    #[test]
    fn test_schema_message_shows_both_shapes() {
        let err = CookieError::InvalidSchema {
            what: "Tables",
            expected: vec!["moz_cookies".into()],
            actual: vec![],
        };
        assert_eq!(err.to_string(), "Tables expected [\"moz_cookies\"] - Got []");
        assert!(!err.is_operation());
    }

    #[test]
    fn test_json_errors_convert() {
        let err: CookieError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, CookieError::Json(_)));
        assert!(err.to_string().starts_with("JSON error"));
    }
}
