//! Error types for the AIngle knowledge base.

use thiserror::Error;

/// A specialized `Result` type for knowledge base operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur while building, querying or editing a
/// knowledge base.
///
/// Match failures are not errors: unification reports them as `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A fact or rule could not be found in the knowledge base.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A query was not a fact.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A rule was defined incorrectly.
    #[error("Invalid rule definition: {0}")]
    InvalidRule(String),

    /// A line of the text front end could not be parsed.
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// An error occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidRule("missing consequent".to_string());
        assert!(err.to_string().contains("missing consequent"));
    }

    #[test]
    fn test_parse_error_carries_line() {
        let err = Error::parse(7, "unbalanced parentheses");
        assert_eq!(
            err.to_string(),
            "Parse error on line 7: unbalanced parentheses"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = bad.into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
