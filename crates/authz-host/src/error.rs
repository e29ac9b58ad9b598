//! Error types for the access control engine.

use thiserror::Error;

/// Result type for access control operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Errors that can occur while building or evaluating a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// A directive line could not be parsed. Raised at configuration time;
    /// the loader rejects the whole scope.
    #[error("Configuration syntax error: {0}")]
    ConfigSyntax(String),

    /// An internal invariant was violated, e.g. a hand-built entry carrying a
    /// pattern the parser would never have produced.
    #[error("Logic error: {0}")]
    Logic(String),

    /// Serialized rule set could not be read or written.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthzError {
    /// Shorthand for a configuration syntax error.
    pub fn config(message: impl Into<String>) -> Self {
        AuthzError::ConfigSyntax(message.into())
    }

    /// Shorthand for a logic error.
    pub fn logic(message: impl Into<String>) -> Self {
        AuthzError::Logic(message.into())
    }

    /// Returns true if the error came from bad user configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, AuthzError::ConfigSyntax(_) | AuthzError::Serialization(_))
    }

    /// Returns true if the error indicates a construction bug.
    pub fn is_logic_error(&self) -> bool {
        matches!(self, AuthzError::Logic(_))
    }
}

impl From<serde_json::Error> for AuthzError {
    fn from(err: serde_json::Error) -> Self {
        AuthzError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AuthzError {
    fn from(err: serde_yaml::Error) -> Self {
        AuthzError::Serialization(err.to_string())
    }
}

impl From<regex::Error> for AuthzError {
    fn from(err: regex::Error) -> Self {
        AuthzError::Logic(format!("Invalid regex: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::config("allow must be followed by 'from'");
        assert_eq!(
            err.to_string(),
            "Configuration syntax error: allow must be followed by 'from'"
        );

        let err = AuthzError::logic("unknown order");
        assert_eq!(err.to_string(), "Logic error: unknown order");
    }

    #[test]
    fn test_error_kinds() {
        assert!(AuthzError::config("x").is_config_error());
        assert!(!AuthzError::config("x").is_logic_error());
        assert!(AuthzError::logic("x").is_logic_error());
        assert!(AuthzError::Serialization("x".to_string()).is_config_error());
    }

    #[test]
    fn test_from_json_error() {
        let err: AuthzError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(err, AuthzError::Serialization(_)));
    }
}
