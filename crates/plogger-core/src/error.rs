use thiserror::Error;

/// Top-level error type for the plogger service.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for PloggerError` so that `?` works across crate
/// boundaries (startup, persistence, server wiring).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PloggerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<toml::de::Error> for PloggerError {
    fn from(err: toml::de::Error) -> Self {
        PloggerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PloggerError {
    fn from(err: toml::ser::Error) -> Self {
        PloggerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PloggerError {
    fn from(err: serde_json::Error) -> Self {
        PloggerError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for plogger operations.
pub type Result<T> = std::result::Result<T, PloggerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PloggerError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = PloggerError::NotFound("area 'Atlantis'".to_string());
        assert_eq!(err.to_string(), "Not found: area 'Atlantis'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PloggerError = io_err.into();
        assert!(matches!(err, PloggerError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let bad: std::result::Result<toml::Value, toml::de::Error> = toml::from_str("= nope");
        let err: PloggerError = bad.unwrap_err().into();
        assert!(matches!(err, PloggerError::Config(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let bad: std::result::Result<serde_json::Value, serde_json::Error> =
            serde_json::from_str("{not json");
        let err: PloggerError = bad.unwrap_err().into();
        assert!(matches!(err, PloggerError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
