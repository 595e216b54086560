//! Error types for the upstream data providers.

use plogger_core::error::PloggerError;

/// Errors from the tourism and routing clients.
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unknown area: {0}")]
    UnknownArea(String),
    #[error("no sigungu matching '{sigungu}' in area {area}")]
    UnknownSigungu { area: String, sigungu: String },
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),
}

impl TourError {
    /// Whether this is a lookup miss rather than an upstream fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TourError::UnknownArea(_) | TourError::UnknownSigungu { .. }
        )
    }
}

impl From<reqwest::Error> for TourError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TourError::Decode(err.to_string())
        } else {
            TourError::Http(err.to_string())
        }
    }
}

impl From<TourError> for PloggerError {
    fn from(err: TourError) -> Self {
        if err.is_not_found() {
            PloggerError::NotFound(err.to_string())
        } else {
            PloggerError::Upstream(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tour_error_display() {
        let err = TourError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned status 503: busy");

        let err = TourError::UnknownSigungu {
            area: "1".to_string(),
            sigungu: "Nowhere".to_string(),
        };
        assert_eq!(err.to_string(), "no sigungu matching 'Nowhere' in area 1");
    }

    #[test]
    fn test_not_found_classification() {
        assert!(TourError::UnknownArea("Atlantis".into()).is_not_found());
        assert!(!TourError::Http("reset".into()).is_not_found());
        assert!(!TourError::MissingCredentials("TOUR_API_KEY").is_not_found());
    }

    #[test]
    fn test_into_plogger_error() {
        let err: PloggerError = TourError::UnknownArea("Atlantis".into()).into();
        assert!(matches!(err, PloggerError::NotFound(_)));

        let err: PloggerError = TourError::Decode("bad".into()).into();
        assert!(matches!(err, PloggerError::Upstream(_)));
    }
}
