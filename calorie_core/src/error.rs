//! Error types for the calorie_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for calorie_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required biometric is missing, non-positive or out of range
    #[error("Invalid biometrics: {0}")]
    InvalidBiometrics(String),

    /// Goal is not one of lose_weight, maintain, gain_muscle
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// Activity level is not one of the five recognised levels
    #[error("Invalid activity level: {0}")]
    InvalidActivityLevel(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration or policy validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No stored profile for the given id
    #[error("Profile not found: {0}")]
    ProfileNotFound(Uuid),

    /// Profile persistence error
    #[error("Profile error: {0}")]
    Profile(String),
}

impl Error {
    /// Whether retrying the same call could succeed.
    ///
    /// Input validation failures never are; the caller has to re-collect
    /// the offending field.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// True for the input validation kinds raised by the engine
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidBiometrics(_) | Error::InvalidGoal(_) | Error::InvalidActivityLevel(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_not_retryable() {
        let errors = [
            Error::InvalidBiometrics("age_years must be in [1, 120]".into()),
            Error::InvalidGoal("unknown".into()),
            Error::InvalidActivityLevel("extreme".into()),
        ];

        for err in &errors {
            assert!(err.is_validation());
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_display_includes_offending_value() {
        let err = Error::InvalidActivityLevel("extreme".into());
        assert_eq!(err.to_string(), "Invalid activity level: extreme");
    }
}
