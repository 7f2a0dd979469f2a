//! Error types for hard failures.
//!
//! Data-quality problems found while preprocessing a facility are never
//! raised through these types; they are accumulated as pipeline diagnostics
//! (see [`crate::models::Diagnostics`]). The variants here cover the few
//! conditions that make a pipeline impossible to build, plus I/O and
//! capability failures surfaced to callers that choose to handle them.

use std::time::Duration;

use thiserror::Error;

/// Main error type for SurveyGuard operations.
///
/// # Privacy
/// Error messages carry group codes, facility slugs and column ids only.
/// Respondent values and feedback text are never embedded.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// The group code is not a recognized facility group
    #[error("Invalid facility group: {code}")]
    InvalidGroup { code: String },

    /// The group/facility pair does not resolve to any dataset
    #[error("No survey data for facility '{facility}' in group {group}")]
    FacilityNotFound { group: String, facility: String },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An external capability failed or timed out
    #[error("Capability '{capability}' failed: {reason}")]
    Capability { capability: String, reason: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Survey file could not be parsed
    #[error("Survey file parsing failed: {context}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with SurveyError
pub type Result<T> = std::result::Result<T, SurveyError>;

impl SurveyError {
    /// Creates an invalid group error
    pub fn invalid_group(code: impl Into<String>) -> Self {
        Self::InvalidGroup { code: code.into() }
    }

    /// Creates a facility-not-found error
    pub fn facility_not_found(group: impl Into<String>, facility: impl Into<String>) -> Self {
        Self::FacilityNotFound {
            group: group.into(),
            facility: facility.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a capability failure error
    pub fn capability(capability: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Capability {
            capability: capability.into(),
            reason: reason.into(),
        }
    }

    /// Creates a capability timeout error
    pub fn capability_timeout(capability: impl Into<String>, timeout: Duration) -> Self {
        Self::Capability {
            capability: capability.into(),
            reason: format!("timed out after {} ms", timeout.as_millis()),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a CSV parsing error with context
    pub fn csv(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            context: context.into(),
            source,
        }
    }

    /// Returns true if the error is recoverable for a single feedback item.
    pub fn is_capability_failure(&self) -> bool {
        matches!(self, Self::Capability { .. })
    }
}
