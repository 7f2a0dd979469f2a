//! Pipeline configuration.
//!
//! Tunables for the anonymization threshold, capability calls and the
//! survey cache. Every field has a sensible default so callers usually
//! start from [`PipelineConfig::default`] and override a few values with the
//! builder methods.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default k-anonymity threshold.
pub const DEFAULT_MIN_K: usize = 5;

/// Label of the pseudo-facility covering a whole group.
pub const ALL_FACILITIES: &str = "All Facilities";

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum group size for published categories and buckets
    pub min_k: usize,
    /// Timeout applied to each entity detection or sentiment call
    #[serde(with = "duration_millis")]
    pub capability_timeout: Duration,
    /// Feedback longer than this is truncated before sentiment scoring
    pub sentiment_max_chars: usize,
    /// How long a loaded group stays cached before it is reloaded
    #[serde(with = "duration_millis")]
    pub cache_ttl: Duration,
    /// Label of the pseudo-facility covering the whole group
    pub all_facilities_label: String,
}

/// Validation errors for pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("min_k must be at least 1, got {0}")]
    InvalidMinK(usize),
    #[error("capability_timeout must be non-zero")]
    ZeroTimeout,
    #[error("sentiment_max_chars must be at least 1")]
    ZeroSentimentLength,
    #[error("all_facilities_label must not be empty")]
    EmptyAllFacilitiesLabel,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_k: DEFAULT_MIN_K,
            capability_timeout: Duration::from_secs(10),
            sentiment_max_chars: 2000,
            cache_ttl: Duration::from_secs(15 * 60),
            all_facilities_label: ALL_FACILITIES.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new pipeline config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the k-anonymity threshold.
    pub fn with_min_k(mut self, min_k: usize) -> Self {
        if min_k == 0 {
            tracing::warn!("min_k 0 raised to 1");
        }
        self.min_k = min_k.max(1);
        self
    }

    /// Builder method to set the capability timeout.
    pub fn with_capability_timeout(mut self, timeout: Duration) -> Self {
        self.capability_timeout = timeout;
        self
    }

    /// Builder method to set the sentiment truncation length.
    pub fn with_sentiment_max_chars(mut self, max_chars: usize) -> Self {
        self.sentiment_max_chars = max_chars;
        self
    }

    /// Builder method to set the cache time-to-live.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Builder method to rename the whole-group pseudo-facility.
    pub fn with_all_facilities_label(mut self, label: impl Into<String>) -> Self {
        self.all_facilities_label = label.into();
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.min_k == 0 {
            return Err(ConfigValidationError::InvalidMinK(self.min_k));
        }
        if self.capability_timeout.is_zero() {
            return Err(ConfigValidationError::ZeroTimeout);
        }
        if self.sentiment_max_chars == 0 {
            return Err(ConfigValidationError::ZeroSentimentLength);
        }
        if self.all_facilities_label.trim().is_empty() {
            return Err(ConfigValidationError::EmptyAllFacilitiesLabel);
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_k, 5);
        assert_eq!(config.capability_timeout, Duration::from_secs(10));
        assert_eq!(config.sentiment_max_chars, 2000);
        assert_eq!(config.all_facilities_label, "All Facilities");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::new()
            .with_min_k(10)
            .with_capability_timeout(Duration::from_millis(250))
            .with_sentiment_max_chars(512)
            .with_cache_ttl(Duration::from_secs(60))
            .with_all_facilities_label("Every Site");

        assert_eq!(config.min_k, 10);
        assert_eq!(config.capability_timeout, Duration::from_millis(250));
        assert_eq!(config.sentiment_max_chars, 512);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.all_facilities_label, "Every Site");
    }

    #[test]
    fn test_min_k_clamped() {
        let config = PipelineConfig::new().with_min_k(0);
        assert_eq!(config.min_k, 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = PipelineConfig {
            min_k: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidMinK(0))
        ));

        let config = PipelineConfig::new().with_capability_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::ZeroTimeout)
        ));

        let config = PipelineConfig::new().with_sentiment_max_chars(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::ZeroSentimentLength)
        ));

        let config = PipelineConfig::new().with_all_facilities_label("  ");
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::EmptyAllFacilitiesLabel)
        ));
    }

    #[test]
    fn test_pipeline_config_serde_roundtrip() {
        let config = PipelineConfig::new()
            .with_min_k(7)
            .with_capability_timeout(Duration::from_millis(1500));

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"capability_timeout\":1500"));
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.min_k, 7);
        assert_eq!(deserialized.capability_timeout, Duration::from_millis(1500));
    }
}
