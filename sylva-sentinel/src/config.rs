//! Configuration for the sentinel

use serde::{Deserialize, Serialize};

use crate::{SentinelError, SentinelResult};

/// Sentinel thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Minimum green cover percentage for a site to verify
    pub green_threshold: f64,
    /// Minimum authenticity score (0..=1) for a site to verify
    pub confidence_threshold: f64,
    /// Credits issued for a fully green site at full confidence
    pub max_credits_per_site: f64,
    /// Radius in degrees, on each axis, inside which a verified site counts twice
    pub double_count_radius_deg: f64,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            green_threshold: 45.0,
            confidence_threshold: 0.80,
            max_credits_per_site: 25.0,
            // roughly 500m
            double_count_radius_deg: 0.005,
        }
    }
}

impl SentinelConfig {
    /// Validate configuration
    pub fn validate(&self) -> SentinelResult<()> {
        if !(0.0..=100.0).contains(&self.green_threshold) {
            return Err(SentinelError::InvalidConfig(
                "Green threshold must be between 0 and 100".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(SentinelError::InvalidConfig(
                "Confidence threshold must be between 0 and 1".to_string(),
            ));
        }

        if !self.max_credits_per_site.is_finite() || self.max_credits_per_site <= 0.0 {
            return Err(SentinelError::InvalidConfig(
                "Max credits per site must be positive".to_string(),
            ));
        }

        if !self.double_count_radius_deg.is_finite() || self.double_count_radius_deg < 0.0 {
            return Err(SentinelError::InvalidConfig(
                "Double counting radius must be a non-negative number".to_string(),
            ));
        }

        Ok(())
    }
}
