//! Verification records issued by the sentinel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Leading reason on records rejected as a repeat of an earlier verification
pub const DOUBLE_COUNT_REASON: &str = "CRITICAL: Potential Double Counting Detected";

/// Outcome of a site assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Verified,
    Flagged,
}

/// A single site assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub status: VerificationStatus,
    /// Percentage of the site under vegetation, 2 decimal places
    pub green_cover_percentage: f64,
    /// Model authenticity expressed as a percentage, 1 decimal place
    pub ai_confidence: f64,
    /// tCO2e credits issued for the site, zero when flagged
    pub carbon_credits: f64,
    pub reasons: Vec<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// Whether the record was rejected as a repeat of a verified site
    pub fn is_double_count(&self) -> bool {
        self.reasons.first().is_some_and(|r| r == DOUBLE_COUNT_REASON)
    }

    /// Display form used by the audit log, e.g. `(11.4102, 76.695)`
    pub fn location(&self) -> String {
        format!("({}, {})", self.latitude, self.longitude)
    }
}
