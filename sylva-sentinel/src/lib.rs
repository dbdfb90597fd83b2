//! Sylva Sentinel - land-cover verification for carbon assets
//!
//! The sentinel assesses a coordinate pair and issues a [`VerificationRecord`]
//! stating whether the site qualifies for carbon credits and how many it yields.
//! Assessment is a deterministic simulation keyed on the coordinates, so the same
//! site always produces the same green cover and confidence.
//!
//! Features:
//! - Green cover and authenticity thresholds
//! - Double-counting detection against previously verified sites
//! - Arid-zone and open-water heuristics
//! - Verification history (the sentinel log)

pub mod config;
pub mod error;
pub mod record;
pub mod sentinel;

pub use config::SentinelConfig;
pub use error::{SentinelError, SentinelResult};
pub use record::{VerificationRecord, VerificationStatus, DOUBLE_COUNT_REASON};
pub use sentinel::Sentinel;

/// Version of the assessment model reported in the sentinel log
pub const SENTINEL_MODEL_VERSION: &str = "2.1.0";

/// Round `value` to `places` decimal places
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
