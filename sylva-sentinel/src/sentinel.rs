//! Site assessment and verification history

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::SentinelConfig;
use crate::record::{VerificationRecord, VerificationStatus, DOUBLE_COUNT_REASON};
use crate::{round_to, SentinelError, SentinelResult};

/// Reference forest plot with known ground truth
const CALIBRATION_SITE: (f64, f64) = (11.4102, 76.6950);
const CALIBRATION_TOLERANCE_DEG: f64 = 0.001;

/// Terrain class inferred from coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terrain {
    Arid,
    OpenWater,
    Vegetated,
}

impl Terrain {
    fn classify(lat: f64, lon: f64) -> Self {
        // Sahel, Sahara and the Arabian peninsula
        let arid = (12.0..=35.0).contains(&lat) && (-20.0..=50.0).contains(&lon);
        let ocean = (lat < 10.0 && lon > 50.0)
            || (lat < 0.0 && -20.0 < lon && lon < 20.0)
            || (lat < 20.0 && -180.0 < lon && lon < -100.0);

        if arid {
            Terrain::Arid
        } else if ocean {
            Terrain::OpenWater
        } else {
            Terrain::Vegetated
        }
    }
}

/// Raw model output before the decision step
struct Observation {
    green_cover: f64,
    authenticity: f64,
    reasons: Vec<String>,
}

/// Land-cover sentinel
#[derive(Debug, Clone, Default)]
pub struct Sentinel {
    config: SentinelConfig,
    history: Vec<VerificationRecord>,
}

impl Sentinel {
    pub fn new(config: SentinelConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    /// Assess a site and record the result in the verification history
    ///
    /// Repeats of an already verified site are returned flagged but not recorded.
    pub fn verify(&mut self, lat: f64, lon: f64) -> SentinelResult<VerificationRecord> {
        let record = self.assess(lat, lon)?;
        if record.is_double_count() {
            return Ok(record);
        }

        info!(
            "Sentinel verified ({}, {}): {:?}, {} credits",
            lat, lon, record.status, record.carbon_credits
        );
        self.history.push(record.clone());
        Ok(record)
    }

    /// Assess a site without recording it
    pub fn estimate(&self, lat: f64, lon: f64) -> SentinelResult<VerificationRecord> {
        let record = self.assess(lat, lon)?;
        debug!("Sentinel estimate ({}, {}): {:?}", lat, lon, record.status);
        Ok(record)
    }

    /// All recorded verifications, oldest first
    pub fn history(&self) -> &[VerificationRecord] {
        &self.history
    }

    /// Seed the history with records verified in an earlier run
    pub fn restore_history<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = VerificationRecord>,
    {
        self.history
            .extend(records.into_iter().filter(|r| !r.is_double_count()));
    }

    fn assess(&self, lat: f64, lon: f64) -> SentinelResult<VerificationRecord> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(SentinelError::InvalidCoordinates { lat, lon });
        }

        if let Some(prior) = self.prior_verification(lat, lon) {
            warn!("Double counting attempt at ({}, {})", lat, lon);
            return Ok(VerificationRecord {
                latitude: lat,
                longitude: lon,
                status: VerificationStatus::Flagged,
                green_cover_percentage: prior.green_cover_percentage,
                ai_confidence: 100.0,
                carbon_credits: 0.0,
                reasons: vec![
                    DOUBLE_COUNT_REASON.to_string(),
                    format!("Asset already verified at {}", prior.location()),
                ],
                timestamp: Utc::now(),
            });
        }

        let Observation {
            green_cover,
            authenticity,
            mut reasons,
        } = Self::observe(lat, lon);

        let mut valid = true;

        if green_cover < self.config.green_threshold {
            valid = false;
            reasons.push(format!(
                "Insufficient Green Cover ({:.1}% < {:.1}%)",
                green_cover, self.config.green_threshold
            ));
        }

        if authenticity < self.config.confidence_threshold {
            valid = false;
            reasons.push(format!(
                "AI Confidence Low - Potential Forgery ({:.1}% < {:.1}%)",
                authenticity * 100.0,
                self.config.confidence_threshold * 100.0
            ));
        }

        let status = if valid {
            if reasons.is_empty() {
                reasons.push("Asset Meets All Environmental Criteria".to_string());
            }
            VerificationStatus::Verified
        } else {
            VerificationStatus::Flagged
        };

        let carbon_credits = if valid {
            (green_cover / 100.0) * self.config.max_credits_per_site * authenticity
        } else {
            0.0
        };

        Ok(VerificationRecord {
            latitude: lat,
            longitude: lon,
            status,
            green_cover_percentage: round_to(green_cover, 2),
            ai_confidence: round_to(authenticity * 100.0, 1),
            carbon_credits: round_to(carbon_credits, 2),
            reasons,
            timestamp: Utc::now(),
        })
    }

    fn prior_verification(&self, lat: f64, lon: f64) -> Option<&VerificationRecord> {
        let radius = self.config.double_count_radius_deg;
        self.history.iter().find(|past| {
            past.is_verified()
                && (lat - past.latitude).abs() < radius
                && (lon - past.longitude).abs() < radius
        })
    }

    /// Simulated imagery analysis, deterministic per coordinate pair
    fn observe(lat: f64, lon: f64) -> Observation {
        let (cal_lat, cal_lon) = CALIBRATION_SITE;
        if (lat - cal_lat).abs() < CALIBRATION_TOLERANCE_DEG
            && (lon - cal_lon).abs() < CALIBRATION_TOLERANCE_DEG
        {
            return Observation {
                green_cover: 94.5,
                authenticity: 0.99,
                reasons: vec!["High Density Forest Detected".to_string()],
            };
        }

        let seed = (lat * 123.45 + lon * 67.89).to_bits();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut reasons = Vec::new();

        let (green_cover, authenticity) = match Terrain::classify(lat, lon) {
            Terrain::Arid => {
                let green = rng.gen_range(2.0..18.0);
                let auth = rng.gen_range(0.65..0.95);
                if green < 10.0 {
                    reasons.push("High Aridity Index - Desert Landscape Detected".to_string());
                }
                (green, auth)
            }
            Terrain::OpenWater => {
                reasons.push(
                    "Geospatial Signature Identifies Open Water / Marine Environment".to_string(),
                );
                (rng.gen_range(0.0..5.0), rng.gen_range(0.90..0.99))
            }
            Terrain::Vegetated => (rng.gen_range(35.0..98.0), rng.gen_range(0.78..0.99)),
        };

        Observation {
            green_cover,
            authenticity,
            reasons,
        }
    }
}
