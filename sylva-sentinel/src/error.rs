//! Error types for sentinel operations

use thiserror::Error;

/// Result type for sentinel operations
pub type SentinelResult<T> = std::result::Result<T, SentinelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentinelError {
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Invalid sentinel configuration: {0}")]
    InvalidConfig(String),
}
