//! Geographic coordinate model.

use serde::{Deserialize, Serialize};
use shared::validation::{validate_latitude, validate_longitude};
use validator::ValidationError;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Validates that both components are within geographic range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_latitude(self.latitude)?;
        validate_longitude(self.longitude)?;
        Ok(())
    }
}
