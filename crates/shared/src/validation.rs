//! Common validation utilities.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Maximum age of a location timestamp in days.
const MAX_TIMESTAMP_AGE_DAYS: i64 = 7;

/// Maximum allowed future timestamp tolerance in seconds (5 minutes for clock skew).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 300;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that a location timestamp is within acceptable range.
/// - Must not be more than 5 minutes in the future (allows for clock skew)
/// - Must not be older than 7 days
pub fn validate_location_timestamp(timestamp: DateTime<Utc>) -> Result<(), ValidationError> {
    let now = Utc::now();
    let age = now.signed_duration_since(timestamp);

    if age.num_seconds() < -MAX_FUTURE_TOLERANCE_SECS {
        let mut err = ValidationError::new("timestamp_future");
        err.message = Some("Timestamp is too far in the future".into());
        return Err(err);
    }

    if age.num_days() > MAX_TIMESTAMP_AGE_DAYS {
        let mut err = ValidationError::new("timestamp_stale");
        err.message = Some("Timestamp is older than 7 days".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
        assert!(validate_longitude(-180.1).is_err());
    }

    #[test]
    fn test_validate_location_timestamp_now() {
        assert!(validate_location_timestamp(Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_location_timestamp_slightly_future() {
        let ts = Utc::now() + Duration::seconds(60);
        assert!(validate_location_timestamp(ts).is_ok());
    }

    #[test]
    fn test_validate_location_timestamp_too_far_future() {
        let ts = Utc::now() + Duration::seconds(600);
        assert!(validate_location_timestamp(ts).is_err());
    }

    #[test]
    fn test_validate_location_timestamp_stale() {
        let ts = Utc::now() - Duration::days(8);
        assert!(validate_location_timestamp(ts).is_err());
    }
}
