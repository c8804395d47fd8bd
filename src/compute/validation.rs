//! Validation for geographic coordinates, paths and precision levels.

use crate::error::{GeoIndexError, Result};
use crate::types::Coordinates;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Finest S2 level (leaf cells).
pub const MAX_LEVEL: i32 = 30;

/// Validates a coordinate has a finite latitude in [-90.0, 90.0] and a
/// finite longitude in [-180.0, 180.0].
///
/// # Examples
///
/// ```
/// use kvgeo::Coordinates;
/// use kvgeo::compute::validation::validate_coordinates;
///
/// assert!(validate_coordinates(&Coordinates::new(40.7128, -74.0060)).is_ok());
/// assert!(validate_coordinates(&Coordinates::new(95.0, -74.0)).is_err());
/// assert!(validate_coordinates(&Coordinates::new(40.0, f64::NAN)).is_err());
/// ```
pub fn validate_coordinates(c: &Coordinates) -> Result<()> {
    // NaN fails both range checks
    if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&c.latitude)
        || !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&c.longitude)
    {
        return Err(GeoIndexError::InvalidCoordinate {
            latitude: c.latitude,
            longitude: c.longitude,
        });
    }
    Ok(())
}

/// Validates a route: at least two points, every point in range.
pub fn validate_path(path: &[Coordinates]) -> Result<()> {
    if path.len() < 2 {
        return Err(GeoIndexError::InvalidPath { length: path.len() });
    }
    for (idx, point) in path.iter().enumerate() {
        validate_coordinates(point).inspect_err(|_| {
            log::debug!("Rejecting route: point at index {} is {}", idx, point);
        })?;
    }
    Ok(())
}

/// Validates a level used to select stored precision.
pub fn validate_level(level: i32) -> Result<()> {
    if !(0..=MAX_LEVEL).contains(&level) {
        return Err(GeoIndexError::InvalidLevel(level));
    }
    Ok(())
}

/// Validates a search radius in meters.
pub fn validate_radius(radius_meters: f64) -> Result<()> {
    if !radius_meters.is_finite() || radius_meters < 0.0 {
        return Err(GeoIndexError::InvalidRadius(radius_meters));
    }
    Ok(())
}
