//! Coordinate value type shared by the encoder, coverings and bindings.

use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 latitude/longitude pair in decimal degrees.
///
/// Construction never validates; every operation that consumes a
/// coordinate does, so an out-of-range value is rejected where it is used
/// rather than silently clamped.
///
/// # Examples
///
/// ```rust
/// use kvgeo::Coordinates;
///
/// let sf = Coordinates::new(37.7749, -122.4194);
/// assert!(sf.is_valid());
/// assert!(!Coordinates::new(91.0, 0.0).is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees (-90.0 to +90.0)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180.0 to +180.0)
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        crate::compute::validation::validate_coordinates(self).is_ok()
    }

    pub(crate) fn to_latlng(self) -> s2::latlng::LatLng {
        s2::latlng::LatLng::from_degrees(self.latitude, self.longitude)
    }

    pub(crate) fn to_s2_point(self) -> s2::point::Point {
        s2::point::Point::from(self.to_latlng())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

impl From<Point> for Coordinates {
    fn from(point: Point) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinates> for Point {
    fn from(c: Coordinates) -> Self {
        Point::new(c.longitude, c.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_conversion_swaps_axes() {
        let point = Point::new(-74.0060, 40.7128);
        let coords = Coordinates::from(point);
        assert_eq!(coords.latitude, 40.7128);
        assert_eq!(coords.longitude, -74.0060);

        let back: Point = coords.into();
        assert_eq!(back, point);
    }

    #[test]
    fn test_serde_field_names() {
        let json = serde_json::to_string(&Coordinates::new(1.5, 2.5)).unwrap();
        assert_eq!(json, r#"{"latitude":1.5,"longitude":2.5}"#);
    }
}
