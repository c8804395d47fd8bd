//! Exact geometry checks for post-filtering query candidates.
//!
//! Coverings over-fetch; the predicates here decide which candidates a
//! radius, bounding box or route query actually returns. Distances are
//! computed with the `geo` crate.

use crate::covering::EARTH_RADIUS_METERS;
use crate::types::Coordinates;
use geo::{Distance, Geodesic, Haversine, Point};

/// Distance metrics for post-filtering.
///
/// - **Haversine**: spherical distance, fast and accurate enough for most uses
/// - **Geodesic**: ellipsoidal distance (Karney 2013), slower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Haversine,
    Geodesic,
}

/// Distance between two coordinates in meters.
///
/// # Examples
///
/// ```rust
/// use kvgeo::Coordinates;
/// use kvgeo::spatial::{DistanceMetric, distance_between};
///
/// let nyc = Coordinates::new(40.7128, -74.0060);
/// let la = Coordinates::new(34.0522, -118.2437);
/// let dist = distance_between(&nyc, &la, DistanceMetric::Haversine);
/// assert!(dist > 3_900_000.0);
/// ```
pub fn distance_between(a: &Coordinates, b: &Coordinates, metric: DistanceMetric) -> f64 {
    let (pa, pb): (Point, Point) = ((*a).into(), (*b).into());
    match metric {
        DistanceMetric::Haversine => Haversine.distance(pa, pb),
        DistanceMetric::Geodesic => Geodesic.distance(pa, pb),
    }
}

/// Whether `point` lies within `radius_meters` of `center`, boundary included.
pub fn within_radius(
    center: &Coordinates,
    point: &Coordinates,
    radius_meters: f64,
    metric: DistanceMetric,
) -> bool {
    distance_between(center, point, metric) <= radius_meters
}

/// Whether `point` lies inside the box spanned by two corners.
///
/// Matches the rectangle used for bounding box coverings: corner roles are
/// not enforced, and a longitude span over 180 degrees wraps through the
/// antimeridian.
pub fn point_in_bbox(point: &Coordinates, ne: &Coordinates, sw: &Coordinates) -> bool {
    let (south, north) = (
        ne.latitude.min(sw.latitude),
        ne.latitude.max(sw.latitude),
    );
    if point.latitude < south || point.latitude > north {
        return false;
    }

    let (west, east) = (
        ne.longitude.min(sw.longitude),
        ne.longitude.max(sw.longitude),
    );
    if east - west > 180.0 {
        point.longitude >= east || point.longitude <= west
    } else {
        point.longitude >= west && point.longitude <= east
    }
}

/// Smallest great-circle distance in meters from `point` to any segment of
/// `path`. A single-point path degenerates to the distance to that point;
/// an empty path is infinitely far away.
pub fn distance_to_path(point: &Coordinates, path: &[Coordinates]) -> f64 {
    match path {
        [] => f64::INFINITY,
        [only] => distance_between(point, only, DistanceMetric::Haversine),
        _ => path
            .windows(2)
            .map(|edge| distance_to_segment(point, &edge[0], &edge[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

fn distance_to_segment(p: &Coordinates, a: &Coordinates, b: &Coordinates) -> f64 {
    let to_start = distance_between(a, p, DistanceMetric::Haversine);
    let to_end = distance_between(b, p, DistanceMetric::Haversine);
    let length = distance_between(a, b, DistanceMetric::Haversine);
    if length == 0.0 {
        return to_start;
    }

    let delta = (bearing(a, p) - bearing(a, b)).to_radians();
    if delta.cos() <= 0.0 {
        // behind the start of the segment
        return to_start;
    }

    let angular = to_start / EARTH_RADIUS_METERS;
    let cross_track = (angular.sin() * delta.sin()).clamp(-1.0, 1.0).asin();
    let along_track = (angular.cos() / cross_track.cos()).clamp(-1.0, 1.0).acos();
    if along_track * EARTH_RADIUS_METERS > length {
        return to_end;
    }

    (cross_track.abs() * EARTH_RADIUS_METERS).min(to_start).min(to_end)
}

/// Initial bearing from `from` to `to`, degrees clockwise from north.
fn bearing(from: &Coordinates, to: &Coordinates) -> f64 {
    let (lat1, lat2) = (from.latitude.to_radians(), to.latitude.to_radians());
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    y.atan2(x).to_degrees()
}
