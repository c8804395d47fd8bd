//! Query covering generation.
//!
//! Turns a radius, bounding box or route query into a set of cells whose
//! union contains the query region. Each returned [`GeoHash`] is tagged
//! with the caller's storage level, so `trimmed()`, `min()` and `max()` give
//! the partition and range-scan bounds to hand to the store.
//!
//! Coverings are approximate and over-inclusive. Candidates must be
//! post-filtered for true distance or containment (see [`crate::spatial`]).
//! The order of the returned cells carries no meaning.

use crate::cell::{CellRange, GeoHash, cell_range, level_of, trim};
use crate::compute::validation::{validate_coordinates, validate_path, validate_radius};
use crate::coverer::{self, AREA_COVERER, CovererConfig, POLYLINE_COVERER};
use crate::error::Result;
use crate::types::Coordinates;
use s2::cap::Cap;
use s2::cellid::CellID;
use s2::rect::Rect;
use s2::s1::angle::Angle;
use smallvec::SmallVec;
use std::cmp::Reverse;

/// Mean Earth radius used to turn meters into a cap angle.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Longest great-circle arc covered by a single route rectangle.
const MAX_ROUTE_EDGE_DEGREES: f64 = 0.5;

/// Covers the circle of `radius_meters` around `center`.
///
/// `coverer` overrides [`AREA_COVERER`]. Its `min_level` wins over
/// `max_cells`: a radius much larger than a `min_level` cell yields more
/// cells than the budget.
///
/// # Examples
///
/// ```rust
/// use kvgeo::{Coordinates, covering};
///
/// let sf = Coordinates::new(37.7749, -122.4194);
/// let hashes = covering::hashes_from_radius(&sf, 1000.0, 10, None)?;
/// assert!(!hashes.is_empty());
/// assert!(hashes.iter().all(|h| (9..=13).contains(&h.cell_level())));
/// # Ok::<(), kvgeo::GeoIndexError>(())
/// ```
pub fn hashes_from_radius(
    center: &Coordinates,
    radius_meters: f64,
    level: i32,
    coverer: Option<&CovererConfig>,
) -> Result<Vec<GeoHash>> {
    validate_coordinates(center)?;
    validate_radius(radius_meters)?;
    let config = coverer::resolve(coverer, AREA_COVERER)?;

    let angle = Angle::from(s2::s1::Rad(radius_meters / EARTH_RADIUS_METERS));
    let cap = Cap::from_center_angle(&center.to_s2_point(), &angle);
    let cells = ids(config.to_region_coverer().covering(&cap).0);

    log::debug!(
        "Radius covering around {} ({} m): {} cells",
        center,
        radius_meters,
        cells.len()
    );
    warn_over_budget(&cells, &config);
    Ok(into_hashes(cells, center, &config, level))
}

/// Covers the smallest lat/lng rectangle containing both corners.
///
/// Corner roles are not enforced: swapping `ne` and `sw` yields the same
/// rectangle. The longitude span is the shorter arc between the corners, so
/// a box whose corners straddle the antimeridian wraps across it. Corners
/// at longitudes 180 and -180 lie on the same meridian. `coverer` overrides
/// [`AREA_COVERER`], and as with [`hashes_from_radius`] its `min_level` wins
/// over `max_cells`.
pub fn hashes_from_bbox(
    ne: &Coordinates,
    sw: &Coordinates,
    level: i32,
    coverer: Option<&CovererConfig>,
) -> Result<Vec<GeoHash>> {
    validate_coordinates(ne)?;
    validate_coordinates(sw)?;
    let config = coverer::resolve(coverer, AREA_COVERER)?;

    let rect = rect_between(ne, sw);
    let cells = ids(config.to_region_coverer().covering(&rect).0);

    log::debug!(
        "Bounding box covering {} / {}: {} cells",
        ne,
        sw,
        cells.len()
    );
    warn_over_budget(&cells, &config);
    Ok(into_hashes(cells, ne, &config, level))
}

/// Covers the polyline through `path`.
///
/// Every edge is split into great-circle pieces of at most half a degree,
/// each piece's bounding rectangle is covered, and the union is coarsened
/// until it fits the cell budget. The covering cells themselves widen the
/// line into a corridor. `coverer` overrides [`POLYLINE_COVERER`].
pub fn hashes_from_route(
    path: &[Coordinates],
    level: i32,
    coverer: Option<&CovererConfig>,
) -> Result<Vec<GeoHash>> {
    validate_path(path)?;
    let config = coverer::resolve(coverer, POLYLINE_COVERER)?;
    let region_coverer = config.to_region_coverer();

    let mut cells = Vec::new();
    for edge in path.windows(2) {
        let pieces = densify(&edge[0], &edge[1]);
        for piece in pieces.windows(2) {
            let rect = rect_between(&piece[0], &piece[1]);
            cells.extend(region_coverer.covering(&rect).0.iter().map(|c| c.0));
        }
    }

    normalize(&mut cells);
    fit_budget(&mut cells, &config);

    log::debug!(
        "Route covering over {} points: {} cells",
        path.len(),
        cells.len()
    );
    Ok(into_hashes(cells, &path[0], &config, level))
}

/// Merges the subtree ranges of `hashes` into the fewest disjoint scans,
/// sorted by start.
pub fn scan_ranges(hashes: &[GeoHash]) -> Vec<CellRange> {
    let mut ranges: Vec<CellRange> = hashes.iter().map(GeoHash::range).collect();
    ranges.sort();

    let mut merged: Vec<CellRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            // leaf ids are odd, so the next cell starts two past this one's end
            Some(current) if range.min <= current.max.saturating_add(2) => {
                current.max = current.max.max(range.max);
            }
            _ => merged.push(range),
        }
    }
    merged
}

fn warn_over_budget(cells: &[u64], config: &CovererConfig) {
    if cells.len() > config.max_cells {
        log::warn!(
            "Covering has {} cells, over the budget of {}, because min_level {} is too fine for the region",
            cells.len(),
            config.max_cells,
            config.min_level
        );
    }
}

fn ids(cells: Vec<CellID>) -> Vec<u64> {
    cells.into_iter().map(|c| c.0).collect()
}

fn into_hashes(
    mut cells: Vec<u64>,
    anchor: &Coordinates,
    config: &CovererConfig,
    level: i32,
) -> Vec<GeoHash> {
    if cells.is_empty() {
        // Degenerate region: fall back to the anchor's cell at the finest
        // level the policy allows.
        log::warn!(
            "Covering produced no cells, using the cell containing {}",
            anchor
        );
        let leaf = CellID::from(anchor.to_latlng()).0;
        cells.push(trim(leaf, config.max_level as i32));
    }
    cells
        .into_iter()
        .map(|id| GeoHash::from_cell(id, level))
        .collect()
}

fn rect_between(a: &Coordinates, b: &Coordinates) -> Rect {
    let (lat_lo, lat_hi) = (
        a.latitude.min(b.latitude),
        a.latitude.max(b.latitude),
    );
    let (west, east) = (
        a.longitude.min(b.longitude),
        a.longitude.max(b.longitude),
    );
    if east - west >= 360.0 {
        // 180 and -180 are the same meridian
        Rect::from_degrees(lat_lo, 180.0, lat_hi, 180.0)
    } else if east - west > 180.0 {
        // inverted interval wraps through the antimeridian
        Rect::from_degrees(lat_lo, east, lat_hi, west)
    } else {
        Rect::from_degrees(lat_lo, west, lat_hi, east)
    }
}

/// Points along the great circle from `a` to `b`, both ends included, no
/// more than [`MAX_ROUTE_EDGE_DEGREES`] apart.
fn densify(a: &Coordinates, b: &Coordinates) -> SmallVec<[Coordinates; 8]> {
    let va = unit_vector(a);
    let vb = unit_vector(b);
    let cross = [
        va[1] * vb[2] - va[2] * vb[1],
        va[2] * vb[0] - va[0] * vb[2],
        va[0] * vb[1] - va[1] * vb[0],
    ];
    let sin_theta = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
    let cos_theta = va[0] * vb[0] + va[1] * vb[1] + va[2] * vb[2];
    let theta = sin_theta.atan2(cos_theta);

    let steps = (theta.to_degrees() / MAX_ROUTE_EDGE_DEGREES).ceil().max(1.0) as usize;
    let mut points = SmallVec::with_capacity(steps + 1);
    points.push(*a);

    // Near-antipodal edges have no unique great circle
    let use_slerp = sin_theta > 1e-12;
    for i in 1..steps {
        let t = i as f64 / steps as f64;
        let p = if use_slerp {
            let wa = ((1.0 - t) * theta).sin() / sin_theta;
            let wb = (t * theta).sin() / sin_theta;
            [
                wa * va[0] + wb * vb[0],
                wa * va[1] + wb * vb[1],
                wa * va[2] + wb * vb[2],
            ]
        } else {
            let lat = a.latitude + (b.latitude - a.latitude) * t;
            let lon = a.longitude + (b.longitude - a.longitude) * t;
            unit_vector(&Coordinates::new(lat, lon))
        };
        points.push(from_unit_vector(p));
    }

    points.push(*b);
    points
}

fn unit_vector(c: &Coordinates) -> [f64; 3] {
    let (lat, lon) = (c.latitude.to_radians(), c.longitude.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn from_unit_vector(v: [f64; 3]) -> Coordinates {
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
    let lon = v[1].atan2(v[0]);
    Coordinates::new(
        lat.to_degrees().clamp(-90.0, 90.0),
        lon.to_degrees().clamp(-180.0, 180.0),
    )
}

/// Sorts `cells` and drops duplicates and cells nested inside another.
fn normalize(cells: &mut Vec<u64>) {
    cells.sort_by_key(|&id| {
        let range = cell_range(id);
        (range.min, Reverse(range.max))
    });

    let mut covered_to: Option<u64> = None;
    cells.retain(|&id| {
        let range = cell_range(id);
        if let Some(hi) = covered_to
            && range.max <= hi
        {
            return false;
        }
        covered_to = Some(range.max);
        true
    });
}

/// Coarsens the finest cells until the covering fits `max_cells` or every
/// cell is at `min_level`.
fn fit_budget(cells: &mut Vec<u64>, config: &CovererConfig) {
    let step = config.level_mod.max(1);
    while cells.len() > config.max_cells {
        let Some(finest) = cells.iter().filter_map(|&id| level_of(id)).max() else {
            return;
        };
        let finest = finest as u8;
        if finest <= config.min_level {
            log::warn!(
                "Covering has {} cells, over the budget of {}, but min_level {} prevents coarsening",
                cells.len(),
                config.max_cells,
                config.min_level
            );
            return;
        }

        let target = config.snap_level(finest.saturating_sub(step)) as i32;
        for id in cells.iter_mut() {
            if level_of(*id) == Some(finest as i32) {
                *id = trim(*id, target);
            }
        }
        normalize(cells);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeoIndexError;

    fn sf() -> Coordinates {
        Coordinates::new(37.7749, -122.4194)
    }

    #[test]
    fn test_radius_default_preset() {
        let hashes = hashes_from_radius(&sf(), 1000.0, 10, None).unwrap();
        assert!(!hashes.is_empty());
        for hash in &hashes {
            assert!(CellID(hash.hash()).is_valid());
            assert!((9..=13).contains(&hash.cell_level()));
            assert_eq!(hash.level(), 10);
        }
    }

    #[test]
    fn test_radius_contains_center() {
        let leaf = crate::cell::encode(&sf()).unwrap();
        let hashes = hashes_from_radius(&sf(), 1000.0, 12, None).unwrap();
        assert!(hashes.iter().any(|h| h.range().contains(leaf)));
    }

    #[test]
    fn test_radius_custom_coverer() {
        let custom = CovererConfig::area().with_levels(5, 8).with_max_cells(4);
        let hashes = hashes_from_radius(&sf(), 5000.0, 8, Some(&custom)).unwrap();
        assert!(!hashes.is_empty());
        assert!(hashes.iter().all(|h| (5..=8).contains(&h.cell_level())));
    }

    #[test]
    fn test_radius_zero_is_not_empty() {
        let hashes = hashes_from_radius(&sf(), 0.0, 10, None).unwrap();
        assert!(!hashes.is_empty());
    }

    #[test]
    fn test_radius_invalid_inputs() {
        assert!(matches!(
            hashes_from_radius(&Coordinates::new(91.0, 0.0), 1000.0, 10, None),
            Err(GeoIndexError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            hashes_from_radius(&sf(), -5.0, 10, None),
            Err(GeoIndexError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_bbox() {
        let ne = Coordinates::new(38.0, -122.0);
        let sw = Coordinates::new(37.0, -123.0);
        let hashes = hashes_from_bbox(&ne, &sw, 10, None).unwrap();
        assert!(!hashes.is_empty());
        assert!(hashes.iter().all(|h| (9..=13).contains(&h.cell_level())));

        let swapped = hashes_from_bbox(&sw, &ne, 10, None).unwrap();
        assert!(!swapped.is_empty());

        let mut a: Vec<u64> = hashes.iter().map(GeoHash::hash).collect();
        let mut b: Vec<u64> = swapped.iter().map(GeoHash::hash).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_min_level_wins_over_budget() {
        let coarse = CovererConfig::area().with_levels(3, 6).with_max_cells(8);
        let hashes = hashes_from_radius(&sf(), 5_000_000.0, 3, Some(&coarse)).unwrap();
        assert!(hashes.len() > coarse.max_cells);
        assert!(hashes.iter().all(|h| h.cell_level() >= 3));
    }

    #[test]
    fn test_bbox_on_the_dateline_meridian() {
        let rect = rect_between(&Coordinates::new(10.0, 180.0), &Coordinates::new(-10.0, -180.0));
        assert!(!rect.is_empty());

        let hashes = hashes_from_bbox(
            &Coordinates::new(10.0, 180.0),
            &Coordinates::new(-10.0, -180.0),
            10,
            None,
        )
        .unwrap();
        for at in [(10.0, 180.0), (-10.0, -180.0), (-10.0, 180.0), (0.0, 180.0)] {
            let leaf = crate::cell::encode(&Coordinates::new(at.0, at.1)).unwrap();
            assert!(hashes.iter().any(|h| h.range().contains(leaf)));
        }
    }

    #[test]
    fn test_bbox_invalid_corner() {
        let ok = Coordinates::new(37.0, -123.0);
        assert!(matches!(
            hashes_from_bbox(&Coordinates::new(38.0, -190.0), &ok, 10, None),
            Err(GeoIndexError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            hashes_from_bbox(&ok, &Coordinates::new(-95.0, 0.0), 10, None),
            Err(GeoIndexError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_bbox_across_antimeridian() {
        let east = Coordinates::new(-16.0, -179.5);
        let west = Coordinates::new(-17.0, 179.5);
        let hashes = hashes_from_bbox(&east, &west, 10, None).unwrap();
        assert!(!hashes.is_empty());

        let inside = crate::cell::encode(&Coordinates::new(-16.5, 179.9)).unwrap();
        assert!(hashes.iter().any(|h| h.range().contains(inside)));
    }

    #[test]
    fn test_route() {
        let path = [
            Coordinates::new(37.7749, -122.4194),
            Coordinates::new(37.8044, -122.2712),
            Coordinates::new(37.8716, -122.2727),
        ];
        let hashes = hashes_from_route(&path, 12, None).unwrap();
        assert!(!hashes.is_empty());
        assert!(hashes.len() <= POLYLINE_COVERER.max_cells);
        assert!(hashes.iter().all(|h| (9..=15).contains(&h.cell_level())));

        for point in &path {
            let leaf = crate::cell::encode(point).unwrap();
            assert!(hashes.iter().any(|h| h.range().contains(leaf)));
        }
    }

    #[test]
    fn test_route_multi_piece_edge_respects_budget() {
        let path = [
            Coordinates::new(37.7749, -122.4194),
            Coordinates::new(38.5816, -121.4944),
        ];
        let hashes = hashes_from_route(&path, 10, None).unwrap();
        assert!(!hashes.is_empty());
        assert!(hashes.len() <= POLYLINE_COVERER.max_cells);

        let cells: Vec<u64> = hashes.iter().map(GeoHash::hash).collect();
        for (i, a) in cells.iter().enumerate() {
            for b in &cells[i + 1..] {
                assert!(!CellID(*a).contains(&CellID(*b)));
                assert!(!CellID(*b).contains(&CellID(*a)));
            }
        }
    }

    #[test]
    fn test_route_invalid_inputs() {
        assert!(matches!(
            hashes_from_route(&[sf()], 10, None),
            Err(GeoIndexError::InvalidPath { length: 1 })
        ));
        assert!(matches!(
            hashes_from_route(&[sf(), Coordinates::new(0.0, 200.0)], 10, None),
            Err(GeoIndexError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_densify_keeps_endpoints() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(0.0, 1.9);
        let points = densify(&a, &b);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], a);
        assert_eq!(points[4], b);
        assert!((points[2].longitude - 0.95).abs() < 1e-9);
        assert!(points[2].latitude.abs() < 1e-9);
    }

    #[test]
    fn test_normalize_drops_nested_and_duplicates() {
        let leaf = crate::cell::encode(&sf()).unwrap();
        let parent = trim(leaf, 10);
        let child = trim(leaf, 12);
        let other = trim(crate::cell::encode(&Coordinates::new(-33.0, 151.0)).unwrap(), 10);

        let mut cells = vec![child, other, parent, child];
        normalize(&mut cells);
        cells.sort();
        let mut expected = vec![parent, other];
        expected.sort();
        assert_eq!(cells, expected);
    }

    #[test]
    fn test_scan_ranges_merge_adjacent() {
        let leaf = crate::cell::encode(&sf()).unwrap();
        let cell = CellID(trim(leaf, 10));
        let next = cell.next();
        let far = CellID(trim(crate::cell::encode(&Coordinates::new(-33.0, 151.0)).unwrap(), 10));

        let hashes = [
            GeoHash::from_cell(next.0, 10),
            GeoHash::from_cell(far.0, 10),
            GeoHash::from_cell(cell.0, 10),
        ];
        let ranges = scan_ranges(&hashes);
        assert_eq!(ranges.len(), 2);
        assert!(ranges.windows(2).all(|w| w[0].max < w[1].min));
        assert!(ranges.iter().any(|r| r.min == cell.range_min().0 && r.max == next.range_max().0));
        assert!(scan_ranges(&[]).is_empty());
    }
}
