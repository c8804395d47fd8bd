//! Cell encoder: coordinates to S2 cell identifiers.
//!
//! A coordinate is always encoded at leaf precision (level 30). Coarser
//! "trimmed" identifiers are derived from the leaf for index bucketing, and
//! the subtree bounds of any cell give the range-scan keys for "everything
//! under this cell".
//!
//! | Level | Approx. cell edge | Typical use |
//! |-------|-------------------|-------------|
//! | 9     | ~18 km            | Region |
//! | 13    | ~1.1 km           | City district |
//! | 15    | ~280 m            | Street |
//! | 30    | ~1 cm             | Leaf |

use crate::compute::validation::{MAX_LEVEL, validate_coordinates, validate_level};
use crate::error::Result;
use crate::types::Coordinates;
use s2::cellid::CellID;
use serde::{Deserialize, Serialize};

/// Encodes a coordinate into its leaf cell identifier.
///
/// # Examples
///
/// ```rust
/// use kvgeo::{Coordinates, cell};
///
/// let sf = Coordinates::new(37.7749, -122.4194);
/// let id = cell::encode(&sf)?;
/// assert_eq!(id, cell::encode(&sf)?);
/// assert!(cell::encode(&Coordinates::new(91.0, 0.0)).is_err());
/// # Ok::<(), kvgeo::GeoIndexError>(())
/// ```
pub fn encode(coordinates: &Coordinates) -> Result<u64> {
    validate_coordinates(coordinates)?;
    Ok(CellID::from(coordinates.to_latlng()).0)
}

/// Returns the ancestor of `id` at `level`.
///
/// Levels outside [0, 30] return `id` unchanged; trimming is advisory and
/// never fails. Ids that are not valid cells are returned unchanged as well.
/// When `level` is finer than the cell itself, the descendant at `level`
/// along the cell centre is returned.
pub fn trim(id: u64, level: i32) -> u64 {
    if !(0..=MAX_LEVEL).contains(&level) {
        return id;
    }
    let cell = CellID(id);
    if !cell.is_valid() {
        return id;
    }
    if level as u64 <= cell.level() {
        return cell.parent(level as u64).0;
    }
    let lsb = lsb_for_level(level);
    (id & lsb.wrapping_neg()) | lsb
}

/// Smallest identifier in the subtree of `id`.
pub fn range_min(id: u64) -> u64 {
    let cell = CellID(id);
    if !cell.is_valid() {
        return id;
    }
    cell.range_min().0
}

/// Largest identifier in the subtree of `id`.
pub fn range_max(id: u64) -> u64 {
    let cell = CellID(id);
    if !cell.is_valid() {
        return id;
    }
    cell.range_max().0
}

/// Closed range of the subtree of `id`.
pub fn cell_range(id: u64) -> CellRange {
    CellRange {
        min: range_min(id),
        max: range_max(id),
    }
}

/// Level of a valid cell identifier, `None` otherwise.
pub fn level_of(id: u64) -> Option<i32> {
    let cell = CellID(id);
    cell.is_valid().then(|| cell.level() as i32)
}

fn lsb_for_level(level: i32) -> u64 {
    1u64 << (2 * (MAX_LEVEL - level) as u32)
}

/// Closed interval `[min, max]` spanned by a cell's descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRange {
    pub min: u64,
    pub max: u64,
}

impl CellRange {
    pub fn contains(&self, id: u64) -> bool {
        (self.min..=self.max).contains(&id)
    }
}

/// A cell identifier tagged with the level it is stored at.
///
/// Produced by the encoder for a single coordinate (the leaf cell) and by
/// the covering generator for query regions (cover cells re-tagged with the
/// caller's storage level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeoHash {
    id: u64,
    level: i32,
}

impl GeoHash {
    /// Encodes `coordinates` for storage at `level`.
    ///
    /// Unlike [`trim`], the level is validated here because it selects the
    /// precision that ends up in the store.
    pub fn new(coordinates: &Coordinates, level: i32) -> Result<Self> {
        let id = encode(coordinates)?;
        validate_level(level)?;
        Ok(Self { id, level })
    }

    pub(crate) fn from_cell(id: u64, level: i32) -> Self {
        Self { id, level }
    }

    /// The full cell identifier.
    pub fn hash(&self) -> u64 {
        self.id
    }

    /// The identifier trimmed to the storage level.
    pub fn trimmed(&self) -> u64 {
        trim(self.id, self.level)
    }

    pub fn min(&self) -> u64 {
        range_min(self.id)
    }

    pub fn max(&self) -> u64 {
        range_max(self.id)
    }

    pub fn range(&self) -> CellRange {
        cell_range(self.id)
    }

    /// Storage level this hash is tagged with.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Level of the cell itself (30 for encoded coordinates).
    pub fn cell_level(&self) -> i32 {
        level_of(self.id).unwrap_or(MAX_LEVEL)
    }
}
