//! Repository contracts for geo-indexed records.
//!
//! A repository writes records under their `(trimmed, leaf)` key and
//! answers area queries by scanning the cell ranges of a covering, then
//! post-filtering the candidates. [`MemoryGeoRepository`] and
//! [`MemoryMultiIndexGeoRepository`] are in-process implementations.

use crate::error::Result;
use crate::item::{GeoItem, MultiIndexGeoItem};
use crate::types::Coordinates;

pub mod memory;

pub use memory::{MemoryGeoRepository, MemoryMultiIndexGeoRepository};

/// Storage for records carrying one geo index.
pub trait GeoRepository<T: GeoItem> {
    /// Point lookup by full key.
    fn get_item_by_geo_hash(&self, geo_hash: u64, trimmed_geo_hash: u64) -> Result<Option<T>>;

    /// Writes `item`, replacing any record with the same key.
    fn put_item(&self, item: &T) -> Result<()>;

    /// Writes all items or none of them.
    fn batch_put_item(&self, items: &[T]) -> Result<()>;

    fn get_items_in_radius(&self, center: &Coordinates, radius_meters: f64) -> Result<Vec<T>>;

    fn get_items_in_bbox(&self, ne: &Coordinates, sw: &Coordinates) -> Result<Vec<T>>;

    /// Records within the configured corridor of `path`.
    fn get_items_on_route(&self, path: &[Coordinates]) -> Result<Vec<T>>;
}

/// Storage for records carrying several geo indices. Queries pick the
/// index to scan by name.
pub trait MultiIndexGeoRepository<T: MultiIndexGeoItem> {
    fn get_item_by_geo_hash(
        &self,
        index: &str,
        geo_hash: u64,
        trimmed_geo_hash: u64,
    ) -> Result<Option<T>>;

    fn put_item(&self, item: &T) -> Result<()>;

    fn batch_put_item(&self, items: &[T]) -> Result<()>;

    fn get_items_in_radius(
        &self,
        index: &str,
        center: &Coordinates,
        radius_meters: f64,
    ) -> Result<Vec<T>>;

    fn get_items_in_bbox(&self, index: &str, ne: &Coordinates, sw: &Coordinates)
    -> Result<Vec<T>>;

    fn get_items_on_route(&self, index: &str, path: &[Coordinates]) -> Result<Vec<T>>;
}
