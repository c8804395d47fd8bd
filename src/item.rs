//! Item contracts consumed by geo repositories.
//!
//! A record type implements [`GeoItem`] (one index) or [`MultiIndexGeoItem`]
//! (several indices over the same coordinate), usually by delegating to an
//! embedded [`S2GeoAttributes`](crate::S2GeoAttributes) or
//! [`S2MultiGeoAttributes`](crate::S2MultiGeoAttributes) and adding its own
//! attributes to the item map.

use crate::attributes::{AttributeMap, GeoIndexConfig};
use crate::error::Result;
use crate::types::Coordinates;
use std::sync::Arc;

/// A record indexed by a single geo index.
pub trait GeoItem: Sized {
    /// Leaf cell id
    fn geo_hash(&self) -> u64;

    /// Cell id trimmed to the index level
    fn trimmed_geo_hash(&self) -> u64;

    fn geo_index_name(&self) -> &str;

    fn geo_index_level(&self) -> i32;

    /// Position used to post-filter query candidates
    fn coordinates(&self) -> Coordinates;

    /// Flat attribute map written to the store
    fn to_item(&self) -> Result<AttributeMap>;

    /// Rebuilds the record from a stored item.
    fn from_item(config: &Arc<GeoIndexConfig>, item: &AttributeMap) -> Result<Self>;
}

/// A record indexed by several geo indices over one coordinate.
pub trait MultiIndexGeoItem: Sized {
    fn geo_hash(&self, index: &str) -> Option<u64>;

    fn trimmed_geo_hash(&self, index: &str) -> Option<u64>;

    fn geo_indices(&self) -> Vec<&str>;

    fn geo_index_level(&self, index: &str) -> Option<i32>;

    fn coordinates(&self) -> Coordinates;

    fn to_item(&self) -> Result<AttributeMap>;

    /// Rebuilds the record; `configs` must list the indices to decode.
    fn from_item(configs: &[Arc<GeoIndexConfig>], item: &AttributeMap) -> Result<Self>;
}
