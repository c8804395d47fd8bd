//! Hierarchical S2 geospatial indexing for key-value stores.
//!
//! Coordinates are encoded to leaf S2 cell ids and trimmed to a coarser
//! index level for bucketing. Radius, bounding box and route queries become
//! sets of cover cells whose id ranges a store can scan.
//!
//! ```rust
//! use kvgeo::{Coordinates, GeoIndexConfig, S2GeoAttributes, covering};
//! use std::sync::Arc;
//!
//! let config = Arc::new(GeoIndexConfig::new("geohash", "geohash_trimmed", "geo_idx", 12));
//! let sf = Coordinates::new(37.7749, -122.4194);
//! let item = S2GeoAttributes::new(config, sf)?.to_attribute_map()?;
//! assert!(item.contains_key("geohash_trimmed"));
//!
//! let cells = covering::hashes_from_radius(&sf, 1000.0, 12, None)?;
//! let scans = covering::scan_ranges(&cells);
//! assert!(!scans.is_empty());
//! # Ok::<(), kvgeo::GeoIndexError>(())
//! ```

pub mod attributes;
pub mod cell;
pub mod compute;
pub mod config;
pub mod coverer;
pub mod covering;
pub mod error;
pub mod item;
pub mod spatial;
pub mod storage;
pub mod types;

pub use error::{GeoIndexError, Result};

pub use types::Coordinates;

pub use cell::{CellRange, GeoHash};

pub use coverer::{AREA_COVERER, CovererConfig, POLYLINE_COVERER};

pub use config::Config;

pub use attributes::{
    AttributeCodec, AttributeMap, AttributeValue, GeoAttributes, GeoIndexConfig,
    MAX_GEO_INDICES, MultiGeoAttributes, S2GeoAttributes, S2MultiGeoAttributes,
};

pub use item::{GeoItem, MultiIndexGeoItem};

pub use spatial::DistanceMetric;

pub use storage::{
    GeoRepository, MemoryGeoRepository, MemoryMultiIndexGeoRepository, MultiIndexGeoRepository,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Coordinates, DistanceMetric, GeoIndexError, Result};

    pub use crate::{AREA_COVERER, Config, CovererConfig, GeoHash, POLYLINE_COVERER};

    pub use crate::covering::{hashes_from_bbox, hashes_from_radius, hashes_from_route, scan_ranges};

    pub use crate::{AttributeMap, AttributeValue, GeoIndexConfig, S2GeoAttributes, S2MultiGeoAttributes};

    pub use crate::{GeoItem, MultiIndexGeoItem};

    pub use crate::{GeoRepository, MemoryGeoRepository, MemoryMultiIndexGeoRepository, MultiIndexGeoRepository};
}
