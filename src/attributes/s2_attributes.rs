//! S2 write bindings: a coordinate encoded for one or several geo indices.

use super::codec::{AttributeMap, AttributeValue, marshal_fallback, unmarshal_fallback};
use super::index::GeoIndexConfig;
use super::multi::{MultiGeoAttributes, check_count};
use super::single::GeoAttributes;
use crate::cell::GeoHash;
use crate::error::{GeoIndexError, Result};
use crate::item::{GeoItem, MultiIndexGeoItem};
use crate::types::Coordinates;
use std::sync::Arc;

pub const LATITUDE_ATTRIBUTE: &str = "latitude";
pub const LONGITUDE_ATTRIBUTE: &str = "longitude";

/// A coordinate encoded for one geo index.
///
/// # Examples
///
/// ```rust
/// use kvgeo::{Coordinates, GeoIndexConfig, S2GeoAttributes};
/// use std::sync::Arc;
///
/// let config = Arc::new(GeoIndexConfig::new("geohash", "geohash_trimmed", "geo_idx", 12));
/// let attrs = S2GeoAttributes::new(config, Coordinates::new(37.7749, -122.4194))?;
/// let item = attrs.to_attribute_map()?;
/// assert!(item.contains_key("geohash"));
/// assert!(item.contains_key("geohash_trimmed"));
/// # Ok::<(), kvgeo::GeoIndexError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct S2GeoAttributes {
    coordinates: Coordinates,
    attributes: GeoAttributes<u64>,
}

impl S2GeoAttributes {
    /// Encodes `coordinates` at leaf precision and trims to the index level.
    pub fn new(config: Arc<GeoIndexConfig>, coordinates: Coordinates) -> Result<Self> {
        let hash = GeoHash::new(&coordinates, config.level()).inspect_err(|e| {
            log::debug!(
                "Failed to construct S2 geohash for index {} at {}: {}",
                config.index_name(),
                coordinates,
                e
            );
        })?;
        Ok(Self {
            coordinates,
            attributes: GeoAttributes::new(hash.hash(), hash.trimmed(), config),
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn attributes(&self) -> &GeoAttributes<u64> {
        &self.attributes
    }

    /// Coordinates plus the index's hash attributes.
    pub fn to_attribute_map(&self) -> Result<AttributeMap> {
        let mut map = self.attributes.to_attribute_map()?;
        insert_coordinates(&mut map, &self.coordinates)?;
        Ok(map)
    }

    pub fn to_attribute_value(&self) -> Result<AttributeValue> {
        self.to_attribute_map().map(AttributeValue::M)
    }

    pub fn from_attribute_map(config: Arc<GeoIndexConfig>, map: &AttributeMap) -> Result<Self> {
        let coordinates = read_coordinates(map)?;
        let mut attributes = GeoAttributes::with_config(config);
        attributes.unmarshal_attribute_map(map)?;
        Ok(Self {
            coordinates,
            attributes,
        })
    }
}

impl GeoItem for S2GeoAttributes {
    fn geo_hash(&self) -> u64 {
        *self.attributes.geo_hash()
    }

    fn trimmed_geo_hash(&self) -> u64 {
        *self.attributes.trimmed_geo_hash()
    }

    fn geo_index_name(&self) -> &str {
        self.attributes.geo_index_name()
    }

    fn geo_index_level(&self) -> i32 {
        self.attributes.geo_index_level()
    }

    fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    fn to_item(&self) -> Result<AttributeMap> {
        self.to_attribute_map()
    }

    fn from_item(config: &Arc<GeoIndexConfig>, item: &AttributeMap) -> Result<Self> {
        Self::from_attribute_map(Arc::clone(config), item)
    }
}

/// A coordinate encoded for up to ten geo indices at once, e.g. a coarse
/// city-level index next to a fine street-level one.
#[derive(Debug, Clone, PartialEq)]
pub struct S2MultiGeoAttributes {
    coordinates: Coordinates,
    attributes: MultiGeoAttributes<u64>,
}

impl S2MultiGeoAttributes {
    /// Encodes `coordinates` for every config. The first failing config
    /// aborts the whole construction.
    pub fn new(configs: &[Arc<GeoIndexConfig>], coordinates: Coordinates) -> Result<Self> {
        check_count(configs.len())?;

        let mut per_index = Vec::with_capacity(configs.len());
        for config in configs {
            let hash = GeoHash::new(&coordinates, config.level()).inspect_err(|e| {
                log::debug!(
                    "Failed to construct S2 geohash for index {} at {}: {}",
                    config.index_name(),
                    coordinates,
                    e
                );
            })?;
            per_index.push(GeoAttributes::new(
                hash.hash(),
                hash.trimmed(),
                Arc::clone(config),
            ));
        }

        Ok(Self {
            coordinates,
            attributes: MultiGeoAttributes::new(per_index)?,
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn attributes(&self) -> &MultiGeoAttributes<u64> {
        &self.attributes
    }

    pub fn to_attribute_map(&self) -> Result<AttributeMap> {
        let mut map = self.attributes.to_attribute_map()?;
        insert_coordinates(&mut map, &self.coordinates)?;
        Ok(map)
    }

    pub fn to_attribute_value(&self) -> Result<AttributeValue> {
        self.to_attribute_map().map(AttributeValue::M)
    }

    pub fn from_attribute_map(configs: &[Arc<GeoIndexConfig>], map: &AttributeMap) -> Result<Self> {
        let coordinates = read_coordinates(map)?;
        let mut attributes = MultiGeoAttributes::with_configs(configs)?;
        attributes.unmarshal_attribute_map(map)?;
        Ok(Self {
            coordinates,
            attributes,
        })
    }
}

impl MultiIndexGeoItem for S2MultiGeoAttributes {
    fn geo_hash(&self, index: &str) -> Option<u64> {
        self.attributes.geo_hash(index).copied()
    }

    fn trimmed_geo_hash(&self, index: &str) -> Option<u64> {
        self.attributes.trimmed_geo_hash(index).copied()
    }

    fn geo_indices(&self) -> Vec<&str> {
        self.attributes.geo_indices()
    }

    fn geo_index_level(&self, index: &str) -> Option<i32> {
        self.attributes.geo_index_level(index)
    }

    fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    fn to_item(&self) -> Result<AttributeMap> {
        self.to_attribute_map()
    }

    fn from_item(configs: &[Arc<GeoIndexConfig>], item: &AttributeMap) -> Result<Self> {
        Self::from_attribute_map(configs, item)
    }
}

fn insert_coordinates(map: &mut AttributeMap, c: &Coordinates) -> Result<()> {
    map.insert(LATITUDE_ATTRIBUTE.to_string(), marshal_fallback(&c.latitude)?);
    map.insert(LONGITUDE_ATTRIBUTE.to_string(), marshal_fallback(&c.longitude)?);
    Ok(())
}

fn read_coordinates(map: &AttributeMap) -> Result<Coordinates> {
    let component = |name: &'static str| -> Result<f64> {
        let av = map
            .get(name)
            .ok_or(GeoIndexError::MalformedAttributeValue {
                expected: name,
                actual: "nothing",
            })?;
        unmarshal_fallback(av)
    };
    Ok(Coordinates::new(
        component(LATITUDE_ATTRIBUTE)?,
        component(LONGITUDE_ATTRIBUTE)?,
    ))
}
