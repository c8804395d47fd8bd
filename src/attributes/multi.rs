use super::MAX_GEO_INDICES;
use super::codec::{AttributeCodec, AttributeMap, AttributeValue};
use super::index::GeoIndexConfig;
use super::single::GeoAttributes;
use crate::error::{GeoIndexError, Result};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// One coordinate's hashes bound to several geo indices, keyed by index
/// name.
///
/// Serialized as a single flat map holding every index's attributes.
/// Decoding cannot tell from the data which indices exist, so the receiver
/// must already know its configurations (see [`MultiGeoAttributes::with_configs`]).
#[derive(Debug, Clone, PartialEq)]
pub struct MultiGeoAttributes<T> {
    attributes: FxHashMap<String, GeoAttributes<T>>,
}

impl<T> MultiGeoAttributes<T> {
    /// Collects per-index attributes, rejecting more than
    /// [`MAX_GEO_INDICES`] entries and duplicate index names.
    pub fn new(attributes: Vec<GeoAttributes<T>>) -> Result<Self> {
        check_count(attributes.len())?;
        let mut map = FxHashMap::default();
        for attrs in attributes {
            let name = attrs.geo_index_name().to_string();
            if map.contains_key(&name) {
                return Err(duplicate(&name));
            }
            map.insert(name, attrs);
        }
        Ok(Self { attributes: map })
    }

    /// Empty receiver for the given configurations.
    pub fn with_configs(configs: &[Arc<GeoIndexConfig>]) -> Result<Self>
    where
        T: Default,
    {
        Self::new(
            configs
                .iter()
                .map(|cfg| GeoAttributes::with_config(Arc::clone(cfg)))
                .collect(),
        )
    }

    pub fn get(&self, index: &str) -> Option<&GeoAttributes<T>> {
        self.attributes.get(index)
    }

    pub fn geo_hash(&self, index: &str) -> Option<&T> {
        self.get(index).map(GeoAttributes::geo_hash)
    }

    pub fn trimmed_geo_hash(&self, index: &str) -> Option<&T> {
        self.get(index).map(GeoAttributes::trimmed_geo_hash)
    }

    /// Index names, sorted.
    pub fn geo_indices(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn geo_index_level(&self, index: &str) -> Option<i32> {
        self.get(index).map(GeoAttributes::geo_index_level)
    }

    pub fn configs(&self) -> impl Iterator<Item = &Arc<GeoIndexConfig>> {
        self.attributes.values().map(GeoAttributes::config)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<T: AttributeCodec> MultiGeoAttributes<T> {
    /// Merges every index's attributes into one flat map.
    pub fn to_attribute_map(&self) -> Result<AttributeMap> {
        let mut all = AttributeMap::with_capacity(self.attributes.len() * 2);
        for (name, attrs) in &self.attributes {
            let map = attrs
                .to_attribute_map()
                .map_err(|e| GeoIndexError::in_index(name, e))?;
            all.extend(map);
        }
        Ok(all)
    }

    pub fn to_attribute_value(&self) -> Result<AttributeValue> {
        self.to_attribute_map().map(AttributeValue::M)
    }

    /// Redistributes a flat map into the known indices.
    pub fn unmarshal_attribute_value(&mut self, av: &AttributeValue) -> Result<()> {
        self.unmarshal_attribute_map(av.as_map()?)
    }

    pub fn unmarshal_attribute_map(&mut self, attrs: &AttributeMap) -> Result<()> {
        for (name, geo_attrs) in self.attributes.iter_mut() {
            let config = Arc::clone(geo_attrs.config());
            let mut scoped = AttributeMap::with_capacity(2);
            for key in [
                config.hash_key_attribute_name(),
                config.sort_key_attribute_name(),
            ] {
                if let Some(av) = attrs.get(key)
                    && !key.is_empty()
                {
                    scoped.insert(key.to_string(), av.clone());
                }
            }
            geo_attrs
                .unmarshal_attribute_map(&scoped)
                .map_err(|e| GeoIndexError::in_index(name, e))?;
        }
        Ok(())
    }

    /// Decodes a fresh value for `configs` from `av`.
    pub fn from_attribute_value(configs: &[Arc<GeoIndexConfig>], av: &AttributeValue) -> Result<Self>
    where
        T: Default,
    {
        let mut multi = Self::with_configs(configs)?;
        multi.unmarshal_attribute_value(av)?;
        Ok(multi)
    }
}

pub(crate) fn check_count(got: usize) -> Result<()> {
    if got > MAX_GEO_INDICES {
        return Err(GeoIndexError::TooManyIndices {
            max: MAX_GEO_INDICES,
            got,
        });
    }
    Ok(())
}

pub(crate) fn duplicate(name: &str) -> GeoIndexError {
    GeoIndexError::InvalidConfig(format!("duplicate geo index name: {}", name))
}
