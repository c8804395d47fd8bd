use super::codec::{AttributeCodec, AttributeMap, AttributeValue};
use super::index::GeoIndexConfig;
use crate::error::Result;
use std::sync::Arc;

/// One coordinate's hashes bound to one geo index.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoAttributes<T> {
    geo_hash: T,
    trimmed_geo_hash: T,
    config: Arc<GeoIndexConfig>,
}

impl<T> GeoAttributes<T> {
    pub fn new(geo_hash: T, trimmed_geo_hash: T, config: Arc<GeoIndexConfig>) -> Self {
        Self {
            geo_hash,
            trimmed_geo_hash,
            config,
        }
    }

    /// Empty receiver for [`GeoAttributes::unmarshal_attribute_value`].
    pub fn with_config(config: Arc<GeoIndexConfig>) -> Self
    where
        T: Default,
    {
        Self::new(T::default(), T::default(), config)
    }

    pub fn geo_hash(&self) -> &T {
        &self.geo_hash
    }

    pub fn trimmed_geo_hash(&self) -> &T {
        &self.trimmed_geo_hash
    }

    pub fn geo_index_name(&self) -> &str {
        self.config.index_name()
    }

    pub fn geo_index_level(&self) -> i32 {
        self.config.level()
    }

    pub fn config(&self) -> &Arc<GeoIndexConfig> {
        &self.config
    }
}

impl<T: AttributeCodec> GeoAttributes<T> {
    /// Encodes both hashes under the configured attribute names. Names left
    /// empty in the config are skipped.
    pub fn to_attribute_map(&self) -> Result<AttributeMap> {
        let mut attrs = AttributeMap::with_capacity(2);
        let hash_name = self.config.hash_key_attribute_name();
        if !hash_name.is_empty() {
            attrs.insert(hash_name.to_string(), self.geo_hash.to_attribute()?);
        }
        let sort_name = self.config.sort_key_attribute_name();
        if !sort_name.is_empty() {
            attrs.insert(sort_name.to_string(), self.trimmed_geo_hash.to_attribute()?);
        }
        Ok(attrs)
    }

    pub fn to_attribute_value(&self) -> Result<AttributeValue> {
        self.to_attribute_map().map(AttributeValue::M)
    }

    /// Decodes the configured attributes out of an `M` value.
    ///
    /// Attributes missing from the map leave the corresponding field as it
    /// was, which lets partial projections through. A present attribute that
    /// does not decode is an error rather than being skipped, so stored data
    /// with a wrong shape surfaces as `UnsupportedType` or
    /// `MalformedAttributeValue`.
    pub fn unmarshal_attribute_value(&mut self, av: &AttributeValue) -> Result<()> {
        self.unmarshal_attribute_map(av.as_map()?)
    }

    pub fn unmarshal_attribute_map(&mut self, attrs: &AttributeMap) -> Result<()> {
        if let Some(av) = lookup(attrs, self.config.hash_key_attribute_name()) {
            self.geo_hash = T::from_attribute(av)?;
        }
        if let Some(av) = lookup(attrs, self.config.sort_key_attribute_name()) {
            self.trimmed_geo_hash = T::from_attribute(av)?;
        }
        Ok(())
    }

    /// Decodes a fresh value for `config` from `av`.
    pub fn from_attribute_value(config: Arc<GeoIndexConfig>, av: &AttributeValue) -> Result<Self>
    where
        T: Default,
    {
        let mut attrs = Self::with_config(config);
        attrs.unmarshal_attribute_value(av)?;
        Ok(attrs)
    }
}

fn lookup<'a>(attrs: &'a AttributeMap, name: &str) -> Option<&'a AttributeValue> {
    if name.is_empty() {
        return None;
    }
    attrs.get(name)
}
