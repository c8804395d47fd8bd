//! Engine configuration: coverer policies, route corridor width and the
//! geo indices a repository maintains.
use crate::attributes::{GeoIndexConfig, MAX_GEO_INDICES};
use crate::compute::validation::validate_level;
use crate::coverer::{AREA_COVERER, CovererConfig, POLYLINE_COVERER};
use crate::error::{GeoIndexError, Result};
use serde::de::Error;
use std::collections::HashSet;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Route results keep only items this close to the path
    #[serde(default = "Config::default_route_corridor_meters")]
    pub route_corridor_meters: f64,

    /// Coverer for radius and bounding box queries
    #[serde(default = "Config::default_area_coverer")]
    pub area_coverer: CovererConfig,

    /// Coverer for route queries
    #[serde(default = "Config::default_polyline_coverer")]
    pub polyline_coverer: CovererConfig,

    #[serde(default)]
    pub indices: Vec<GeoIndexConfig>,
}

impl Config {
    const fn default_route_corridor_meters() -> f64 {
        250.0
    }

    const fn default_area_coverer() -> CovererConfig {
        AREA_COVERER
    }

    const fn default_polyline_coverer() -> CovererConfig {
        POLYLINE_COVERER
    }

    pub fn with_area_coverer(mut self, coverer: CovererConfig) -> Self {
        self.area_coverer = coverer;
        self
    }

    pub fn with_polyline_coverer(mut self, coverer: CovererConfig) -> Self {
        self.polyline_coverer = coverer;
        self
    }

    pub fn with_route_corridor_meters(mut self, meters: f64) -> Self {
        self.route_corridor_meters = meters;
        self
    }

    pub fn with_index(mut self, index: GeoIndexConfig) -> Self {
        self.indices.push(index);
        self
    }

    /// Looks up a configured index by name.
    pub fn index(&self, name: &str) -> Option<&GeoIndexConfig> {
        self.indices.iter().find(|idx| idx.index_name() == name)
    }

    pub fn validate(&self) -> Result<()> {
        self.area_coverer.validate()?;
        self.polyline_coverer.validate()?;

        if !self.route_corridor_meters.is_finite() || self.route_corridor_meters < 0.0 {
            return Err(GeoIndexError::InvalidConfig(format!(
                "route corridor must be a non-negative distance, got {}",
                self.route_corridor_meters
            )));
        }

        if self.indices.len() > MAX_GEO_INDICES {
            return Err(GeoIndexError::TooManyIndices {
                max: MAX_GEO_INDICES,
                got: self.indices.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.indices.len());
        for index in &self.indices {
            if index.index_name().is_empty() {
                return Err(GeoIndexError::InvalidConfig(
                    "geo index name must not be empty".to_string(),
                ));
            }
            if !seen.insert(index.index_name()) {
                return Err(GeoIndexError::InvalidConfig(format!(
                    "duplicate geo index name: {}",
                    index.index_name()
                )));
            }
            validate_level(index.level())
                .map_err(|e| GeoIndexError::in_index(index.index_name(), e))?;
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            route_corridor_meters: Self::default_route_corridor_meters(),
            area_coverer: Self::default_area_coverer(),
            polyline_coverer: Self::default_polyline_coverer(),
            indices: Vec::new(),
        }
    }
}
