//! Region coverer policy.
//!
//! The coverer bounds how fine and how many cells a query covering may
//! use. It only applies at query time; writes always encode at leaf
//! precision and trim to the index level.
//!
//! See <http://s2geometry.io/resources/s2cell_statistics.html> for cell
//! sizes per level.

use crate::compute::validation::{MAX_LEVEL, validate_level};
use crate::error::{GeoIndexError, Result};
use s2::region::RegionCoverer;
use serde::{Deserialize, Serialize};

/// Default for radius and bounding box searches.
///
/// Intentionally coarse: area queries over-fetch so that sparse regions
/// still return enough candidates after post-filtering, and zooming in or
/// out keeps candidate counts bounded.
pub const AREA_COVERER: CovererConfig = CovererConfig {
    min_level: 9,
    max_level: 13,
    max_cells: 15,
    level_mod: 1,
};

/// Default for route searches.
///
/// A corridor is long and thin, so it needs more and smaller cells to stay
/// tight along the path.
pub const POLYLINE_COVERER: CovererConfig = CovererConfig {
    min_level: 9,
    max_level: 15,
    max_cells: 100,
    level_mod: 1,
};

/// Level/cardinality trade-off for a covering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CovererConfig {
    /// Coarsest level a covering cell may have
    pub min_level: u8,
    /// Finest level a covering cell may have
    pub max_level: u8,
    /// Cell budget; may be exceeded only when `min_level` forbids coarsening
    pub max_cells: usize,
    /// Only levels `min_level + k * level_mod` are used
    pub level_mod: u8,
}

impl CovererConfig {
    pub const fn area() -> Self {
        AREA_COVERER
    }

    pub const fn polyline() -> Self {
        POLYLINE_COVERER
    }

    pub fn with_levels(mut self, min_level: u8, max_level: u8) -> Self {
        self.min_level = min_level;
        self.max_level = max_level;
        self
    }

    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells;
        self
    }

    pub fn with_level_mod(mut self, level_mod: u8) -> Self {
        self.level_mod = level_mod;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_level(self.min_level as i32)?;
        validate_level(self.max_level as i32)?;
        if self.min_level > self.max_level {
            return Err(GeoIndexError::InvalidConfig(format!(
                "coverer min_level {} is finer than max_level {}",
                self.min_level, self.max_level
            )));
        }
        if self.max_cells == 0 {
            return Err(GeoIndexError::InvalidConfig(
                "coverer max_cells must be greater than zero".to_string(),
            ));
        }
        if !(1..=3).contains(&self.level_mod) {
            return Err(GeoIndexError::InvalidConfig(format!(
                "coverer level_mod must be between 1 and 3, got {}",
                self.level_mod
            )));
        }
        Ok(())
    }

    /// Coarsest level at or above `level` this policy allows, stepping by
    /// `level_mod` from `min_level`.
    pub(crate) fn snap_level(&self, level: u8) -> u8 {
        let level = level.clamp(self.min_level, self.max_level.min(MAX_LEVEL as u8));
        let step = self.level_mod.max(1);
        level - (level - self.min_level) % step
    }

    pub(crate) fn to_region_coverer(self) -> RegionCoverer {
        RegionCoverer {
            min_level: self.min_level,
            max_level: self.max_level,
            level_mod: self.level_mod,
            max_cells: self.max_cells,
        }
    }
}

impl Default for CovererConfig {
    fn default() -> Self {
        AREA_COVERER
    }
}

/// Picks the caller's override or the preset, validating overrides.
pub(crate) fn resolve(
    coverer: Option<&CovererConfig>,
    preset: CovererConfig,
) -> Result<CovererConfig> {
    match coverer {
        Some(config) => {
            config.validate()?;
            Ok(*config)
        }
        None => Ok(preset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(AREA_COVERER.min_level, 9);
        assert_eq!(AREA_COVERER.max_level, 13);
        assert_eq!(AREA_COVERER.max_cells, 15);
        assert_eq!(POLYLINE_COVERER.max_level, 15);
        assert_eq!(POLYLINE_COVERER.max_cells, 100);
        assert!(AREA_COVERER.validate().is_ok());
        assert!(POLYLINE_COVERER.validate().is_ok());
    }

    #[test]
    fn test_override_leaves_preset_untouched() {
        let custom = CovererConfig::area().with_max_cells(50).with_levels(5, 20);
        assert_eq!(custom.max_cells, 50);
        assert_eq!(AREA_COVERER.max_cells, 15);
        assert_eq!(CovererConfig::area(), AREA_COVERER);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve(None, POLYLINE_COVERER).unwrap(), POLYLINE_COVERER);

        let custom = CovererConfig::area().with_max_cells(4);
        assert_eq!(resolve(Some(&custom), AREA_COVERER).unwrap(), custom);

        let bad = CovererConfig::area().with_levels(14, 10);
        assert!(resolve(Some(&bad), AREA_COVERER).is_err());
    }

    #[test]
    fn test_validate_rejects() {
        assert!(matches!(
            CovererConfig::area().with_levels(9, 31).validate(),
            Err(GeoIndexError::InvalidLevel(31))
        ));
        assert!(matches!(
            CovererConfig::area().with_max_cells(0).validate(),
            Err(GeoIndexError::InvalidConfig(_))
        ));
        assert!(matches!(
            CovererConfig::area().with_level_mod(4).validate(),
            Err(GeoIndexError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_snap_level() {
        let config = CovererConfig::polyline().with_level_mod(2);
        assert_eq!(config.snap_level(15), 15);
        assert_eq!(config.snap_level(14), 13);
        assert_eq!(config.snap_level(3), 9);
        assert_eq!(config.snap_level(30), 15);
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&POLYLINE_COVERER).unwrap();
        let parsed: CovererConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, POLYLINE_COVERER);
    }
}
