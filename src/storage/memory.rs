//! In-memory repositories backed by ordered maps.
//!
//! Each index is a `BTreeMap` keyed by `(trimmed, leaf)`, the layout a
//! key-value store uses with the trimmed id as partition key and the leaf id
//! as sort key. Records are kept in their serialized attribute form and
//! decoded on read.

use super::{GeoRepository, MultiIndexGeoRepository};
use crate::attributes::{AttributeMap, GeoIndexConfig};
use crate::cell::{GeoHash, trim};
use crate::config::Config;
use crate::covering::{hashes_from_bbox, hashes_from_radius, hashes_from_route, scan_ranges};
use crate::error::{GeoIndexError, Result};
use crate::item::{GeoItem, MultiIndexGeoItem};
use crate::spatial::{DistanceMetric, distance_to_path, point_in_bbox, within_radius};
use crate::types::Coordinates;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

type Key = (u64, u64);
type Table = BTreeMap<Key, AttributeMap>;

/// A query region together with its exact membership test.
enum Region<'a> {
    Radius {
        center: &'a Coordinates,
        radius_meters: f64,
    },
    BBox {
        ne: &'a Coordinates,
        sw: &'a Coordinates,
    },
    Route {
        path: &'a [Coordinates],
        corridor_meters: f64,
    },
}

impl Region<'_> {
    fn cover(&self, level: i32, config: &Config) -> Result<Vec<GeoHash>> {
        match self {
            Region::Radius {
                center,
                radius_meters,
            } => hashes_from_radius(center, *radius_meters, level, Some(&config.area_coverer)),
            Region::BBox { ne, sw } => hashes_from_bbox(ne, sw, level, Some(&config.area_coverer)),
            Region::Route { path, .. } => {
                hashes_from_route(path, level, Some(&config.polyline_coverer))
            }
        }
    }

    fn contains(&self, point: &Coordinates) -> bool {
        match self {
            Region::Radius {
                center,
                radius_meters,
            } => within_radius(center, point, *radius_meters, DistanceMetric::Haversine),
            Region::BBox { ne, sw } => point_in_bbox(point, ne, sw),
            Region::Route {
                path,
                corridor_meters,
            } => distance_to_path(point, path) <= *corridor_meters,
        }
    }
}

/// Stored records whose leaf id falls under any of `hashes`.
///
/// Ranges are merged first, so every record is visited at most once.
fn scan<'a>(table: &'a Table, hashes: &[GeoHash], level: i32) -> Vec<&'a AttributeMap> {
    let mut hits = Vec::new();
    for range in scan_ranges(hashes) {
        let lo = (trim(range.min, level), range.min);
        let hi = (trim(range.max, level), range.max);
        if lo > hi {
            continue;
        }
        hits.extend(
            table
                .range(lo..=hi)
                .filter(|((_, leaf), _)| range.contains(*leaf))
                .map(|(_, item)| item),
        );
    }
    hits
}

fn unknown_index(name: &str) -> GeoIndexError {
    GeoIndexError::InvalidConfig(format!("unknown geo index: {}", name))
}

/// In-memory [`GeoRepository`] over one geo index.
///
/// # Examples
///
/// ```rust
/// use kvgeo::{Coordinates, GeoIndexConfig, GeoRepository, MemoryGeoRepository, S2GeoAttributes};
///
/// let index = GeoIndexConfig::new("geohash", "geohash_trimmed", "geo_idx", 12);
/// let repo = MemoryGeoRepository::<S2GeoAttributes>::with_index(index)?;
///
/// let city_hall = S2GeoAttributes::new(repo.index().clone(), Coordinates::new(37.7793, -122.4193))?;
/// repo.put_item(&city_hall)?;
///
/// let found = repo.get_items_in_radius(&Coordinates::new(37.7749, -122.4194), 1000.0)?;
/// assert_eq!(found.len(), 1);
/// # Ok::<(), kvgeo::GeoIndexError>(())
/// ```
pub struct MemoryGeoRepository<T> {
    config: Config,
    index: Arc<GeoIndexConfig>,
    table: RwLock<Table>,
    _items: PhantomData<fn() -> T>,
}

impl<T: GeoItem> MemoryGeoRepository<T> {
    /// Repository for the configured index named `index_name`.
    pub fn new(config: Config, index_name: &str) -> Result<Self> {
        config.validate()?;
        let index = config
            .index(index_name)
            .cloned()
            .ok_or_else(|| unknown_index(index_name))?;
        Ok(Self {
            config,
            index: Arc::new(index),
            table: RwLock::new(BTreeMap::new()),
            _items: PhantomData,
        })
    }

    /// Repository with default coverers and a single index.
    pub fn with_index(index: GeoIndexConfig) -> Result<Self> {
        let name = index.index_name().to_string();
        Self::new(Config::default().with_index(index), &name)
    }

    pub fn index(&self) -> &Arc<GeoIndexConfig> {
        &self.index
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    fn entry(&self, item: &T) -> Result<(Key, AttributeMap)> {
        if item.geo_index_name() != self.index.index_name() {
            return Err(unknown_index(item.geo_index_name()));
        }
        let key = (item.trimmed_geo_hash(), item.geo_hash());
        Ok((key, item.to_item()?))
    }

    fn query(&self, region: Region<'_>) -> Result<Vec<T>> {
        let level = self.index.level();
        let hashes = region.cover(level, &self.config)?;

        let table = self.table.read();
        let candidates = scan(&table, &hashes, level);
        let scanned = candidates.len();

        let mut items = Vec::new();
        for stored in candidates {
            let item = T::from_item(&self.index, stored)?;
            if region.contains(&item.coordinates()) {
                items.push(item);
            }
        }

        log::debug!(
            "Index {}: {} cells, {} candidates, {} matches",
            self.index.index_name(),
            hashes.len(),
            scanned,
            items.len()
        );
        Ok(items)
    }
}

impl<T: GeoItem> GeoRepository<T> for MemoryGeoRepository<T> {
    fn get_item_by_geo_hash(&self, geo_hash: u64, trimmed_geo_hash: u64) -> Result<Option<T>> {
        let table = self.table.read();
        table
            .get(&(trimmed_geo_hash, geo_hash))
            .map(|stored| T::from_item(&self.index, stored))
            .transpose()
    }

    fn put_item(&self, item: &T) -> Result<()> {
        let (key, stored) = self.entry(item)?;
        self.table.write().insert(key, stored);
        Ok(())
    }

    fn batch_put_item(&self, items: &[T]) -> Result<()> {
        let entries = items
            .iter()
            .map(|item| self.entry(item))
            .collect::<Result<Vec<_>>>()?;

        let mut table = self.table.write();
        table.extend(entries);
        log::debug!(
            "Index {}: batch wrote {} items",
            self.index.index_name(),
            items.len()
        );
        Ok(())
    }

    fn get_items_in_radius(&self, center: &Coordinates, radius_meters: f64) -> Result<Vec<T>> {
        self.query(Region::Radius {
            center,
            radius_meters,
        })
    }

    fn get_items_in_bbox(&self, ne: &Coordinates, sw: &Coordinates) -> Result<Vec<T>> {
        self.query(Region::BBox { ne, sw })
    }

    fn get_items_on_route(&self, path: &[Coordinates]) -> Result<Vec<T>> {
        self.query(Region::Route {
            path,
            corridor_meters: self.config.route_corridor_meters,
        })
    }
}

/// In-memory [`MultiIndexGeoRepository`] keeping one table per index.
pub struct MemoryMultiIndexGeoRepository<T> {
    config: Config,
    indices: Vec<Arc<GeoIndexConfig>>,
    tables: RwLock<FxHashMap<String, Table>>,
    _items: PhantomData<fn() -> T>,
}

impl<T: MultiIndexGeoItem> MemoryMultiIndexGeoRepository<T> {
    /// Repository over every index in `config`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        if config.indices.is_empty() {
            return Err(GeoIndexError::InvalidConfig(
                "at least one geo index is required".to_string(),
            ));
        }

        let indices: Vec<_> = config.indices.iter().cloned().map(Arc::new).collect();
        let tables: FxHashMap<String, Table> = indices
            .iter()
            .map(|idx| (idx.index_name().to_string(), Table::new()))
            .collect();
        Ok(Self {
            config,
            indices,
            tables: RwLock::new(tables),
            _items: PhantomData,
        })
    }

    pub fn indices(&self) -> &[Arc<GeoIndexConfig>] {
        &self.indices
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Records stored under `index`.
    pub fn len(&self, index: &str) -> usize {
        self.tables.read().get(index).map_or(0, BTreeMap::len)
    }

    fn index(&self, name: &str) -> Result<&Arc<GeoIndexConfig>> {
        self.indices
            .iter()
            .find(|idx| idx.index_name() == name)
            .ok_or_else(|| unknown_index(name))
    }

    fn entries(&self, item: &T) -> Result<(Vec<(String, Key)>, AttributeMap)> {
        let mut keys = Vec::new();
        for name in item.geo_indices() {
            self.index(name)?;
            if let (Some(hash), Some(trimmed)) = (item.geo_hash(name), item.trimmed_geo_hash(name)) {
                keys.push((name.to_string(), (trimmed, hash)));
            }
        }
        Ok((keys, item.to_item()?))
    }

    fn store(tables: &mut FxHashMap<String, Table>, keys: Vec<(String, Key)>, stored: AttributeMap) {
        for (name, key) in keys {
            if let Some(table) = tables.get_mut(&name) {
                table.insert(key, stored.clone());
            }
        }
    }

    fn query(&self, index: &str, region: Region<'_>) -> Result<Vec<T>> {
        let level = self.index(index)?.level();
        let hashes = region.cover(level, &self.config)?;

        let tables = self.tables.read();
        let Some(table) = tables.get(index) else {
            return Err(unknown_index(index));
        };

        let mut items = Vec::new();
        for stored in scan(table, &hashes, level) {
            let item = T::from_item(&self.indices, stored)?;
            if region.contains(&item.coordinates()) {
                items.push(item);
            }
        }

        log::debug!(
            "Index {}: {} cells, {} matches",
            index,
            hashes.len(),
            items.len()
        );
        Ok(items)
    }
}

impl<T: MultiIndexGeoItem> MultiIndexGeoRepository<T> for MemoryMultiIndexGeoRepository<T> {
    fn get_item_by_geo_hash(
        &self,
        index: &str,
        geo_hash: u64,
        trimmed_geo_hash: u64,
    ) -> Result<Option<T>> {
        self.index(index)?;
        let tables = self.tables.read();
        tables
            .get(index)
            .and_then(|table| table.get(&(trimmed_geo_hash, geo_hash)))
            .map(|stored| T::from_item(&self.indices, stored))
            .transpose()
    }

    fn put_item(&self, item: &T) -> Result<()> {
        let (keys, stored) = self.entries(item)?;
        Self::store(&mut self.tables.write(), keys, stored);
        Ok(())
    }

    fn batch_put_item(&self, items: &[T]) -> Result<()> {
        let entries = items
            .iter()
            .map(|item| self.entries(item))
            .collect::<Result<Vec<_>>>()?;

        let mut tables = self.tables.write();
        for (keys, stored) in entries {
            Self::store(&mut tables, keys, stored);
        }
        log::debug!("Batch wrote {} multi-index items", items.len());
        Ok(())
    }

    fn get_items_in_radius(
        &self,
        index: &str,
        center: &Coordinates,
        radius_meters: f64,
    ) -> Result<Vec<T>> {
        self.query(
            index,
            Region::Radius {
                center,
                radius_meters,
            },
        )
    }

    fn get_items_in_bbox(
        &self,
        index: &str,
        ne: &Coordinates,
        sw: &Coordinates,
    ) -> Result<Vec<T>> {
        self.query(index, Region::BBox { ne, sw })
    }

    fn get_items_on_route(&self, index: &str, path: &[Coordinates]) -> Result<Vec<T>> {
        self.query(
            index,
            Region::Route {
                path,
                corridor_meters: self.config.route_corridor_meters,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{S2GeoAttributes, S2MultiGeoAttributes};

    const CITY_HALL: Coordinates = Coordinates::new(37.7793, -122.4193);
    const FERRY_BUILDING: Coordinates = Coordinates::new(37.7955, -122.3937);
    const OAKLAND: Coordinates = Coordinates::new(37.8044, -122.2712);
    const DOWNTOWN: Coordinates = Coordinates::new(37.7749, -122.4194);

    fn street() -> GeoIndexConfig {
        GeoIndexConfig::new("geohash", "street_cell", "street", 16)
    }

    fn city() -> GeoIndexConfig {
        GeoIndexConfig::new("geohash", "city_cell", "city", 10)
    }

    fn seeded() -> MemoryGeoRepository<S2GeoAttributes> {
        let repo = MemoryGeoRepository::with_index(street()).unwrap();
        let items: Vec<_> = [CITY_HALL, FERRY_BUILDING, OAKLAND]
            .into_iter()
            .map(|c| S2GeoAttributes::new(repo.index().clone(), c).unwrap())
            .collect();
        repo.batch_put_item(&items).unwrap();
        repo
    }

    fn sorted(items: &[S2GeoAttributes]) -> Vec<u64> {
        let mut ids: Vec<u64> = items.iter().map(GeoItem::geo_hash).collect();
        ids.sort_unstable();
        ids
    }

    fn leaves(points: &[Coordinates]) -> Vec<u64> {
        let mut ids: Vec<u64> = points
            .iter()
            .map(|c| crate::cell::encode(c).unwrap())
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_unknown_index_rejected() {
        assert!(matches!(
            MemoryGeoRepository::<S2GeoAttributes>::new(Config::default(), "street"),
            Err(GeoIndexError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_put_and_get() {
        let repo = MemoryGeoRepository::with_index(street()).unwrap();
        let item = S2GeoAttributes::new(repo.index().clone(), CITY_HALL).unwrap();
        repo.put_item(&item).unwrap();

        let found = repo
            .get_item_by_geo_hash(item.geo_hash(), item.trimmed_geo_hash())
            .unwrap()
            .unwrap();
        assert_eq!(found.coordinates(), CITY_HALL);
        assert!(
            repo.get_item_by_geo_hash(item.geo_hash(), item.geo_hash())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_put_same_key_overwrites() {
        let repo = MemoryGeoRepository::with_index(street()).unwrap();
        let item = S2GeoAttributes::new(repo.index().clone(), CITY_HALL).unwrap();
        repo.put_item(&item).unwrap();
        repo.put_item(&item).unwrap();
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let repo = MemoryGeoRepository::with_index(street()).unwrap();
        let good = S2GeoAttributes::new(repo.index().clone(), CITY_HALL).unwrap();
        let foreign = S2GeoAttributes::new(Arc::new(city()), OAKLAND).unwrap();

        assert!(repo.batch_put_item(&[good, foreign]).is_err());
        assert!(repo.is_empty());
    }

    #[test]
    fn test_radius_query_post_filters() {
        let repo = seeded();
        let found = repo.get_items_in_radius(&DOWNTOWN, 2000.0).unwrap();
        assert_eq!(sorted(&found), leaves(&[CITY_HALL]));

        let wide = repo.get_items_in_radius(&DOWNTOWN, 20_000.0).unwrap();
        assert_eq!(sorted(&wide), leaves(&[CITY_HALL, FERRY_BUILDING, OAKLAND]));
    }

    #[test]
    fn test_radius_query_validates_input() {
        let repo = seeded();
        assert!(matches!(
            repo.get_items_in_radius(&DOWNTOWN, -1.0),
            Err(GeoIndexError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_bbox_query() {
        let repo = seeded();
        let ne = Coordinates::new(37.80, -122.38);
        let sw = Coordinates::new(37.77, -122.43);
        let found = repo.get_items_in_bbox(&ne, &sw).unwrap();
        assert_eq!(sorted(&found), leaves(&[CITY_HALL, FERRY_BUILDING]));
    }

    #[test]
    fn test_route_query() {
        let repo = seeded();
        let found = repo
            .get_items_on_route(&[CITY_HALL, FERRY_BUILDING])
            .unwrap();
        assert_eq!(sorted(&found), leaves(&[CITY_HALL, FERRY_BUILDING]));

        assert!(matches!(
            repo.get_items_on_route(&[CITY_HALL]),
            Err(GeoIndexError::InvalidPath { length: 1 })
        ));
    }

    #[test]
    fn test_multi_index_repository() {
        let config = Config::default().with_index(city()).with_index(street());
        let repo = MemoryMultiIndexGeoRepository::<S2MultiGeoAttributes>::new(config).unwrap();

        let items: Vec<_> = [CITY_HALL, OAKLAND]
            .into_iter()
            .map(|c| S2MultiGeoAttributes::new(repo.indices(), c).unwrap())
            .collect();
        repo.batch_put_item(&items).unwrap();
        assert_eq!(repo.len("city"), 2);
        assert_eq!(repo.len("street"), 2);

        for index in ["city", "street"] {
            let found = repo.get_items_in_radius(index, &DOWNTOWN, 2000.0).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].coordinates(), CITY_HALL);
        }

        let item = &items[0];
        let by_key = repo
            .get_item_by_geo_hash(
                "city",
                item.geo_hash("city").unwrap(),
                item.trimmed_geo_hash("city").unwrap(),
            )
            .unwrap();
        assert_eq!(by_key.as_ref(), Some(item));

        assert!(matches!(
            repo.get_items_in_radius("county", &DOWNTOWN, 2000.0),
            Err(GeoIndexError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_multi_requires_an_index() {
        assert!(
            MemoryMultiIndexGeoRepository::<S2MultiGeoAttributes>::new(Config::default()).is_err()
        );
    }
}
