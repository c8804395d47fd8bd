//! Error types for kvgeo

use thiserror::Error;

/// Errors raised by encoding, covering and attribute binding.
#[derive(Debug, Error)]
pub enum GeoIndexError {
    /// Latitude or longitude outside [-90, 90] / [-180, 180], or not finite
    #[error("invalid coordinates: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Precision level outside [0, 30] where a level selects stored precision
    #[error("invalid level: {0}, level must be between 0 and 30")]
    InvalidLevel(i32),

    /// Route with fewer than two points
    #[error("invalid path: length={length}, at least 2 points are required")]
    InvalidPath { length: usize },

    /// Negative or non-finite search radius
    #[error("invalid radius: {0} meters")]
    InvalidRadius(f64),

    /// More geo indices than a single record may carry
    #[error("maximum number of geo indices exceeded, maximum is {max}, but got {got}")]
    TooManyIndices { max: usize, got: usize },

    /// Attribute value of the wrong structural shape
    #[error("malformed attribute value: expected {expected}, got {actual}")]
    MalformedAttributeValue {
        expected: &'static str,
        actual: &'static str,
    },

    /// Value neither the primitive fast path nor the fallback codec can handle
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure scoped to one geo index of a multi-index record
    #[error("geo index {index}: {source}")]
    Index {
        index: String,
        #[source]
        source: Box<GeoIndexError>,
    },
}

impl GeoIndexError {
    pub(crate) fn in_index(index: &str, source: GeoIndexError) -> Self {
        GeoIndexError::Index {
            index: index.to_string(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through index context.
    pub fn root(&self) -> &GeoIndexError {
        match self {
            GeoIndexError::Index { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for kvgeo operations
pub type Result<T> = std::result::Result<T, GeoIndexError>;
