//! Bindings between encoded cell ids and the attributes stored on a record.
//!
//! [`GeoIndexConfig`] names the attributes of one index. [`GeoAttributes`]
//! and [`MultiGeoAttributes`] move hash values in and out of attribute maps,
//! and [`S2GeoAttributes`] / [`S2MultiGeoAttributes`] compute those values
//! from a coordinate.

pub mod codec;
pub mod index;
pub mod multi;
pub mod s2_attributes;
pub mod single;

pub use codec::{
    AttributeCodec, AttributeMap, AttributeValue, Primitive, PrimitiveKind, Structured,
    marshal_fallback, marshal_primitive, unmarshal_fallback, unmarshal_primitive,
};
pub use index::GeoIndexConfig;
pub use multi::MultiGeoAttributes;
pub use s2_attributes::{LATITUDE_ATTRIBUTE, LONGITUDE_ATTRIBUTE, S2GeoAttributes, S2MultiGeoAttributes};
pub use single::GeoAttributes;

/// Upper bound on the indices one multi-index record may carry.
pub const MAX_GEO_INDICES: usize = 10;
