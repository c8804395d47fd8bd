use serde::{Deserialize, Serialize};

/// Describes one spatial index a record participates in.
///
/// The hash attribute stores the leaf cell id, the sort attribute stores the
/// id trimmed to `level`. An empty attribute name disables that attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoIndexConfig {
    hash_key_attribute_name: String,
    sort_key_attribute_name: String,
    index_name: String,
    level: i32,
}

impl GeoIndexConfig {
    pub fn new(
        hash_key_attribute_name: impl Into<String>,
        sort_key_attribute_name: impl Into<String>,
        index_name: impl Into<String>,
        level: i32,
    ) -> Self {
        Self {
            hash_key_attribute_name: hash_key_attribute_name.into(),
            sort_key_attribute_name: sort_key_attribute_name.into(),
            index_name: index_name.into(),
            level,
        }
    }

    pub fn hash_key_attribute_name(&self) -> &str {
        &self.hash_key_attribute_name
    }

    pub fn sort_key_attribute_name(&self) -> &str {
        &self.sort_key_attribute_name
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}
