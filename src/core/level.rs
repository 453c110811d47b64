//! Leveled dictionary representation of a tree
//!
//! This is the Tree-JSON interchange format used for both schemas and
//! records:
//!
//! ```json
//! {
//!     "L0": [{ "name": "Title", "type": "str" }],
//!     "L1": [{ "name": "Category", "parent": "Title", "inquire": "list" }]
//! }
//! ```
//!
//! Each level holds the nodes found at that depth. Every node below the root
//! carries the slash path of its parent.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Prefix of every level key (`L0`, `L1`, ...)
pub const LEVEL_PREFIX: &str = "L";

/// Format the key for a level index
pub fn level_key(level: usize) -> String {
    format!("{}{}", LEVEL_PREFIX, level)
}

/// A single node descriptor inside a level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Slash path of the parent node (absent for the root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Every other key of the descriptor
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            name: Some(name.into()),
            parent,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(key.into(), Value::String(value.into()));
        self
    }
}

/// Nodes grouped by depth, keyed by level index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeveledData {
    levels: BTreeMap<usize, Vec<NodeRecord>>,
}

impl LeveledData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of levels present
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Descriptors at a given level, if the level exists
    pub fn level(&self, level: usize) -> Option<&[NodeRecord]> {
        self.levels.get(&level).map(Vec::as_slice)
    }

    /// Iterate levels in ascending depth order
    pub fn levels(&self) -> impl Iterator<Item = (usize, &[NodeRecord])> {
        self.levels.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Append a descriptor to a level, creating the level if needed
    pub fn push(&mut self, level: usize, record: NodeRecord) {
        self.levels.entry(level).or_default().push(record);
    }
}

impl Serialize for LeveledData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.levels.len()))?;
        for (level, records) in &self.levels {
            map.serialize_entry(&level_key(*level), records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LeveledData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LevelVisitor;

        impl<'de> Visitor<'de> for LevelVisitor {
            type Value = LeveledData;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a map of level keys ({}0, {}1, ...) to node lists", LEVEL_PREFIX, LEVEL_PREFIX)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<LeveledData, A::Error> {
                let mut data = LeveledData::new();
                while let Some((key, records)) = access.next_entry::<String, Vec<NodeRecord>>()? {
                    let level = key
                        .strip_prefix(LEVEL_PREFIX)
                        .and_then(|n| n.parse::<usize>().ok())
                        .ok_or_else(|| {
                            de::Error::custom(format!("invalid level key '{}'", key))
                        })?;
                    if data.levels.insert(level, records).is_some() {
                        return Err(de::Error::custom(format!("duplicate level key '{}'", key)));
                    }
                }
                Ok(data)
            }
        }

        deserializer.deserialize_map(LevelVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_serialize_in_numeric_order() {
        let mut data = LeveledData::new();
        for level in (0..12).rev() {
            data.push(level, NodeRecord::new(format!("n{level}"), None));
        }
        let json = serde_json::to_string(&data).unwrap();
        let l2 = json.find("\"L2\"").unwrap();
        let l10 = json.find("\"L10\"").unwrap();
        assert!(l2 < l10, "L2 must precede L10: {json}");
    }

    #[test]
    fn test_record_keys_name_parent_then_sorted_attributes() {
        let record = NodeRecord::new("Book", Some("Title/Category".into()))
            .with_attribute("value", "x")
            .with_attribute("inquire", "list");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Book","parent":"Title/Category","inquire":"list","value":"x"}"#
        );
    }

    #[test]
    fn test_parse_collects_extra_keys() {
        let data: LeveledData = serde_json::from_str(
            r#"{"L0": [{"name": "Title", "type": "str", "required": true}]}"#,
        )
        .unwrap();
        let root = &data.level(0).unwrap()[0];
        assert_eq!(root.name.as_deref(), Some("Title"));
        assert_eq!(root.attributes["type"], Value::String("str".into()));
        assert_eq!(root.attributes["required"], Value::Bool(true));
    }

    #[test]
    fn test_bad_level_key_rejected() {
        let result: Result<LeveledData, _> = serde_json::from_str(r#"{"X0": []}"#);
        assert!(result.is_err());
    }
}
