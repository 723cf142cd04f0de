//! Source category id to YOLO class index mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DetkitError;
use crate::ir::CategoryId;

/// Number of classes in the default identity mapping (`0..=4`).
pub const DEFAULT_CLASS_COUNT: usize = 5;

/// Maps source category ids to YOLO class indices.
///
/// Categories that are not in the map are dropped by the converter.
///
/// Parses from the CLI form `"src:dst,src:dst"`:
///
/// ```
/// use detkit::convert::CategoryMap;
/// use detkit::ir::CategoryId;
///
/// let map: CategoryMap = "1:0,3:1".parse().unwrap();
/// assert_eq!(map.class_index(CategoryId(3)), Some(1));
/// assert_eq!(map.class_index(CategoryId(2)), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<u64, usize>", into = "BTreeMap<u64, usize>")]
pub struct CategoryMap {
    entries: BTreeMap<CategoryId, usize>,
}

impl CategoryMap {
    /// An empty map; every category is dropped.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Maps category `i` to class `i` for `i` in `0..count`.
    pub fn identity(count: usize) -> Self {
        (0..count)
            .map(|i| (CategoryId::new(i as u64), i))
            .collect()
    }

    pub fn insert(&mut self, category: CategoryId, class_index: usize) -> Option<usize> {
        self.entries.insert(category, class_index)
    }

    pub fn class_index(&self, category: CategoryId) -> Option<usize> {
        self.entries.get(&category).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest class index produced by the map.
    pub fn max_class_index(&self) -> Option<usize> {
        self.entries.values().copied().max()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, usize)> + '_ {
        self.entries.iter().map(|(cat, class)| (*cat, *class))
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::identity(DEFAULT_CLASS_COUNT)
    }
}

impl FromIterator<(CategoryId, usize)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (CategoryId, usize)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<u64, usize>> for CategoryMap {
    fn from(raw: BTreeMap<u64, usize>) -> Self {
        raw.into_iter()
            .map(|(cat, class)| (CategoryId::new(cat), class))
            .collect()
    }
}

impl From<CategoryMap> for BTreeMap<u64, usize> {
    fn from(map: CategoryMap) -> Self {
        map.entries
            .into_iter()
            .map(|(cat, class)| (cat.as_u64(), class))
            .collect()
    }
}

impl FromStr for CategoryMap {
    type Err = DetkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut map = CategoryMap::empty();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (category, class_index) = parse_entry(entry)?;
            if map.insert(category, class_index).is_some() {
                return Err(DetkitError::InvalidCategoryMap {
                    entry: entry.to_string(),
                    message: format!("category {category} is mapped twice"),
                });
            }
        }
        Ok(map)
    }
}

impl fmt::Display for CategoryMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (category, class_index) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{category}:{class_index}")?;
            first = false;
        }
        Ok(())
    }
}

fn parse_entry(entry: &str) -> Result<(CategoryId, usize), DetkitError> {
    let invalid = |message: &str| DetkitError::InvalidCategoryMap {
        entry: entry.to_string(),
        message: message.to_string(),
    };

    let (src, dst) = entry
        .split_once(':')
        .ok_or_else(|| invalid("expected <category_id>:<class_index>"))?;
    let category = src
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid("category id must be a non-negative integer"))?;
    let class_index = dst
        .trim()
        .parse::<usize>()
        .map_err(|_| invalid("class index must be a non-negative integer"))?;

    Ok((CategoryId::new(category), class_index))
}

/// clap value parser for `--category-map`.
pub fn parse_category_map(s: &str) -> Result<CategoryMap, String> {
    s.parse::<CategoryMap>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity_over_five_classes() {
        let map = CategoryMap::default();
        assert_eq!(map.len(), 5);
        for i in 0..5u64 {
            assert_eq!(map.class_index(CategoryId(i)), Some(i as usize));
        }
        assert_eq!(map.class_index(CategoryId(5)), None);
        assert_eq!(map.max_class_index(), Some(4));
    }

    #[test]
    fn parses_cli_form() {
        let map: CategoryMap = " 7:0 , 9:1,".parse().expect("parse");
        assert_eq!(map.len(), 2);
        assert_eq!(map.class_index(CategoryId(7)), Some(0));
        assert_eq!(map.class_index(CategoryId(9)), Some(1));
        assert_eq!(map.to_string(), "7:0,9:1");
    }

    #[test]
    fn rejects_malformed_entries() {
        for raw in ["7", "a:1", "1:-2", "1:0,1:2"] {
            let err = raw.parse::<CategoryMap>().unwrap_err();
            assert!(
                matches!(err, DetkitError::InvalidCategoryMap { .. }),
                "{raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn deserializes_from_yaml_mapping() {
        let map: CategoryMap = serde_yaml::from_str("1: 0\n2: 0\n5: 3\n").expect("parse yaml");
        assert_eq!(map.class_index(CategoryId(2)), Some(0));
        assert_eq!(map.class_index(CategoryId(5)), Some(3));
    }
}
