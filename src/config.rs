//! Dataset layout for `convert-splits`.
//!
//! A config file is optional. Every field has a default, so a YAML file only
//! needs the keys that differ:
//!
//! ```yaml
//! raw_root: ./data
//! converted_root: ./fisheye_yolo_dataset
//! class_names: [Bus, Bike, Car, Pedestrian, Truck]
//! category_map: {0: 0, 1: 1, 2: 2, 3: 3, 4: 4}
//! splits:
//!   - name: train
//!     annotations: train/train.json
//!     images: train/images
//!   - name: val
//!     annotations: test/test.json
//!     images: test/images
//! ```
//!
//! Split paths are relative to `raw_root` unless absolute.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::convert::CategoryMap;
use crate::error::DetkitError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// Directory holding the raw COCO splits.
    pub raw_root: PathBuf,
    /// Directory the YOLO dataset is written into.
    pub converted_root: PathBuf,
    /// Class names by class index, written to `data.yaml`.
    pub class_names: Vec<String>,
    pub category_map: CategoryMap,
    pub splits: Vec<SplitConfig>,
}

/// One split: where its annotations and images live and what it is called
/// in the output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    pub name: String,
    pub annotations: PathBuf,
    pub images: PathBuf,
}

impl SplitConfig {
    pub fn new(
        name: impl Into<String>,
        annotations: impl Into<PathBuf>,
        images: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            annotations: annotations.into(),
            images: images.into(),
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            raw_root: PathBuf::from("./data"),
            converted_root: PathBuf::from("./fisheye_yolo_dataset"),
            class_names: ["Bus", "Bike", "Car", "Pedestrian", "Truck"]
                .into_iter()
                .map(String::from)
                .collect(),
            category_map: CategoryMap::default(),
            splits: vec![
                SplitConfig::new("train", "train/train.json", "train/images"),
                SplitConfig::new("val", "test/test.json", "test/images"),
            ],
        }
    }
}

impl DatasetConfig {
    /// Loads a YAML config. Missing keys take their default value.
    pub fn load(path: &Path) -> Result<Self, DetkitError> {
        let file = File::open(path).map_err(DetkitError::Io)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).map_err(|source| DetkitError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rejects empty or repeated split names and an empty category map;
    /// warns about class indices that have no entry in `class_names`.
    pub fn validate(&self) -> Result<(), DetkitError> {
        if self.splits.is_empty() {
            return Err(DetkitError::InvalidConfig(
                "at least one split is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for split in &self.splits {
            let name = split.name.trim();
            if name.is_empty() {
                return Err(DetkitError::InvalidConfig(
                    "split name must not be empty".to_string(),
                ));
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(DetkitError::InvalidConfig(format!(
                    "split name '{name}' must be a plain directory name"
                )));
            }
            if !seen.insert(name) {
                return Err(DetkitError::InvalidConfig(format!(
                    "split '{name}' is listed more than once"
                )));
            }
        }

        if self.category_map.is_empty() {
            return Err(DetkitError::InvalidConfig(
                "category_map is empty; every annotation would be dropped".to_string(),
            ));
        }

        if let Some(max) = self.category_map.max_class_index() {
            if max >= self.class_names.len() {
                warn!(
                    "category map produces class index {} but only {} class name(s) are configured",
                    max,
                    self.class_names.len()
                );
            }
        }

        Ok(())
    }

    pub fn split_annotations(&self, split: &SplitConfig) -> PathBuf {
        self.raw_root.join(&split.annotations)
    }

    pub fn split_images(&self, split: &SplitConfig) -> PathBuf {
        self.raw_root.join(&split.images)
    }

    pub fn split_output(&self, split: &SplitConfig) -> PathBuf {
        self.converted_root.join(&split.name)
    }

    pub fn split_names(&self) -> Vec<&str> {
        self.splits.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::CategoryId;
    use std::fs;

    #[test]
    fn defaults_describe_the_fisheye_layout() {
        let config = DatasetConfig::default();
        assert_eq!(config.raw_root, PathBuf::from("./data"));
        assert_eq!(config.converted_root, PathBuf::from("./fisheye_yolo_dataset"));
        assert_eq!(
            config.class_names,
            vec!["Bus", "Bike", "Car", "Pedestrian", "Truck"]
        );
        assert_eq!(config.split_names(), vec!["train", "val"]);

        let val = &config.splits[1];
        assert_eq!(
            config.split_annotations(val),
            PathBuf::from("./data/test/test.json")
        );
        assert_eq!(config.split_images(val), PathBuf::from("./data/test/images"));
        assert_eq!(
            config.split_output(val),
            PathBuf::from("./fisheye_yolo_dataset/val")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("detkit.yaml");
        fs::write(
            &path,
            "raw_root: /datasets/raw\ncategory_map:\n  1: 0\n  2: 1\n",
        )
        .unwrap();

        let config = DatasetConfig::load(&path).expect("load config");
        assert_eq!(config.raw_root, PathBuf::from("/datasets/raw"));
        assert_eq!(config.converted_root, PathBuf::from("./fisheye_yolo_dataset"));
        assert_eq!(config.category_map.class_index(CategoryId(2)), Some(1));
        assert_eq!(config.category_map.class_index(CategoryId(0)), None);
        assert_eq!(config.splits.len(), 2);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("detkit.yaml");
        fs::write(&path, "raw_rot: ./data\n").unwrap();

        let err = DatasetConfig::load(&path).unwrap_err();
        assert!(matches!(err, DetkitError::ConfigParse { .. }));
        assert!(err.to_string().contains("detkit.yaml"));
    }

    #[test]
    fn duplicate_split_names_are_invalid() {
        let mut config = DatasetConfig::default();
        config.splits[1].name = "train".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn empty_or_nested_split_names_are_invalid() {
        for name in ["", "  ", "a/b", ".."] {
            let mut config = DatasetConfig::default();
            config.splits[0].name = name.to_string();
            assert!(
                matches!(config.validate(), Err(DetkitError::InvalidConfig(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn empty_category_map_is_invalid() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("detkit.yaml");
        fs::write(&path, "category_map: {}\n").unwrap();

        let config = DatasetConfig::load(&path).expect("load config");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("category_map is empty"));
    }

    #[test]
    fn missing_class_names_only_warn() {
        let mut config = DatasetConfig::default();
        config.class_names.truncate(2);
        assert!(config.validate().is_ok());
    }
}
