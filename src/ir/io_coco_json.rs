//! COCO JSON reader.
//!
//! COCO boxes are `[x, y, width, height]` with `(x, y)` the top-left corner
//! in pixels. They are converted to the canonical XYXY form on read.
//!
//! The reader is deliberately lenient about everything the converter does
//! not need: `info`, `licenses`, `segmentation`, `area`, `iscrowd` and
//! `score` are ignored, `categories` may be absent, and annotations without
//! an `id` get sequential ids in document order.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use super::model::{Annotation, Category, Dataset, Image};
use crate::error::DetkitError;

#[derive(Debug, Deserialize)]
struct CocoDataset {
    images: Vec<CocoImage>,

    annotations: Vec<CocoAnnotation>,

    #[serde(default)]
    categories: Vec<CocoCategory>,
}

#[derive(Debug, Deserialize)]
struct CocoImage {
    id: u64,
    file_name: String,

    /// Any JSON number or `null`; see [`dimension`].
    #[serde(default)]
    width: Option<f64>,

    #[serde(default)]
    height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CocoCategory {
    id: u64,

    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CocoAnnotation {
    #[serde(default)]
    id: Option<u64>,
    image_id: u64,
    category_id: u64,
    bbox: [f64; 4],
}

/// Reads a dataset from a COCO JSON file.
///
/// # Errors
/// Returns [`DetkitError::Io`] if the file cannot be opened and
/// [`DetkitError::CocoJsonParse`] if it is not a COCO document.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use detkit::ir::io_coco_json::read_coco_json;
///
/// let dataset = read_coco_json(Path::new("data/train/train.json"))?;
/// println!("{} annotations", dataset.annotations.len());
/// # Ok::<(), detkit::DetkitError>(())
/// ```
pub fn read_coco_json(path: &Path) -> Result<Dataset, DetkitError> {
    let file = File::open(path).map_err(DetkitError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoDataset =
        serde_json::from_reader(reader).map_err(|source| DetkitError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(coco_to_ir(coco))
}

/// Reads a dataset from a COCO JSON string.
pub fn from_coco_str(json: &str) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDataset = serde_json::from_str(json)?;
    Ok(coco_to_ir(coco))
}

/// Reads a dataset from raw COCO JSON bytes.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDataset = serde_json::from_slice(bytes)?;
    Ok(coco_to_ir(coco))
}

/// Image side in whole pixels. Missing, negative, non-finite or oversized
/// values become `0`, which makes the converter read the size from the file.
fn dimension(raw: Option<f64>) -> u32 {
    match raw {
        Some(v) if v.is_finite() && v >= 0.0 && v <= f64::from(u32::MAX) => v.round() as u32,
        _ => 0,
    }
}

fn coco_to_ir(coco: CocoDataset) -> Dataset {
    let images = coco
        .images
        .into_iter()
        .map(|img| {
            Image::new(
                img.id,
                img.file_name,
                dimension(img.width),
                dimension(img.height),
            )
        })
        .collect();

    let categories = coco
        .categories
        .into_iter()
        .map(|cat| Category::new(cat.id, cat.name))
        .collect();

    let annotations = coco
        .annotations
        .into_iter()
        .enumerate()
        .map(|(index, ann)| {
            Annotation::from_xywh(
                ann.id.unwrap_or(index as u64 + 1),
                ann.image_id,
                ann.category_id,
                ann.bbox,
            )
        })
        .collect();

    Dataset {
        images,
        categories,
        annotations,
    }
}
