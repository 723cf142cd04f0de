//! Dataset model shared by the COCO reader and the YOLO writer.

use std::collections::HashMap;

use super::bbox::BBoxXYXY;
use super::ids::{AnnotationId, CategoryId, ImageId};
use super::space::Pixel;

/// A detection dataset as read from an annotation document.
///
/// `annotations` keeps document order; the converter relies on it for the
/// line order inside each label file.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub images: Vec<Image>,
    pub categories: Vec<Category>,
    pub annotations: Vec<Annotation>,
}

impl Dataset {
    /// Index of images by id. Later records win when an id repeats.
    pub fn image_index(&self) -> HashMap<ImageId, &Image> {
        self.images.iter().map(|img| (img.id, img)).collect()
    }
}

/// An image record.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub id: ImageId,

    /// File name relative to the source image directory.
    pub file_name: String,

    /// Width in pixels; `0` when the document did not say.
    pub width: u32,

    /// Height in pixels; `0` when the document did not say.
    pub height: u32,
}

impl Image {
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
        }
    }
}

/// A source category. Only used for reporting; class indices come from the
/// category map.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One labelled box.
///
/// `xywh` is the box exactly as the source document wrote it. Label
/// normalization reads it instead of `bbox`, since going through the corners
/// and back is not exact in floating point.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub bbox: BBoxXYXY<Pixel>,
    pub xywh: [f64; 4],
}

impl Annotation {
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBoxXYXY<Pixel>,
    ) -> Self {
        let (x, y, w, h) = bbox.to_xywh();
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox,
            xywh: [x, y, w, h],
        }
    }

    /// Builds an annotation from a COCO `[x, y, width, height]` box.
    pub fn from_xywh(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        xywh: [f64; 4],
    ) -> Self {
        let [x, y, w, h] = xywh;
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox: BBoxXYXY::from_xywh(x, y, w, h),
            xywh,
        }
    }
}
