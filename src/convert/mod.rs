//! COCO JSON to YOLO label conversion.
//!
//! For every annotation, in document order, the converter looks up the
//! image and the class index, appends one normalized label line to
//! `labels/<stem>.txt` and, on the image's first appearance in the run,
//! copies the image into `images/`.
//!
//! Annotations that cannot be converted (unknown image, unmapped category,
//! unusable image size or file name) are handled by [`SkipPolicy`]: dropped
//! and counted by default, or turned into an error in strict mode.
//!
//! Label files are opened in append mode. Converting twice into the same
//! output root duplicates every line unless [`ConvertOptions::fresh`] is set;
//! image copies never overwrite.

mod category_map;
mod report;

pub use category_map::{parse_category_map, CategoryMap, DEFAULT_CLASS_COUNT};
pub use report::{ConversionReport, InputCounts, SkipReason};

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::DetkitError;
use crate::ir::io_coco_json::read_coco_json;
use crate::ir::io_yolo::{append_label, label_file_name, YoloLabel, LABEL_EXTENSION};
use crate::ir::{Annotation, Dataset, Image, ImageId};
use crate::utils::create_progress_bar;

/// What to do with an annotation that cannot be converted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Drop the annotation, count it in the report and keep going.
    #[default]
    Drop,
    /// Abort the run with [`DetkitError::AnnotationSkipped`].
    Strict,
}

/// Options for a conversion run.
#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    pub category_map: CategoryMap,
    pub skip_policy: SkipPolicy,
    /// Delete existing label files under `labels/` before converting.
    pub fresh: bool,
    /// Draw a progress bar on stderr.
    pub progress: bool,
}

/// Converts a COCO JSON file into a YOLO `images/` + `labels/` tree.
///
/// # Errors
/// Fails when the document cannot be read or parsed, when the output cannot
/// be written, or (with [`SkipPolicy::Strict`]) on the first dropped
/// annotation.
pub fn convert_coco_to_yolo(
    annotations_path: &Path,
    image_dir: &Path,
    output_root: &Path,
    opts: &ConvertOptions,
) -> Result<ConversionReport, DetkitError> {
    info!("Reading annotations from {}", annotations_path.display());
    let dataset = read_coco_json(annotations_path)?;

    let mut report = convert_dataset(&dataset, image_dir, output_root, opts)?;
    report.source = annotations_path.display().to_string();
    Ok(report)
}

/// Converts an already loaded dataset. See [`convert_coco_to_yolo`].
pub fn convert_dataset(
    dataset: &Dataset,
    image_dir: &Path,
    output_root: &Path,
    opts: &ConvertOptions,
) -> Result<ConversionReport, DetkitError> {
    let images_dir = output_root.join("images");
    let labels_dir = output_root.join("labels");
    fs::create_dir_all(&images_dir).map_err(DetkitError::Io)?;
    fs::create_dir_all(&labels_dir).map_err(DetkitError::Io)?;

    let mut report = ConversionReport::new("", output_root.display().to_string());
    report.input = InputCounts {
        images: dataset.images.len(),
        categories: dataset.categories.len(),
        annotations: dataset.annotations.len(),
    };

    prepare_labels_dir(&labels_dir, opts.fresh, &mut report)?;

    if opts.category_map.is_empty() {
        warn!("Category map is empty; every annotation will be dropped");
    }

    let mut converter = Converter {
        images: dataset.image_index(),
        image_dir,
        images_dir: &images_dir,
        labels_dir: &labels_dir,
        opts,
        sizes: HashMap::new(),
        copied: HashSet::new(),
        label_files: HashSet::new(),
    };

    let pb = if opts.progress {
        create_progress_bar(dataset.annotations.len() as u64, "Convert")
    } else {
        indicatif::ProgressBar::hidden()
    };

    for annotation in &dataset.annotations {
        pb.inc(1);
        converter.convert_one(annotation, &mut report)?;
    }
    pb.finish_and_clear();

    report.label_files = converter.label_files.len();
    Ok(report)
}

struct Converter<'a> {
    images: HashMap<ImageId, &'a Image>,
    image_dir: &'a Path,
    images_dir: &'a Path,
    labels_dir: &'a Path,
    opts: &'a ConvertOptions,
    /// Resolved (width, height) per image; `None` when unusable.
    sizes: HashMap<ImageId, Option<(u32, u32)>>,
    /// File names already handled by the copy step in this run.
    copied: HashSet<&'a str>,
    label_files: HashSet<String>,
}

/// A label ready to be appended.
struct PlannedLabel<'a> {
    image: &'a Image,
    label_file: String,
    label: YoloLabel,
}

impl<'a> Converter<'a> {
    fn convert_one(
        &mut self,
        annotation: &Annotation,
        report: &mut ConversionReport,
    ) -> Result<(), DetkitError> {
        let planned = match self.plan(annotation) {
            Ok(planned) => planned,
            Err(reason) => {
                report.record_skip(reason);
                debug!(
                    "Dropping annotation {} (image {}, category {}): {}",
                    annotation.id, annotation.image_id, annotation.category_id, reason
                );
                return match self.opts.skip_policy {
                    SkipPolicy::Drop => Ok(()),
                    SkipPolicy::Strict => Err(DetkitError::AnnotationSkipped {
                        annotation: annotation.id,
                        reason,
                    }),
                };
            }
        };

        append_label(self.labels_dir, &planned.label_file, &planned.label)?;
        report.labels_written += 1;
        self.label_files.insert(planned.label_file);

        if self.copied.insert(planned.image.file_name.as_str()) {
            match copy_image(self.image_dir, self.images_dir, &planned.image.file_name)? {
                CopyOutcome::Copied => report.images_copied += 1,
                CopyOutcome::DestinationExists => report.copy_destination_exists += 1,
                CopyOutcome::SourceMissing => {
                    debug!(
                        "Source image {} not found; not copied",
                        self.image_dir.join(&planned.image.file_name).display()
                    );
                    report.copy_source_missing += 1;
                }
            }
        }

        Ok(())
    }

    fn plan(&mut self, annotation: &Annotation) -> Result<PlannedLabel<'a>, SkipReason> {
        let image: &'a Image = *self
            .images
            .get(&annotation.image_id)
            .ok_or(SkipReason::MissingImage)?;

        let class_index = self
            .opts
            .category_map
            .class_index(annotation.category_id)
            .ok_or(SkipReason::UnmappedCategory)?;

        if !is_relative_inside(&image.file_name) {
            return Err(SkipReason::InvalidFileName);
        }
        let label_file = label_file_name(&image.file_name).ok_or(SkipReason::InvalidFileName)?;

        let (width, height) = self.image_size(image).ok_or(SkipReason::InvalidImageSize)?;

        let label = YoloLabel::from_coco_xywh(
            class_index,
            annotation.xywh,
            f64::from(width),
            f64::from(height),
        );

        Ok(PlannedLabel {
            image,
            label_file,
            label,
        })
    }

    /// Dimensions from the record, falling back to the image file header
    /// when the record has a zero width or height.
    fn image_size(&mut self, image: &Image) -> Option<(u32, u32)> {
        if image.width > 0 && image.height > 0 {
            return Some((image.width, image.height));
        }

        let image_dir = self.image_dir;
        *self.sizes.entry(image.id).or_insert_with(|| {
            let path = image_dir.join(&image.file_name);
            match imagesize::size(&path) {
                Ok(size) if size.width > 0 && size.height > 0 => {
                    debug!(
                        "Image {} has no size in the document; read {}x{} from {}",
                        image.id,
                        size.width,
                        size.height,
                        path.display()
                    );
                    let width = u32::try_from(size.width).ok()?;
                    let height = u32::try_from(size.height).ok()?;
                    Some((width, height))
                }
                _ => None,
            }
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CopyOutcome {
    Copied,
    DestinationExists,
    SourceMissing,
}

fn copy_image(
    image_dir: &Path,
    images_dir: &Path,
    file_name: &str,
) -> Result<CopyOutcome, DetkitError> {
    let from = image_dir.join(file_name);
    let to = images_dir.join(file_name);

    if !from.exists() {
        return Ok(CopyOutcome::SourceMissing);
    }
    if to.exists() {
        return Ok(CopyOutcome::DestinationExists);
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(DetkitError::Io)?;
    }
    fs::copy(&from, &to).map_err(|source| DetkitError::ImageCopy {
        from: from.clone(),
        to: to.clone(),
        source,
    })?;
    Ok(CopyOutcome::Copied)
}

/// True for non-empty relative paths that stay below their base directory.
fn is_relative_inside(file_name: &str) -> bool {
    let path = Path::new(file_name);
    !file_name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn prepare_labels_dir(
    labels_dir: &Path,
    fresh: bool,
    report: &mut ConversionReport,
) -> Result<(), DetkitError> {
    let existing = existing_label_files(labels_dir)?;
    if existing.is_empty() {
        return Ok(());
    }

    if fresh {
        for path in &existing {
            fs::remove_file(path).map_err(DetkitError::Io)?;
        }
        info!(
            "Removed {} existing label file(s) from {}",
            existing.len(),
            labels_dir.display()
        );
    } else {
        report.preexisting_label_files = existing.len();
        warn!(
            "{} already contains {} label file(s); new lines are appended and may duplicate an earlier run (use --fresh to clear them)",
            labels_dir.display(),
            existing.len()
        );
    }
    Ok(())
}

fn existing_label_files(labels_dir: &Path) -> Result<Vec<PathBuf>, DetkitError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(labels_dir).max_depth(1) {
        let entry = entry.map_err(|e| DetkitError::Io(e.into()))?;
        let is_label = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(LABEL_EXTENSION));
        if entry.file_type().is_file() && is_label {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
