//! Ultralytics-style YOLO labels.
//!
//! A YOLO dataset split is a directory holding `images/` and `labels/`.
//! Every image `name.ext` has a label file `labels/name.txt` with one line
//! per object:
//!
//! ```text
//! <class_index> <cx> <cy> <w> <h>
//! ```
//!
//! where the four floats are relative to the image size and written with six
//! decimal places.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{BBoxXYXY, Pixel};
use crate::error::DetkitError;

pub const LABEL_EXTENSION: &str = "txt";

/// One line of a YOLO label file.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloLabel {
    pub class_index: usize,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl YoloLabel {
    /// Normalizes a pixel-space box against the image size.
    ///
    /// Each of the four values is clamped into `[0, 1]` on its own, so a box
    /// hanging over the image edge keeps its (clamped) center and size rather
    /// than being cropped geometrically.
    pub fn from_pixel_bbox(
        class_index: usize,
        bbox: &BBoxXYXY<Pixel>,
        image_width: f64,
        image_height: f64,
    ) -> Self {
        let (cx, cy, w, h) = bbox.to_cxcywh();
        Self {
            class_index,
            cx: clamp_unit(cx / image_width),
            cy: clamp_unit(cy / image_height),
            w: clamp_unit(w / image_width),
            h: clamp_unit(h / image_height),
        }
    }

    /// Normalizes a COCO `[x, y, width, height]` box straight from its source
    /// values: `cx = (x + w / 2) / W`, `w = w / W`. Clamping as in
    /// [`YoloLabel::from_pixel_bbox`].
    pub fn from_coco_xywh(
        class_index: usize,
        xywh: [f64; 4],
        image_width: f64,
        image_height: f64,
    ) -> Self {
        let [x, y, w, h] = xywh;
        Self {
            class_index,
            cx: clamp_unit((x + w / 2.0) / image_width),
            cy: clamp_unit((y + h / 2.0) / image_height),
            w: clamp_unit(w / image_width),
            h: clamp_unit(h / image_height),
        }
    }

    /// Maps the label back onto an image of the given size.
    pub fn to_pixel_bbox(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_cxcywh(self.cx, self.cy, self.w, self.h).to_pixel(image_width, image_height)
    }
}

impl fmt::Display for YoloLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_index, self.cx, self.cy, self.w, self.h
        )
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    // `+ 0.0` turns -0.0 into 0.0 so it never prints as "-0.000000".
    value.clamp(0.0, 1.0) + 0.0
}

/// Label file name for an image: its base-name stem plus `.txt`.
///
/// Directories in `image_file_name` are dropped, so `cam1/a.jpg` and
/// `cam2/a.jpg` share `a.txt`. Returns `None` when there is no stem.
pub fn label_file_name(image_file_name: &str) -> Option<String> {
    let stem = Path::new(image_file_name).file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{stem}.{LABEL_EXTENSION}"))
}

/// Appends one label line to `labels_dir/<label_file_name>`.
///
/// The file is opened in append mode, so running twice into the same
/// directory duplicates lines.
pub fn append_label(
    labels_dir: &Path,
    label_file_name: &str,
    label: &YoloLabel,
) -> Result<PathBuf, DetkitError> {
    let path = labels_dir.join(label_file_name);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(DetkitError::Io)?;
    writeln!(file, "{label}").map_err(DetkitError::Io)?;
    Ok(path)
}

/// Reads every label line of a label file. Blank lines are skipped.
pub fn read_label_file(path: &Path) -> Result<Vec<YoloLabel>, DetkitError> {
    let content = fs::read_to_string(path).map_err(DetkitError::Io)?;
    let mut labels = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if let Some(label) = parse_label_line(line, path, line_idx + 1)? {
            labels.push(label);
        }
    }
    Ok(labels)
}

/// Parses a single label line. Returns `Ok(None)` for blank lines.
pub fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<Option<YoloLabel>, DetkitError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    // At most 6 tokens so a huge line does not allocate a huge Vec.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(6).collect();
    if tokens.len() != 5 {
        let found = if tokens.len() > 5 {
            "more than 5".to_string()
        } else {
            tokens.len().to_string()
        };
        return Err(DetkitError::YoloLabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("expected 5 tokens, found {found}"),
        });
    }

    let class_index = tokens[0]
        .parse::<usize>()
        .map_err(|_| DetkitError::YoloLabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class index '{}'; expected non-negative integer",
                tokens[0]
            ),
        })?;

    let cx = parse_f64_token(tokens[1], "x_center", file_path, line_num)?;
    let cy = parse_f64_token(tokens[2], "y_center", file_path, line_num)?;
    let w = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let h = parse_f64_token(tokens[4], "height", file_path, line_num)?;

    Ok(Some(YoloLabel {
        class_index,
        cx,
        cy,
        w,
        h,
    }))
}

/// Fuzz-only entrypoint: parses one line as read from `<fuzz>`.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<Option<YoloLabel>, DetkitError> {
    parse_label_line(input, Path::new("<fuzz>"), 1)
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, DetkitError> {
    raw.parse::<f64>().map_err(|_| DetkitError::YoloLabelParse {
        path: file_path.to_path_buf(),
        line: line_num,
        message: format!("invalid {field_name} '{raw}'; expected floating-point number"),
    })
}

/// Writes an Ultralytics `data.yaml` at `root`.
///
/// Each split points at `<split>/images`; `names` maps class index to name.
pub fn write_data_yaml(
    root: &Path,
    splits: &[&str],
    class_names: &[String],
) -> Result<PathBuf, DetkitError> {
    let absolute = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    let mut yaml = format!(
        "path: {}\n",
        yaml_single_quoted(&absolute.to_string_lossy())
    );
    for split in splits {
        yaml.push_str(&format!(
            "{}: {}\n",
            split,
            yaml_single_quoted(&format!("{split}/images"))
        ));
    }
    yaml.push_str("\nnames:\n");
    for (idx, name) in class_names.iter().enumerate() {
        yaml.push_str(&format!("  {}: {}\n", idx, yaml_single_quoted(name)));
    }

    let path = root.join("data.yaml");
    fs::write(&path, yaml).map_err(DetkitError::Io)?;
    Ok(path)
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}
