use std::path::PathBuf;
use thiserror::Error;

use crate::convert::SkipReason;
use crate::ir::AnnotationId;

/// The main error type for detkit operations.
#[derive(Debug, Error)]
pub enum DetkitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid category map entry '{entry}': {message}")]
    InvalidCategoryMap { entry: String, message: String },

    #[error("Invalid YOLO label at {path}:{line}: {message}")]
    YoloLabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Annotation {annotation} skipped ({reason}) and strict mode is on")]
    AnnotationSkipped {
        annotation: AnnotationId,
        reason: SkipReason,
    },

    #[error("Failed to copy image {from} to {to}: {source}")]
    ImageCopy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write report: {0}")]
    ReportWrite(#[source] serde_json::Error),

    #[error("Failed to open video source {0}")]
    VideoOpen(PathBuf),

    #[error("Video annotation is unavailable: detkit was built without the `opencv` feature")]
    VideoBackendUnavailable,

    #[error("Detector error: {0}")]
    Detector(String),

    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),
}
