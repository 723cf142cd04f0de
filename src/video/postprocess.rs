//! YOLOv8 output decoding and non-maximum suppression.
//!
//! An exported YOLOv8 detection head produces one tensor of shape
//! `[1, 4 + num_classes, num_candidates]`: for every candidate the box as
//! `cx, cy, w, h` in network input pixels followed by one score per class.

use std::cmp::Ordering;

use super::Detection;
use crate::error::DetkitError;
use crate::ir::{BBoxXYXY, Pixel};

/// Square network input side used by the exported models.
pub const INPUT_SIZE: i32 = 640;

pub const DEFAULT_CONF_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Decodes a raw `[4 + num_classes, num_candidates]` output (row-major, batch
/// dimension already dropped) into detections in frame pixels.
///
/// `scale` maps network input pixels to frame pixels as `(sx, sy)`.
/// Candidates whose best class score is below `conf_threshold` are dropped.
pub fn decode_yolov8(
    output: &[f32],
    num_classes: usize,
    scale: (f32, f32),
    conf_threshold: f32,
) -> Result<Vec<Detection>, DetkitError> {
    let rows = 4 + num_classes;
    if num_classes == 0 || output.len() % rows != 0 {
        return Err(DetkitError::Detector(format!(
            "output of {} values does not fit {} rows",
            output.len(),
            rows
        )));
    }
    let candidates = output.len() / rows;
    let at = |row: usize, col: usize| output[row * candidates + col];

    let mut detections = Vec::new();
    for col in 0..candidates {
        let (class_index, confidence) = (0..num_classes)
            .map(|class| (class, at(4 + class, col)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .unwrap_or((0, 0.0));

        if confidence.is_nan() || confidence < conf_threshold {
            continue;
        }

        let (sx, sy) = scale;
        let bbox = BBoxXYXY::<Pixel>::from_cxcywh(
            f64::from(at(0, col) * sx),
            f64::from(at(1, col) * sy),
            f64::from(at(2, col) * sx),
            f64::from(at(3, col) * sy),
        );
        detections.push(Detection::new(bbox, class_index, confidence));
    }
    Ok(detections)
}

/// Intersection over union of two pixel boxes; `0.0` when both are empty.
pub fn iou(a: &BBoxXYXY<Pixel>, b: &BBoxXYXY<Pixel>) -> f64 {
    let iw = (a.xmax().min(b.xmax()) - a.xmin().max(b.xmin())).max(0.0);
    let ih = (a.ymax().min(b.ymax()) - a.ymin().max(b.ymin())).max(0.0);
    let inter = iw * ih;
    let union = a.area() + b.area() - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Greedy per-class NMS. Output is sorted by descending confidence.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept.iter().any(|k| {
            k.class_index == candidate.class_index
                && iou(&k.bbox, &candidate.bbox) > f64::from(iou_threshold)
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a `[4 + nc, n]` tensor from per-candidate rows.
    fn tensor(candidates: &[[f32; 6]]) -> Vec<f32> {
        let n = candidates.len();
        let mut out = vec![0.0; 6 * n];
        for (col, cand) in candidates.iter().enumerate() {
            for (row, value) in cand.iter().enumerate() {
                out[row * n + col] = *value;
            }
        }
        out
    }

    #[test]
    fn decodes_best_class_and_scales_boxes() {
        let output = tensor(&[
            [320.0, 320.0, 64.0, 32.0, 0.1, 0.9],
            [100.0, 100.0, 10.0, 10.0, 0.2, 0.1],
        ]);
        let dets = decode_yolov8(&output, 2, (2.0, 1.0), 0.25).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_index, 1);
        assert!((dets[0].confidence - 0.9).abs() < 1e-6);
        let b = &dets[0].bbox;
        assert!((b.xmin() - 576.0).abs() < 1e-6);
        assert!((b.xmax() - 704.0).abs() < 1e-6);
        assert!((b.ymin() - 304.0).abs() < 1e-6);
        assert!((b.ymax() - 336.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_mismatched_shapes() {
        assert!(decode_yolov8(&[0.0; 7], 2, (1.0, 1.0), 0.25).is_err());
        assert!(decode_yolov8(&[0.0; 8], 0, (1.0, 1.0), 0.25).is_err());
    }

    #[test]
    fn nan_scores_are_dropped() {
        let output = tensor(&[[10.0, 10.0, 5.0, 5.0, f32::NAN, f32::NAN]]);
        let dets = decode_yolov8(&output, 2, (1.0, 1.0), 0.25).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BBoxXYXY::<Pixel>::from_xyxy(0.0, 0.0, 10.0, 10.0);
        let b = BBoxXYXY::<Pixel>::from_xyxy(5.0, 0.0, 15.0, 10.0);
        let c = BBoxXYXY::<Pixel>::from_xyxy(20.0, 20.0, 30.0, 30.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-12);
        assert!((iou(&a, &b) - 50.0 / 150.0).abs() < 1e-12);
        assert_eq!(iou(&a, &c), 0.0);
    }

    #[test]
    fn nms_keeps_best_overlapping_box_per_class() {
        let boxed = |x: f64, class: usize, conf: f32| {
            Detection::new(
                BBoxXYXY::from_xyxy(x, 0.0, x + 10.0, 10.0),
                class,
                conf,
            )
        };
        let kept = non_max_suppression(
            vec![
                boxed(0.0, 0, 0.6),
                boxed(1.0, 0, 0.9),
                boxed(1.0, 1, 0.5),
                boxed(50.0, 0, 0.3),
            ],
            0.45,
        );

        let summary: Vec<(usize, f32)> =
            kept.iter().map(|d| (d.class_index, d.confidence)).collect();
        assert_eq!(summary, vec![(0, 0.9), (1, 0.5), (0, 0.3)]);
    }
}
