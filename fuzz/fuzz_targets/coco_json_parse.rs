//! Fuzz target for the COCO JSON reader.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use detkit::ir::io_coco_json::from_coco_slice;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    // Parsed datasets must also survive label normalization.
    if let Ok(dataset) = from_coco_slice(data) {
        for ann in &dataset.annotations {
            let label = detkit::ir::io_yolo::YoloLabel::from_pixel_bbox(0, &ann.bbox, 640.0, 480.0);
            assert!((0.0..=1.0).contains(&label.cx));
            assert!((0.0..=1.0).contains(&label.h));
        }
    }
});
