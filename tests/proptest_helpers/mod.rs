#![allow(dead_code)]

use detkit::ir::{BBoxXYXY, Pixel};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Six printed decimals of a normalized value, mapped back to pixels.
pub fn eps_yolo(image_w: u32, image_h: u32) -> f64 {
    image_w.max(image_h) as f64 * 1e-6
}

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn arb_image_size() -> impl Strategy<Value = (u32, u32)> {
    (1u32..=4096, 1u32..=4096)
}

/// A box that lies fully inside a `w` x `h` image.
pub fn arb_bbox_inside(w: u32, h: u32) -> impl Strategy<Value = BBoxXYXY<Pixel>> {
    let (w, h) = (w as f64, h as f64);
    (0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64).prop_map(move |(a, b, c, d)| {
        let x = a * w;
        let y = b * h;
        let bw = c * (w - x);
        let bh = d * (h - y);
        BBoxXYXY::from_xywh(x, y, bw, bh)
    })
}

/// A box in `xywh` form that may extend well past the image on any side.
pub fn arb_bbox_anywhere() -> impl Strategy<Value = BBoxXYXY<Pixel>> {
    (-1e5..1e5f64, -1e5..1e5f64, 0.0..1e5f64, 0.0..1e5f64)
        .prop_map(|(x, y, w, h)| BBoxXYXY::from_xywh(x, y, w, h))
}
