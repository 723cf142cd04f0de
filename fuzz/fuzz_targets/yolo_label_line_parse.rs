//! Fuzz target for YOLO label lines.
//!
//! Any line the parser accepts must render back (six decimals) to a line it
//! accepts again, with the same class and the same NaN/finite shape.
//!
//! Run with:
//!   cargo +nightly fuzz run yolo_label_line_parse

#![no_main]

use std::path::Path;

use detkit::ir::io_yolo::{fuzz_parse_label_line, parse_label_line};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(Some(label)) = fuzz_parse_label_line(line) else {
        return;
    };

    let rendered = label.to_string();
    assert_eq!(rendered.split(' ').count(), 5, "{rendered:?}");

    let again = parse_label_line(&rendered, Path::new("<rendered>"), 1)
        .expect("rendered line parses")
        .expect("rendered line is not blank");
    assert_eq!(again.class_index, label.class_index);

    for (before, after) in [
        (label.cx, again.cx),
        (label.cy, again.cy),
        (label.w, again.w),
        (label.h, again.h),
    ] {
        assert_eq!(before.is_nan(), after.is_nan(), "{rendered:?}");
        assert_eq!(before.is_finite(), after.is_finite(), "{rendered:?}");
    }
});
