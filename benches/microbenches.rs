//! Criterion microbenches for detkit parsing and label formatting.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::fmt::Write;
use std::hint::black_box;

use detkit::ir::io_coco_json::{from_coco_slice, from_coco_str};
use detkit::ir::io_yolo::YoloLabel;

/// A synthetic COCO document: `images` images with `per_image` boxes each.
fn coco_fixture(images: usize, per_image: usize) -> String {
    let mut json = String::from("{\"images\":[");
    for i in 0..images {
        if i > 0 {
            json.push(',');
        }
        let _ = write!(
            json,
            "{{\"id\":{},\"file_name\":\"frame_{:05}.png\",\"width\":1280,\"height\":960}}",
            i + 1,
            i
        );
    }
    json.push_str("],\"annotations\":[");
    let mut id = 0;
    for i in 0..images {
        for j in 0..per_image {
            if id > 0 {
                json.push(',');
            }
            id += 1;
            let _ = write!(
                json,
                "{{\"id\":{},\"image_id\":{},\"category_id\":{},\"bbox\":[{},{},64.5,48.25]}}",
                id,
                i + 1,
                j % 5,
                (j * 37) % 1200,
                (j * 53) % 900
            );
        }
    }
    json.push_str("]}");
    json
}

fn bench_coco_parse(c: &mut Criterion) {
    let fixture = coco_fixture(200, 20);
    let mut group = c.benchmark_group("coco_parse");
    group.throughput(Throughput::Bytes(fixture.len() as u64));

    group.bench_function("from_coco_str", |b| {
        b.iter(|| {
            let ds = from_coco_str(black_box(&fixture)).unwrap();
            black_box(ds)
        })
    });

    group.bench_function("from_coco_slice", |b| {
        b.iter(|| {
            let ds = from_coco_slice(black_box(fixture.as_bytes())).unwrap();
            black_box(ds)
        })
    });

    group.finish();
}

/// Normalization plus six-decimal formatting, the converter's inner loop.
fn bench_label_format(c: &mut Criterion) {
    let dataset = from_coco_str(&coco_fixture(50, 20)).unwrap();
    let mut group = c.benchmark_group("yolo_label");
    group.throughput(Throughput::Elements(dataset.annotations.len() as u64));

    group.bench_function("normalize_and_format", |b| {
        b.iter(|| {
            let mut out = String::with_capacity(64 * dataset.annotations.len());
            for ann in &dataset.annotations {
                let label =
                    YoloLabel::from_coco_xywh(ann.category_id.as_u64() as usize, ann.xywh, 1280.0, 960.0);
                let _ = writeln!(out, "{label}");
            }
            black_box(out)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_coco_parse, bench_label_format);
criterion_main!(benches);
