use std::fs;

use detkit::convert::{convert_coco_to_yolo, ConvertOptions, SkipReason};
use detkit::ir::io_yolo::read_label_file;
use detkit::DetkitError;

mod common;

#[test]
fn zero_sizes_are_read_from_image_files() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    let annotations = common::write_unsized_split(
        root,
        &[common::UnsizedImage {
            id: 7,
            file_name: "frame_001.bmp",
            width: 200,
            height: 100,
        }],
        &[(7, 0, [50.0, 25.0, 100.0, 50.0]), (7, 4, [0.0, 0.0, 200.0, 100.0])],
    );

    let report = convert_coco_to_yolo(
        &annotations,
        &root.join("images"),
        &root.join("out"),
        &ConvertOptions::default(),
    )
    .expect("convert");

    assert_eq!(report.labels_written, 2);
    assert_eq!(report.skipped_total(), 0);
    assert_eq!(report.images_copied, 1);

    let labels = read_label_file(&root.join("out/labels/frame_001.txt")).expect("read labels");
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].class_index, 0);
    assert!((labels[0].cx - 0.5).abs() < 1e-9);
    assert!((labels[0].w - 0.5).abs() < 1e-9);
    assert_eq!(labels[1].class_index, 4);
    assert!((labels[1].w - 1.0).abs() < 1e-9);
    assert!((labels[1].h - 1.0).abs() < 1e-9);
}

#[test]
fn each_image_gets_its_own_file_size() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    let annotations = common::write_unsized_split(
        root,
        &[
            common::UnsizedImage {
                id: 1,
                file_name: "wide.bmp",
                width: 400,
                height: 100,
            },
            common::UnsizedImage {
                id: 2,
                file_name: "tall.bmp",
                width: 100,
                height: 400,
            },
        ],
        &[(1, 1, [0.0, 0.0, 100.0, 100.0]), (2, 1, [0.0, 0.0, 100.0, 100.0])],
    );

    convert_coco_to_yolo(
        &annotations,
        &root.join("images"),
        &root.join("out"),
        &ConvertOptions::default(),
    )
    .expect("convert");

    assert_eq!(
        fs::read_to_string(root.join("out/labels/wide.txt")).unwrap(),
        "1 0.125000 0.500000 0.250000 1.000000\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("out/labels/tall.txt")).unwrap(),
        "1 0.500000 0.125000 1.000000 0.250000\n"
    );
}

#[test]
fn unreadable_zero_size_image_is_dropped() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    fs::create_dir_all(root.join("images")).unwrap();
    fs::write(root.join("images/a.jpg"), b"not an image").unwrap();
    fs::write(
        root.join("ann.json"),
        r#"{"images": [{"id": 1, "file_name": "a.jpg", "width": 0, "height": 0}],
            "annotations": [{"image_id": 1, "category_id": 1, "bbox": [1, 1, 2, 2]}]}"#,
    )
    .unwrap();

    let report = convert_coco_to_yolo(
        &root.join("ann.json"),
        &root.join("images"),
        &root.join("out"),
        &ConvertOptions::default(),
    )
    .expect("convert");

    assert_eq!(report.skipped_count(SkipReason::InvalidImageSize), 1);
    assert!(!root.join("out/labels/a.txt").exists());
}

#[test]
fn missing_annotation_file_is_an_io_error() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let err = convert_coco_to_yolo(
        &temp.path().join("nope.json"),
        temp.path(),
        &temp.path().join("out"),
        &ConvertOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, DetkitError::Io(_)));
}

#[test]
fn report_names_source_document() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let root = temp.path();
    fs::write(root.join("ann.json"), r#"{"images": [], "annotations": []}"#).unwrap();

    let report = convert_coco_to_yolo(
        &root.join("ann.json"),
        &root.join("images"),
        &root.join("out"),
        &ConvertOptions::default(),
    )
    .expect("convert");

    assert!(report.source.ends_with("ann.json"));
    assert!(report.to_string().contains("ann.json -> "));
    assert!(root.join("out/images").is_dir());
    assert!(root.join("out/labels").is_dir());
}
