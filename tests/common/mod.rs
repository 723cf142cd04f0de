//! Fixtures for conversions whose COCO documents leave image sizes out.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

/// An image on disk whose size the annotation document does not state.
pub struct UnsizedImage {
    pub id: u64,
    pub file_name: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Uncompressed 24-bit BMP, all pixels black. Only the header matters to the
/// converter's size lookup.
pub fn bmp(width: u32, height: u32) -> Vec<u8> {
    const HEADER_LEN: u32 = 14 + 40;
    let row_len = (width * 3 + 3) & !3;
    let pixel_len = row_len * height;

    let mut header = [0u8; HEADER_LEN as usize];
    let mut put = |offset: usize, bytes: &[u8]| {
        header[offset..offset + bytes.len()].copy_from_slice(bytes);
    };
    put(0, b"BM");
    put(2, &(HEADER_LEN + pixel_len).to_le_bytes());
    put(10, &HEADER_LEN.to_le_bytes());
    put(14, &40u32.to_le_bytes());
    put(18, &width.to_le_bytes());
    put(22, &height.to_le_bytes());
    put(26, &1u16.to_le_bytes());
    put(28, &24u16.to_le_bytes());
    put(34, &pixel_len.to_le_bytes());

    let mut bytes = header.to_vec();
    bytes.resize((HEADER_LEN + pixel_len) as usize, 0);
    bytes
}

/// Writes `root/images/<file_name>` as BMPs plus `root/ann.json`, whose image
/// records carry no `width`/`height`. Annotations are
/// `(image_id, category_id, [x, y, w, h])`. Returns the document path.
pub fn write_unsized_split(
    root: &Path,
    images: &[UnsizedImage],
    annotations: &[(u64, u64, [f64; 4])],
) -> PathBuf {
    let image_dir = root.join("images");
    fs::create_dir_all(&image_dir).expect("create image dir");
    for image in images {
        fs::write(image_dir.join(image.file_name), bmp(image.width, image.height))
            .expect("write bmp");
    }

    let doc = json!({
        "images": images
            .iter()
            .map(|image| json!({"id": image.id, "file_name": image.file_name}))
            .collect::<Vec<_>>(),
        "annotations": annotations
            .iter()
            .map(|(image_id, category_id, bbox)| {
                json!({"image_id": image_id, "category_id": category_id, "bbox": bbox})
            })
            .collect::<Vec<_>>(),
    });

    let path = root.join("ann.json");
    fs::write(&path, doc.to_string()).expect("write annotations");
    path
}
