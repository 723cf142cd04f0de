//! Intermediate representation for detection annotations.
//!
//! Annotation documents are parsed into a [`Dataset`] whose boxes are always
//! pixel-space XYXY. Label writers normalize from there. The coordinate space
//! is a type parameter, so pixel and normalized boxes cannot be mixed:
//!
//! ```
//! use detkit::ir::{Annotation, BBoxXYXY, Dataset, Image, Pixel};
//!
//! let dataset = Dataset {
//!     images: vec![Image::new(1u64, "a.jpg", 100, 200)],
//!     annotations: vec![Annotation::new(
//!         1u64,
//!         1u64,
//!         2u64,
//!         BBoxXYXY::<Pixel>::from_xywh(10.0, 20.0, 30.0, 40.0),
//!     )],
//!     ..Default::default()
//! };
//! let norm = dataset.annotations[0].bbox.to_normalized(100.0, 200.0);
//! assert!((norm.xmax() - 0.4).abs() < 1e-12);
//! ```

mod bbox;
mod coord;
mod ids;
pub mod io_coco_json;
pub mod io_yolo;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use model::{Annotation, Category, Dataset, Image};
pub use space::{Normalized, Pixel};
