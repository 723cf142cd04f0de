//! OpenCV implementations of the video traits.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use opencv::core::{self, Mat, Point, Scalar, Size};
use opencv::prelude::*;
use opencv::{dnn, highgui, imgproc, videoio};

use super::postprocess::{decode_yolov8, non_max_suppression, INPUT_SIZE};
use super::{Canvas, Color, Detection, Detector, DisplayEvent, FrameDisplay, FrameSink, FrameSource, Rect};
use crate::error::DetkitError;

fn scalar(color: Color) -> Scalar {
    Scalar::new(
        f64::from(color.b),
        f64::from(color.g),
        f64::from(color.r),
        0.0,
    )
}

fn path_str(path: &Path) -> Result<&str, DetkitError> {
    path.to_str().ok_or_else(|| {
        DetkitError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("path is not valid UTF-8: {}", path.display()),
        ))
    })
}

impl Canvas for Mat {
    fn draw_rect(&mut self, rect: Rect, color: Color, thickness: i32) -> Result<(), DetkitError> {
        imgproc::rectangle(
            self,
            core::Rect::new(rect.x1, rect.y1, rect.x2 - rect.x1, rect.y2 - rect.y1),
            scalar(color),
            thickness,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        origin: (i32, i32),
        scale: f64,
        color: Color,
        thickness: i32,
    ) -> Result<(), DetkitError> {
        imgproc::put_text(
            self,
            text,
            Point::new(origin.0, origin.1),
            imgproc::FONT_HERSHEY_SIMPLEX,
            scale,
            scalar(color),
            thickness,
            imgproc::LINE_8,
            false,
        )?;
        Ok(())
    }
}

/// Frames decoded from a video file.
pub struct OpenCvVideoSource {
    capture: videoio::VideoCapture,
    fps: f64,
}

impl OpenCvVideoSource {
    /// Opens `path`; [`DetkitError::VideoOpen`] when OpenCV cannot read it.
    pub fn open(path: &Path) -> Result<Self, DetkitError> {
        let capture = videoio::VideoCapture::from_file(path_str(path)?, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(DetkitError::VideoOpen(path.to_path_buf()));
        }
        let fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        info!("Opened video {} ({:.2} FPS)", path.display(), fps);
        Ok(Self { capture, fps })
    }

    /// Frame rate reported by the container; `0.0` when unknown.
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl FrameSource for OpenCvVideoSource {
    type Frame = Mat;

    fn next_frame(&mut self) -> Result<Option<Mat>, DetkitError> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

/// Writes frames to an `mp4v` video. The file is created on the first frame,
/// sized after that frame.
pub struct OpenCvVideoWriter {
    path: PathBuf,
    fps: f64,
    writer: Option<videoio::VideoWriter>,
}

impl OpenCvVideoWriter {
    /// Falls back to 30 FPS when `fps` is not positive.
    pub fn new(path: impl Into<PathBuf>, fps: f64) -> Self {
        let fps = if fps > 0.0 { fps } else { 30.0 };
        Self {
            path: path.into(),
            fps,
            writer: None,
        }
    }

    fn open(&self, frame: &Mat) -> Result<videoio::VideoWriter, DetkitError> {
        let size = frame.size()?;
        let fourcc = videoio::VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer =
            videoio::VideoWriter::new(path_str(&self.path)?, fourcc, self.fps, size, true)?;
        if !writer.is_opened()? {
            return Err(DetkitError::VideoOpen(self.path.clone()));
        }
        info!(
            "Writing annotated video to {} ({}x{}, {:.2} FPS)",
            self.path.display(),
            size.width,
            size.height,
            self.fps
        );
        Ok(writer)
    }
}

impl FrameSink<Mat> for OpenCvVideoWriter {
    fn write_frame(&mut self, frame: &Mat) -> Result<(), DetkitError> {
        if self.writer.is_none() {
            self.writer = Some(self.open(frame)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write(frame)?;
        }
        Ok(())
    }
}

impl Drop for OpenCvVideoWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.release() {
                warn!("Failed to finalize {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Live preview window; `q` quits.
pub struct HighGuiDisplay {
    window: String,
}

impl HighGuiDisplay {
    pub fn new(window: impl Into<String>) -> Self {
        Self {
            window: window.into(),
        }
    }
}

impl FrameDisplay<Mat> for HighGuiDisplay {
    fn show(&mut self, frame: &Mat) -> Result<DisplayEvent, DetkitError> {
        highgui::imshow(&self.window, frame)?;
        let key = highgui::wait_key(1)?;
        if key & 0xFF == i32::from(b'q') {
            return Ok(DisplayEvent::Quit);
        }
        Ok(DisplayEvent::Continue)
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}

/// YOLOv8 ONNX model run through `opencv::dnn`.
pub struct OnnxDetector {
    net: dnn::Net,
    class_names: Vec<String>,
    conf_threshold: f32,
    iou_threshold: f32,
}

impl OnnxDetector {
    pub fn load(
        model: &Path,
        class_names: Vec<String>,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Self, DetkitError> {
        let net = dnn::read_net_from_onnx(path_str(model)?)?;
        if net.empty()? {
            return Err(DetkitError::Detector(format!(
                "no network could be loaded from {}",
                model.display()
            )));
        }
        info!("Loaded model {}", model.display());
        Ok(Self {
            net,
            class_names,
            conf_threshold,
            iou_threshold,
        })
    }
}

impl Detector<Mat> for OnnxDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<Detection>, DetkitError> {
        let blob = dnn::blob_from_image(
            frame,
            1.0 / 255.0,
            Size::new(INPUT_SIZE, INPUT_SIZE),
            Scalar::default(),
            true,
            false,
            core::CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;

        let mat_size = output.mat_size();
        let dims: &[i32] = &mat_size;
        if dims.len() != 3 || dims[1] <= 4 {
            return Err(DetkitError::Detector(format!(
                "unexpected output shape {dims:?}; expected [1, 4 + classes, candidates]"
            )));
        }
        let num_classes = (dims[1] - 4) as usize;

        let size = frame.size()?;
        let scale = (
            size.width as f32 / INPUT_SIZE as f32,
            size.height as f32 / INPUT_SIZE as f32,
        );

        let candidates = decode_yolov8(
            output.data_typed::<f32>()?,
            num_classes,
            scale,
            self.conf_threshold,
        )?;
        let detections = non_max_suppression(candidates, self.iou_threshold);
        debug!("{} detection(s) after NMS", detections.len());
        Ok(detections)
    }

    fn class_name(&self, class_index: usize) -> String {
        self.class_names
            .get(class_index)
            .cloned()
            .unwrap_or_else(|| format!("class{class_index}"))
    }
}
