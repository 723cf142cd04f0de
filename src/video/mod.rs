//! Video annotation: detect, draw, show/write, frame by frame.
//!
//! Decoding, inference, encoding and windowing sit behind small traits so the
//! loop in [`annotate_video`] does not care where frames come from. The
//! OpenCV implementations live in `opencv_backend` (cargo feature `opencv`).

pub mod postprocess;

#[cfg(feature = "opencv")]
pub mod opencv_backend;

use std::fs;
use std::path::Path;
use std::time::Instant;

use log::{debug, info};

use crate::error::DetkitError;
use crate::ir::{BBoxXYXY, Pixel};

/// BGR color, the channel order OpenCV frames use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Color {
    pub const fn bgr(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }
}

pub const BOX_COLOR: Color = Color::bgr(0, 255, 0);
pub const LABEL_COLOR: Color = Color::bgr(0, 255, 255);
pub const FPS_COLOR: Color = Color::bgr(255, 0, 0);

pub const BOX_THICKNESS: i32 = 2;
pub const TEXT_THICKNESS: i32 = 2;
pub const LABEL_SCALE: f64 = 0.6;
pub const FPS_SCALE: f64 = 0.8;
/// Where the frame-rate text starts.
pub const FPS_ORIGIN: (i32, i32) = (10, 30);
/// Vertical gap between a box's top edge and its label baseline.
pub const LABEL_OFFSET: i32 = 10;

/// Integer pixel rectangle as drawn on a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    /// Truncates each corner toward zero.
    pub fn from_bbox(bbox: &BBoxXYXY<Pixel>) -> Self {
        Self {
            x1: bbox.xmin() as i32,
            y1: bbox.ymin() as i32,
            x2: bbox.xmax() as i32,
            y2: bbox.ymax() as i32,
        }
    }
}

/// A frame that can be drawn on.
pub trait Canvas {
    fn draw_rect(&mut self, rect: Rect, color: Color, thickness: i32) -> Result<(), DetkitError>;

    fn draw_text(
        &mut self,
        text: &str,
        origin: (i32, i32),
        scale: f64,
        color: Color,
        thickness: i32,
    ) -> Result<(), DetkitError>;
}

/// A stream of decoded frames.
pub trait FrameSource {
    type Frame;

    /// Returns `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, DetkitError>;
}

/// An object detector over frames of type `F`.
pub trait Detector<F> {
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, DetkitError>;

    fn class_name(&self, class_index: usize) -> String;
}

/// Receives annotated frames, e.g. a video file writer.
pub trait FrameSink<F> {
    fn write_frame(&mut self, frame: &F) -> Result<(), DetkitError>;
}

/// Shows annotated frames and reports whether the user asked to stop.
pub trait FrameDisplay<F> {
    fn show(&mut self, frame: &F) -> Result<DisplayEvent, DetkitError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Continue,
    Quit,
}

/// One detector output.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBoxXYXY<Pixel>,
    pub class_index: usize,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BBoxXYXY<Pixel>, class_index: usize, confidence: f32) -> Self {
        Self {
            bbox,
            class_index,
            confidence,
        }
    }
}

/// Instantaneous frame rate from the time between two ticks.
#[derive(Debug)]
pub struct FpsMeter {
    prev: Instant,
}

impl FpsMeter {
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { prev: start }
    }

    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// Frames per second since the previous tick; `0.0` when no time passed.
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.prev).as_secs_f64();
        self.prev = now;
        if elapsed > 0.0 {
            1.0 / elapsed
        } else {
            0.0
        }
    }
}

/// What an annotation run did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotateSummary {
    pub frames: u64,
    pub detections: u64,
    pub stopped_by_user: bool,
    /// Frames over wall-clock time for the whole run.
    pub mean_fps: f64,
}

impl AnnotateSummary {
    pub fn log_summary(&self) {
        info!("=== Annotation Summary ===");
        info!(
            "Processed {} frame(s), {} detection(s), {:.2} FPS on average",
            self.frames, self.detections, self.mean_fps
        );
        if self.stopped_by_user {
            info!("Stopped by user");
        }
    }
}

/// Reads class names, one per line. Blank lines and `#` comments are
/// skipped.
pub fn read_class_names(path: &Path) -> Result<Vec<String>, DetkitError> {
    let content = fs::read_to_string(path).map_err(DetkitError::Io)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Label drawn above a detection box.
pub fn detection_label(class_name: &str, confidence: f32) -> String {
    format!("{class_name} {confidence:.2}")
}

pub fn fps_label(fps: f64) -> String {
    format!("FPS: {fps:.2}")
}

/// Draws one detection: box plus `"<name> <conf>"` above its top-left corner.
pub fn draw_detection<C: Canvas>(
    canvas: &mut C,
    detection: &Detection,
    class_name: &str,
) -> Result<(), DetkitError> {
    let rect = Rect::from_bbox(&detection.bbox);
    canvas.draw_rect(rect, BOX_COLOR, BOX_THICKNESS)?;
    canvas.draw_text(
        &detection_label(class_name, detection.confidence),
        (rect.x1, rect.y1 - LABEL_OFFSET),
        LABEL_SCALE,
        LABEL_COLOR,
        TEXT_THICKNESS,
    )
}

pub fn draw_fps<C: Canvas>(canvas: &mut C, fps: f64) -> Result<(), DetkitError> {
    canvas.draw_text(
        &fps_label(fps),
        FPS_ORIGIN,
        FPS_SCALE,
        FPS_COLOR,
        TEXT_THICKNESS,
    )
}

/// Runs the detect-draw-output loop until the source ends or the display
/// returns [`DisplayEvent::Quit`].
///
/// Errors from any collaborator stop the loop and are returned as-is.
pub fn annotate_video<S, D>(
    source: &mut S,
    detector: &mut D,
    mut sink: Option<&mut dyn FrameSink<S::Frame>>,
    mut display: Option<&mut dyn FrameDisplay<S::Frame>>,
) -> Result<AnnotateSummary, DetkitError>
where
    S: FrameSource,
    S::Frame: Canvas,
    D: Detector<S::Frame>,
{
    let started = Instant::now();
    let mut meter = FpsMeter::starting_at(started);
    let mut summary = AnnotateSummary::default();

    while let Some(mut frame) = source.next_frame()? {
        let detections = detector.detect(&frame)?;
        for detection in &detections {
            let name = detector.class_name(detection.class_index);
            draw_detection(&mut frame, detection, &name)?;
        }

        let fps = meter.tick();
        draw_fps(&mut frame, fps)?;

        summary.frames += 1;
        summary.detections += detections.len() as u64;
        debug!(
            "Frame {}: {} detection(s), {:.2} FPS",
            summary.frames,
            detections.len(),
            fps
        );

        if let Some(sink) = sink.as_mut() {
            sink.write_frame(&frame)?;
        }

        if let Some(display) = display.as_mut() {
            if display.show(&frame)? == DisplayEvent::Quit {
                summary.stopped_by_user = true;
                break;
            }
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        summary.mean_fps = summary.frames as f64 / elapsed;
    }
    Ok(summary)
}
