//! OpenCV-backed video collaborators.

use crate::batch::VideoBackend;
use crate::canvas::{clip_segment, disc_visible, max_stroke, Canvas};
use crate::detector::ReplayDetector;
use crate::error::BoxError;
use crate::geometry::{Color, Point};
use crate::video::{FrameSink, FrameSource};

use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio,
};
use std::path::{Path, PathBuf};
use tracing::warn;

#[inline]
fn not_opened(what: &str, path: &Path) -> opencv::Error {
    opencv::Error::new(
        core::StsError,
        format!("unable to open {} {}", what, path.display()),
    )
}

/// BGR order, as OpenCV frames are stored.
#[inline]
fn scalar(c: Color) -> core::Scalar {
    core::Scalar::new(c.b as f64, c.g as f64, c.r as f64, 0.0)
}

#[inline]
fn cv_point(p: Point) -> core::Point {
    core::Point::new(p.x, p.y)
}

impl Canvas for Mat {
    type Error = opencv::Error;

    #[inline]
    fn dims(&self) -> (u32, u32) {
        (self.cols().max(0) as u32, self.rows().max(0) as u32)
    }

    fn draw_segment(
        &mut self,
        from: Point,
        to: Point,
        color: Color,
        thickness: u32,
    ) -> opencv::Result<()> {
        let dims = self.dims();
        let thickness = thickness.clamp(1, max_stroke(dims));

        let ((x0, y0), (x1, y1)) = match clip_segment(from, to, dims, thickness as f64 + 1.0) {
            Some(seg) => seg,
            None => return Ok(()),
        };

        imgproc::line(
            self,
            core::Point::new(x0.round() as i32, y0.round() as i32),
            core::Point::new(x1.round() as i32, y1.round() as i32),
            scalar(color),
            thickness as i32,
            imgproc::LINE_8,
            0,
        )
    }

    fn draw_disc(&mut self, center: Point, radius: u32, color: Color) -> opencv::Result<()> {
        let dims = self.dims();
        let radius = radius.min(max_stroke(dims));

        if !disc_visible(center, radius, dims) {
            return Ok(());
        }

        imgproc::circle(
            self,
            cv_point(center),
            radius as i32,
            scalar(color),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )
    }
}

pub struct VideoSource {
    cam: videoio::VideoCapture,
    fps: Option<f64>,
}

impl VideoSource {
    pub fn open<P: AsRef<Path>>(path: P) -> opencv::Result<Self> {
        let path = path.as_ref();
        let cam = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)?;

        if !videoio::VideoCapture::is_opened(&cam)? {
            return Err(not_opened("video", path));
        }

        let fps = cam.get(videoio::CAP_PROP_FPS).ok();

        Ok(Self { cam, fps })
    }
}

impl FrameSource for VideoSource {
    type Frame = Mat;
    type Error = opencv::Error;

    #[inline]
    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn read(&mut self) -> opencv::Result<Option<Mat>> {
        let mut frame = Mat::default();

        if !self.cam.read(&mut frame)? {
            return Ok(None);
        }

        if frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }

    fn release(&mut self) {
        if let Err(err) = self.cam.release() {
            warn!(error = %err, "video capture release failed");
        }
    }
}

/// Encoder that opens its output file only once the frame size is known.
pub struct VideoWriter {
    writer: Option<videoio::VideoWriter>,
    out_file: PathBuf,
}

impl VideoWriter {
    pub fn new<P: Into<PathBuf>>(out_file: P) -> Self {
        Self {
            writer: None,
            out_file: out_file.into(),
        }
    }
}

impl FrameSink<Mat> for VideoWriter {
    type Error = opencv::Error;

    fn init(&mut self, width: u32, height: u32, fps: f64) -> opencv::Result<()> {
        self.release();

        let writer = videoio::VideoWriter::new(
            &self.out_file.to_string_lossy(),
            videoio::VideoWriter::fourcc(b'm' as _, b'p' as _, b'4' as _, b'v' as _)?,
            fps,
            core::Size::new(width as i32, height as i32),
            true,
        )?;

        if !writer.is_opened()? {
            return Err(not_opened("writer for", &self.out_file));
        }

        self.writer = Some(writer);
        Ok(())
    }

    fn write(&mut self, frame: &Mat) -> opencv::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(frame),
            None => Err(opencv::Error::new(
                core::StsError,
                "frame written before writer init".to_string(),
            )),
        }
    }

    fn release(&mut self) {
        if let Some(mut w) = self.writer.take() {
            if let Err(err) = w.release() {
                warn!(error = %err, path = %self.out_file.display(), "video writer release failed");
            }
        }
    }
}

/// Reads videos with OpenCV and replays `<dumps>/<stem>.dets` detector
/// output for each of them.
pub struct OpenCvBackend {
    dumps_dir: PathBuf,
}

impl OpenCvBackend {
    pub fn new<P: Into<PathBuf>>(dumps_dir: P) -> Self {
        Self {
            dumps_dir: dumps_dir.into(),
        }
    }

    pub fn dump_path(&self, input: &Path) -> PathBuf {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();

        self.dumps_dir.join(format!("{}.dets", stem))
    }
}

impl VideoBackend for OpenCvBackend {
    type Frame = Mat;
    type Source = VideoSource;
    type Sink = VideoWriter;
    type Detector = ReplayDetector;

    fn open_source(&mut self, path: &Path) -> Result<VideoSource, BoxError> {
        Ok(VideoSource::open(path)?)
    }

    fn create_sink(&mut self, path: &Path) -> VideoWriter {
        VideoWriter::new(path)
    }

    fn detector(&mut self, input: &Path) -> Result<ReplayDetector, BoxError> {
        Ok(ReplayDetector::open(self.dump_path(input))?)
    }
}
