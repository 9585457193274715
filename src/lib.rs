pub mod batch;
pub mod bbox;
pub mod canvas;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod record;
pub mod trajectory;
pub mod video;

#[cfg(feature = "opencv")]
pub mod cv;

mod circular_queue;

pub use bbox::BoundingBox;
pub use canvas::Canvas;
pub use config::AnnotatorConfig;
pub use detection::{Detection, SelectionPolicy};
pub use detector::Detector;
pub use error::{Error, PipelineError};
pub use geometry::{centroid, render_trail, Point};
pub use pipeline::{run, Pipeline, PipelineConfig, RunStats};
pub use record::{DetectionRecord, RecordSink};
pub use trajectory::Trajectory;
pub use video::{FrameSink, FrameSource};
