use crate::canvas::Canvas;
use crate::config::AnnotatorConfig;
use crate::detector::Detector;
use crate::error::{BoxError, Error, PipelineError};
use crate::pipeline::{Pipeline, RunStats};
use crate::record::CsvRecordSink;
use crate::video::{FrameSink, FrameSource};

use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, info_span, warn};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub results_dir: PathBuf,
    pub annotations_dir: PathBuf,
    /// matched case-insensitively, without the dot
    pub extensions: Vec<String>,
    pub video_extension: String,
    pub output_suffix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input_videos"),
            results_dir: PathBuf::from("results"),
            annotations_dir: PathBuf::from("annotations"),
            extensions: vec!["mp4".into(), "mov".into()],
            video_extension: "mp4".into(),
            output_suffix: "_output".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub video: PathBuf,
    pub records: PathBuf,
}

impl BatchConfig {
    fn accepts(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Input videos, sorted by name.
    pub fn discover(&self) -> Result<Vec<PathBuf>, Error> {
        let mut videos = Vec::new();

        for entry in std::fs::read_dir(&self.input_dir)? {
            let path = entry?.path();

            if path.is_file() && self.accepts(&path) {
                videos.push(path);
            }
        }

        videos.sort();

        Ok(videos)
    }

    /// `<results>/<stem><suffix>.<ext>` and `<annotations>/<stem><suffix>.csv`
    pub fn output_paths(&self, input: &Path) -> OutputPaths {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = format!("{}{}", stem, self.output_suffix);

        OutputPaths {
            video: self
                .results_dir
                .join(format!("{}.{}", base, self.video_extension)),
            records: self.annotations_dir.join(format!("{}.csv", base)),
        }
    }
}

/// Opens the per-video collaborators for the batch driver.
pub trait VideoBackend {
    type Frame: Canvas;
    type Source: FrameSource<Frame = Self::Frame>;
    type Sink: FrameSink<Self::Frame>;
    type Detector: Detector<Self::Frame>;

    fn open_source(&mut self, path: &Path) -> Result<Self::Source, BoxError>;

    /// Must not touch the filesystem before `FrameSink::init`.
    fn create_sink(&mut self, path: &Path) -> Self::Sink;

    fn detector(&mut self, input: &Path) -> Result<Self::Detector, BoxError>;
}

#[derive(Debug)]
pub enum VideoOutcome {
    Completed(RunStats),
    /// unreadable or empty input, nothing was written
    Skipped(PipelineError),
    Failed(PipelineError),
}

impl From<Result<RunStats, PipelineError>> for VideoOutcome {
    fn from(res: Result<RunStats, PipelineError>) -> Self {
        match res {
            Ok(stats) => VideoOutcome::Completed(stats),
            Err(err) if err.is_recoverable() => VideoOutcome::Skipped(err),
            Err(err) => VideoOutcome::Failed(err),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub videos: Vec<(PathBuf, VideoOutcome)>,
}

impl BatchReport {
    fn count(&self, f: impl Fn(&VideoOutcome) -> bool) -> usize {
        self.videos.iter().filter(|(_, o)| f(o)).count()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Completed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, VideoOutcome::Failed(_)))
    }

    pub fn outcome(&self, input: &Path) -> Option<&VideoOutcome> {
        self.videos
            .iter()
            .find(|(path, _)| path == input)
            .map(|(_, outcome)| outcome)
    }
}

/// Runs the pipeline over one input video, writing its outputs to `paths`.
pub fn process_video<B: VideoBackend>(
    backend: &mut B,
    input: &Path,
    paths: &OutputPaths,
    config: &AnnotatorConfig,
) -> Result<RunStats, PipelineError> {
    let mut source = backend
        .open_source(input)
        .map_err(|err| PipelineError::SourceUnavailable {
            path: input.to_path_buf(),
            reason: err.to_string(),
        })?;

    let detector = match backend.detector(input) {
        Ok(detector) => detector,
        Err(err) => {
            source.release();
            return Err(PipelineError::DetectorUnavailable {
                path: input.to_path_buf(),
                reason: err.to_string(),
            });
        }
    };

    let sink = backend.create_sink(&paths.video);
    let mut records = CsvRecordSink::new(&paths.records);

    Pipeline::new(detector, config.pipeline.clone()).run(source, sink, &mut records)
}

/// Processes every discovered input in name order. A failing video is
/// logged and reported; it never stops the rest of the batch.
pub fn run_batch<B: VideoBackend>(
    config: &AnnotatorConfig,
    backend: &mut B,
) -> Result<BatchReport, Error> {
    let inputs = config.batch.discover()?;

    std::fs::create_dir_all(&config.batch.results_dir)?;
    std::fs::create_dir_all(&config.batch.annotations_dir)?;

    info!(count = inputs.len(), dir = %config.batch.input_dir.display(), "videos found");

    let mut report = BatchReport::default();

    for input in inputs {
        let span = info_span!("video", path = %input.display());
        let _guard = span.enter();

        let paths = config.batch.output_paths(&input);
        info!("processing");

        let outcome = VideoOutcome::from(process_video(backend, &input, &paths, config));

        match &outcome {
            VideoOutcome::Completed(stats) => info!(
                frames = stats.frames,
                detected = stats.detected_frames,
                records = stats.records,
                output = %paths.video.display(),
                "done"
            ),
            VideoOutcome::Skipped(err) => warn!(error = %err, "skipped"),
            VideoOutcome::Failed(err) => error!(error = %err, "failed"),
        }

        report.videos.push((input, outcome));
    }

    Ok(report)
}
