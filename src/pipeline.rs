use crate::canvas::Canvas;
use crate::detection::SelectionPolicy;
use crate::detector::Detector;
use crate::error::PipelineError;
use crate::geometry::{centroid, mark_detections, render_trail, Point, TrailStyle};
use crate::record::{DetectionRecord, RecordSink};
use crate::trajectory::{Trajectory, DEFAULT_TRAIL_LENGTH};
use crate::video::{resolve_fps, FrameSink, FrameSource, DEFAULT_FALLBACK_FPS, DEFAULT_MAX_FPS};

use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Which boxes of a frame end up in the record log.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// A row for every returned box; a frame may contribute several rows.
    #[default]
    PerDetection,
    /// Exactly one row per frame, for the selected box.
    PerFrame,
}

/// What a detector error does to the video being processed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectorErrorPolicy {
    /// Stop the video with `PipelineError::Detector`.
    #[default]
    Abort,
    /// Log it and treat the frame as having no detections.
    SkipFrame,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub trail_length: usize,
    pub max_gap: Option<usize>,
    pub selection: SelectionPolicy,
    pub records: RecordMode,
    pub on_detector_error: DetectorErrorPolicy,
    pub fallback_fps: f64,
    pub max_fps: f64,
    pub style: TrailStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trail_length: DEFAULT_TRAIL_LENGTH,
            max_gap: None,
            selection: SelectionPolicy::default(),
            records: RecordMode::default(),
            on_detector_error: DetectorErrorPolicy::default(),
            fallback_fps: DEFAULT_FALLBACK_FPS,
            max_fps: DEFAULT_MAX_FPS,
            style: TrailStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunStats {
    /// frames pulled from the source (and written to the sink)
    pub frames: u64,
    pub detected_frames: u64,
    pub records: usize,
    pub detector_errors: u64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Drives one video at a time through detection, tracking and rendering.
/// The detector is injected once and reused; every `run` starts with a
/// fresh trajectory and an empty record log.
pub struct Pipeline<D> {
    detector: D,
    config: PipelineConfig,
}

impl<D> Pipeline<D> {
    pub fn new(detector: D, config: PipelineConfig) -> Self {
        Self { detector, config }
    }

    /// Processes `source` to exhaustion. Source and sink are released on
    /// every path out of here; records are flushed only when the whole
    /// video went through.
    pub fn run<S, K, R>(
        &mut self,
        mut source: S,
        mut sink: K,
        records: &mut R,
    ) -> Result<RunStats, PipelineError>
    where
        S: FrameSource,
        S::Frame: Canvas,
        D: Detector<S::Frame>,
        K: FrameSink<S::Frame>,
        R: RecordSink,
    {
        let outcome = self.process(&mut source, &mut sink);

        source.release();
        sink.release();

        let (stats, log) = outcome?;

        records
            .write_records(&log)
            .map_err(|source| PipelineError::Records {
                source: source.into(),
            })?;

        Ok(stats)
    }

    fn process<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<(RunStats, Vec<DetectionRecord>), PipelineError>
    where
        S: FrameSource,
        S::Frame: Canvas,
        D: Detector<S::Frame>,
        K: FrameSink<S::Frame>,
    {
        let config = &self.config;
        let mut trajectory = Trajectory::with_max_gap(config.trail_length, config.max_gap);
        let mut log = Vec::new();
        let mut stats = RunStats::default();
        let mut index: u64 = 0;

        loop {
            let mut frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) if index == 0 => {
                    warn!(error = %err, "no frame read, video may be empty or corrupt");
                    return Err(PipelineError::EmptySource);
                }
                Err(err) => {
                    warn!(frame = index, error = %err, "read failed, ending stream early");
                    break;
                }
            };

            let dets = match self.detector.detect(&frame) {
                Ok(dets) => dets,
                Err(err) => match config.on_detector_error {
                    DetectorErrorPolicy::Abort => {
                        return Err(PipelineError::Detector {
                            frame: index,
                            source: err.into(),
                        });
                    }
                    DetectorErrorPolicy::SkipFrame => {
                        warn!(frame = index, error = %err, "detector failed, frame treated as empty");
                        stats.detector_errors += 1;
                        Vec::new()
                    }
                },
            };

            let selected = config.selection.select(&dets);

            match (selected, config.records) {
                (None, _) => log.push(DetectionRecord::missing(index)),
                (Some(_), RecordMode::PerDetection) => log.extend(
                    dets.iter()
                        .map(|det| DetectionRecord::detected(index, &det.bbox)),
                ),
                (Some(idx), RecordMode::PerFrame) => {
                    log.push(DetectionRecord::detected(index, &dets[idx].bbox))
                }
            }

            let centers: Vec<Point> = dets.iter().map(|det| centroid(&det.bbox)).collect();
            let point = selected.map(|idx| centers[idx]);
            if point.is_some() {
                stats.detected_frames += 1;
            }

            let trail = trajectory.update(point);

            render_trail(&mut frame, trail, &config.style)
                .and_then(|_| mark_detections(&mut frame, &centers, selected, &config.style))
                .map_err(|source| PipelineError::Render {
                    frame: index,
                    source: source.into(),
                })?;

            if index == 0 {
                let (width, height) = frame.dims();
                let reported = source.frame_rate();
                let fps = resolve_fps(reported, config.max_fps, config.fallback_fps);

                if reported != Some(fps) {
                    warn!(?reported, fallback = fps, "invalid source frame rate");
                }
                debug!(width, height, fps, "initializing output");

                sink.init(width, height, fps)
                    .map_err(|source| PipelineError::SinkInit {
                        width,
                        height,
                        fps,
                        source: source.into(),
                    })?;

                stats.width = width;
                stats.height = height;
                stats.fps = fps;
            }

            sink.write(&frame).map_err(|source| PipelineError::SinkWrite {
                frame: index,
                source: source.into(),
            })?;

            index += 1;
        }

        if index == 0 {
            warn!("no frame read, video may be empty or corrupt");
            return Err(PipelineError::EmptySource);
        }

        stats.frames = index;
        stats.records = log.len();

        Ok((stats, log))
    }
}

/// One-shot form of [`Pipeline::run`] for callers holding their own detector.
pub fn run<S, D, K, R>(
    source: S,
    detector: &mut D,
    sink: K,
    records: &mut R,
    config: &PipelineConfig,
) -> Result<RunStats, PipelineError>
where
    S: FrameSource,
    S::Frame: Canvas,
    D: Detector<S::Frame>,
    K: FrameSink<S::Frame>,
    R: RecordSink,
{
    Pipeline::new(detector, config.clone()).run(source, sink, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::detection::Detection;
    use crate::geometry::Point;
    use crate::video::{MemorySink, MemorySource};
    use assert_matches::assert_matches;
    use image::{Rgb, RgbImage};
    use std::convert::Infallible;

    /// Replays a fixed list of per-frame detections.
    struct Scripted(std::vec::IntoIter<Vec<Detection>>);

    impl Scripted {
        fn new(frames: Vec<Vec<Detection>>) -> Self {
            Self(frames.into_iter())
        }
    }

    impl Detector<RgbImage> for Scripted {
        type Error = Infallible;

        fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<Detection>, Infallible> {
            Ok(self.0.next().unwrap_or_default())
        }
    }

    fn frames(n: usize) -> Vec<RgbImage> {
        (0..n).map(|_| RgbImage::new(64, 48)).collect()
    }

    #[test]
    fn single_detection_scenario() {
        let mut pipeline = Pipeline::new(
            Scripted::new(vec![vec![Detection::ltrb(10.0, 10.0, 20.0, 20.0)]]),
            PipelineConfig::default(),
        );
        let mut sink = MemorySink::<RgbImage>::new();
        let mut log = Vec::new();

        let stats = pipeline
            .run(MemorySource::new(frames(1), Some(25.0)), &mut sink, &mut log)
            .unwrap();

        assert_eq!(
            log,
            vec![DetectionRecord {
                frame: 0,
                x1: 10.0,
                y1: 10.0,
                x2: 20.0,
                y2: 20.0,
                cx: 15,
                cy: 15,
                visibility: 1,
            }]
        );
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.detected_frames, 1);
        assert_eq!(sink.params, Some((64, 48, 25.0)));
        assert_eq!(*sink.frames[0].get_pixel(15, 15), Rgb([255, 0, 0]));
    }

    #[test]
    fn no_detection_scenario() {
        let mut pipeline = Pipeline::new(Scripted::new(vec![vec![]]), PipelineConfig::default());
        let mut sink = MemorySink::<RgbImage>::new();
        let mut log = Vec::new();

        pipeline
            .run(MemorySource::new(frames(1), None), &mut sink, &mut log)
            .unwrap();

        assert_eq!(log, vec![DetectionRecord::missing(0)]);
        assert_eq!(sink.frames.len(), 1);
        assert!(sink.frames[0].pixels().all(|p| *p == Rgb([0, 0, 0])));
        assert_eq!(sink.params, Some((64, 48, DEFAULT_FALLBACK_FPS)));
    }

    #[test]
    fn empty_source_initializes_nothing() {
        let mut pipeline = Pipeline::new(Scripted::new(vec![]), PipelineConfig::default());
        let mut sink = MemorySink::<RgbImage>::new();
        let mut log: Vec<DetectionRecord> = Vec::new();

        let source = MemorySource::new(Vec::<RgbImage>::new(), Some(30.0));
        assert_matches!(
            pipeline.run(source, &mut sink, &mut log),
            Err(PipelineError::EmptySource)
        );

        assert!(log.is_empty());
        assert!(sink.params.is_none());
        assert!(sink.frames.is_empty());
        assert!(sink.released);
    }

    #[test]
    fn trail_survives_gap_and_is_drawn() {
        let hit = |x: f32| vec![Detection::ltrb(x, 20.0, x + 4.0, 24.0)];
        let script = vec![hit(2.0), hit(20.0), vec![], vec![]];
        let mut pipeline = Pipeline::new(Scripted::new(script), PipelineConfig::default());
        let mut sink = MemorySink::<RgbImage>::new();
        let mut log = Vec::new();

        let stats = pipeline
            .run(MemorySource::new(frames(4), None), &mut sink, &mut log)
            .unwrap();

        assert_eq!(stats.detected_frames, 2);
        assert_eq!(
            log.iter().map(|r| r.visibility).collect::<Vec<_>>(),
            vec![1, 1, 0, 0]
        );

        // the segment from (4,22) to (22,22) is still painted on the gap frames
        let green = Rgb([0, 255, 0]);
        assert_eq!(*sink.frames[3].get_pixel(12, 22), green);
        assert_eq!(*sink.frames[0].get_pixel(12, 22), Rgb([0, 0, 0]));
    }

    #[test]
    fn per_frame_mode_logs_selected_box_only() {
        let script = vec![vec![
            Detection::new(BBox::ltrb(0.0, 0.0, 2.0, 2.0), 0.4),
            Detection::new(BBox::ltrb(10.0, 10.0, 12.0, 12.0), 0.9),
        ]];
        let config = PipelineConfig {
            records: RecordMode::PerFrame,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(Scripted::new(script), config);
        let mut log = Vec::new();

        pipeline
            .run(MemorySource::new(frames(1), None), MemorySink::<RgbImage>::new(), &mut log)
            .unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].centroid(), Point::new(11, 11));
    }

    #[test]
    fn per_detection_mode_logs_every_box() {
        let script = vec![
            vec![
                Detection::ltrb(0.0, 0.0, 2.0, 2.0),
                Detection::ltrb(10.0, 10.0, 12.0, 12.0),
            ],
            vec![],
        ];
        let mut pipeline = Pipeline::new(Scripted::new(script), PipelineConfig::default());
        let mut log = Vec::new();

        let stats = pipeline
            .run(MemorySource::new(frames(2), None), MemorySink::<RgbImage>::new(), &mut log)
            .unwrap();

        assert_eq!(stats.records, 3);
        assert_eq!(log.iter().map(|r| r.frame).collect::<Vec<_>>(), vec![0, 0, 1]);
    }
}
