use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config Error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Detection dump error at line {line}: {source}")]
    DetectionDump {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Why one video could not be (fully) processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot open source {}: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("source yielded no frames")]
    EmptySource,

    #[error("cannot set up detector for {}: {reason}", .path.display())]
    DetectorUnavailable { path: PathBuf, reason: String },

    #[error("detector failed on frame {frame}: {source}")]
    Detector {
        frame: u64,
        #[source]
        source: BoxError,
    },

    #[error("cannot initialize output sink ({width}x{height} @ {fps} fps): {source}")]
    SinkInit {
        width: u32,
        height: u32,
        fps: f64,
        #[source]
        source: BoxError,
    },

    #[error("cannot write frame {frame}: {source}")]
    SinkWrite {
        frame: u64,
        #[source]
        source: BoxError,
    },

    #[error("cannot render frame {frame}: {source}")]
    Render {
        frame: u64,
        #[source]
        source: BoxError,
    },

    #[error("cannot write detection records: {source}")]
    Records {
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Unreadable and empty sources skip the video; everything else is a
    /// failure of that video's processing.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::SourceUnavailable { .. } | PipelineError::EmptySource
        )
    }
}
