use crate::batch::BatchConfig;
use crate::error::Error;
use crate::pipeline::PipelineConfig;

use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// Everything tunable, as read from a TOML file:
///
/// ```toml
/// [pipeline]
/// trail_length = 30
/// selection = "highest_confidence"
///
/// [pipeline.style]
/// marker_radius = 5
///
/// [batch]
/// input_dir = "input_videos"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AnnotatorConfig {
    pub pipeline: PipelineConfig,
    pub batch: BatchConfig,
}

impl AnnotatorConfig {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;

        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;

        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let p = &self.pipeline;

        if p.trail_length == 0 {
            return Err(Error::InvalidConfig("trail_length must be at least 1".into()));
        }

        for (name, fps) in [("fallback_fps", p.fallback_fps), ("max_fps", p.max_fps)] {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, fps
                )));
            }
        }

        if p.fallback_fps > p.max_fps {
            return Err(Error::InvalidConfig(format!(
                "fallback_fps ({}) exceeds max_fps ({})",
                p.fallback_fps, p.max_fps
            )));
        }

        let style = &p.style;
        for (name, size) in [
            ("trail_thickness", style.trail_thickness),
            ("marker_radius", style.marker_radius),
        ] {
            if size > i32::MAX as u32 {
                return Err(Error::InvalidConfig(format!(
                    "{} must not exceed {}, got {}",
                    name,
                    i32::MAX,
                    size
                )));
            }
        }

        if self.batch.extensions.is_empty() {
            return Err(Error::InvalidConfig("no input extensions configured".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SelectionPolicy;
    use crate::geometry::Color;
    use crate::pipeline::{DetectorErrorPolicy, RecordMode};
    use assert_matches::assert_matches;

    #[test]
    fn defaults_are_valid() {
        let config = AnnotatorConfig::default();
        config.validate().unwrap();

        assert_eq!(config.pipeline.trail_length, 30);
        assert_eq!(config.pipeline.fallback_fps, 30.0);
        assert_eq!(config.pipeline.max_fps, 120.0);
        assert_eq!(config.pipeline.style.marker_radius, 5);
        assert_eq!(config.batch.extensions, vec!["mp4", "mov"]);
    }

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(AnnotatorConfig::from_toml("").unwrap(), AnnotatorConfig::default());
    }

    #[test]
    fn partial_file_overrides_fields() {
        let config = AnnotatorConfig::from_toml(
            r#"
            [pipeline]
            trail_length = 12
            max_gap = 8
            selection = "last"
            records = "per_frame"
            on_detector_error = "skip_frame"

            [pipeline.style]
            trail_color = { r = 255, g = 255, b = 0 }

            [batch]
            results_dir = "out"
            "#,
        )
        .unwrap();

        let p = &config.pipeline;
        assert_eq!(p.trail_length, 12);
        assert_eq!(p.max_gap, Some(8));
        assert_eq!(p.selection, SelectionPolicy::Last);
        assert_eq!(p.records, RecordMode::PerFrame);
        assert_eq!(p.on_detector_error, DetectorErrorPolicy::SkipFrame);
        assert_eq!(p.style.trail_color, Color::new(255, 255, 0));
        assert_eq!(p.style.marker_color, Color::RED);
        assert_eq!(config.batch.results_dir, Path::new("out"));
        assert_eq!(config.batch.input_dir, Path::new("input_videos"));
    }

    #[test]
    fn rejects_zero_trail() {
        assert_matches!(
            AnnotatorConfig::from_toml("[pipeline]\ntrail_length = 0"),
            Err(Error::InvalidConfig(_))
        );
    }

    #[test]
    fn rejects_bad_rates() {
        assert_matches!(
            AnnotatorConfig::from_toml("[pipeline]\nfallback_fps = -1.0"),
            Err(Error::InvalidConfig(_))
        );
        assert_matches!(
            AnnotatorConfig::from_toml("[pipeline]\nfallback_fps = 200.0"),
            Err(Error::InvalidConfig(_))
        );
    }

    #[test]
    fn rejects_oversized_strokes() {
        assert_matches!(
            AnnotatorConfig::from_toml("[pipeline.style]\ntrail_thickness = 3000000000"),
            Err(Error::InvalidConfig(msg)) if msg.contains("trail_thickness")
        );
        assert_matches!(
            AnnotatorConfig::from_toml("[pipeline.style]\nmarker_radius = 2147483648"),
            Err(Error::InvalidConfig(msg)) if msg.contains("marker_radius")
        );
        AnnotatorConfig::from_toml("[pipeline.style]\nmarker_radius = 2147483647").unwrap();
    }

    #[test]
    fn rejects_unknown_policy() {
        assert_matches!(
            AnnotatorConfig::from_toml("[pipeline]\nselection = \"random\""),
            Err(Error::Config(_))
        );
    }
}
