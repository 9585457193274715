use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, BoundingBox};

/// One box returned by the detector for a frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(from = "DumpedDetection", into = "DumpedDetection")]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class: i32,
}

/// Wire form of a detection in dump files: (x,y) of the center and
/// (width,height) of bbox
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
struct DumpedDetection {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    #[serde(rename = "p", default = "full_confidence")]
    confidence: f32,
    #[serde(rename = "c", default)]
    class: i32,
}

fn full_confidence() -> f32 {
    1.0
}

impl From<DumpedDetection> for Detection {
    fn from(d: DumpedDetection) -> Self {
        Self {
            bbox: BBox::xywh(d.x, d.y, d.w, d.h).as_ltrb(),
            confidence: d.confidence,
            class: d.class,
        }
    }
}

impl From<Detection> for DumpedDetection {
    fn from(d: Detection) -> Self {
        let c = d.bbox.as_xywh();

        Self {
            x: c.cx(),
            y: c.cy(),
            w: c.width(),
            h: c.height(),
            confidence: d.confidence,
            class: d.class,
        }
    }
}

impl Detection {
    #[inline]
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            class: 0,
        }
    }

    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(BBox::ltrb(x1, y1, x2, y2), 1.0)
    }
}

/// Which of a frame's detections becomes "the" object for the tracker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    First,
    Last,
    /// Ties go to the box the detector listed first.
    #[default]
    HighestConfidence,
}

impl SelectionPolicy {
    /// Index of the selected detection, `None` for an empty frame.
    pub fn select(&self, dets: &[Detection]) -> Option<usize> {
        if dets.is_empty() {
            return None;
        }

        match self {
            SelectionPolicy::First => Some(0),
            SelectionPolicy::Last => Some(dets.len() - 1),
            SelectionPolicy::HighestConfidence => {
                let mut best = 0;
                for (idx, det) in dets.iter().enumerate().skip(1) {
                    // NaN never wins
                    if det.confidence > dets[best].confidence {
                        best = idx;
                    }
                }
                Some(best)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, confidence: f32) -> Detection {
        Detection::new(BBox::ltrb(x, x, x + 4.0, x + 4.0), confidence)
    }

    #[test]
    fn empty_frame_selects_nothing() {
        for policy in [
            SelectionPolicy::First,
            SelectionPolicy::Last,
            SelectionPolicy::HighestConfidence,
        ] {
            assert_eq!(policy.select(&[]), None);
        }
    }

    #[test]
    fn policies_pick_expected_box() {
        let dets = [det(1.0, 0.3), det(2.0, 0.9), det(3.0, 0.9), det(4.0, 0.5)];

        assert_eq!(SelectionPolicy::First.select(&dets), Some(0));
        assert_eq!(SelectionPolicy::Last.select(&dets), Some(3));
        assert_eq!(SelectionPolicy::HighestConfidence.select(&dets), Some(1));
    }

    #[test]
    fn nan_confidence_is_ignored() {
        let dets = [det(1.0, 0.2), det(2.0, f32::NAN)];
        assert_eq!(SelectionPolicy::HighestConfidence.select(&dets), Some(0));
    }

    #[test]
    fn parses_dump_entry() {
        let d: Detection =
            serde_json::from_str(r#"{"x":5,"y":6,"w":2,"h":2,"p":0.7,"c":3}"#).unwrap();
        assert_eq!(d.class, 3);
        assert_eq!(d.confidence, 0.7);
        assert_eq!(d.bbox.as_slice(), &[4.0, 5.0, 6.0, 7.0]);

        let d: Detection = serde_json::from_str(r#"{"x":5,"y":6,"w":2,"h":2}"#).unwrap();
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn dumps_in_center_form() {
        let json = serde_json::to_string(&Detection::ltrb(10.0, 10.0, 20.0, 20.0)).unwrap();
        assert_eq!(json, r#"{"x":15.0,"y":15.0,"w":10.0,"h":10.0,"p":1.0,"c":0}"#);
    }

    #[test]
    fn parses_policy_names() {
        #[derive(serde_derive::Deserialize)]
        struct Wrap {
            policy: SelectionPolicy,
        }

        let w: Wrap = toml::from_str(r#"policy = "highest_confidence""#).unwrap();
        assert_eq!(w.policy, SelectionPolicy::HighestConfidence);
        let w: Wrap = toml::from_str(r#"policy = "last""#).unwrap();
        assert_eq!(w.policy, SelectionPolicy::Last);
    }
}
