use crate::bbox::BoundingBox;
use crate::canvas::Canvas;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Integer pixel coordinate of a tracked position.
pub type Point = na::Point2<i32>;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const YELLOW: Color = Color::new(255, 255, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub const DEFAULT_TRAIL_THICKNESS: u32 = 2;
pub const DEFAULT_MARKER_RADIUS: u32 = 5;

/// How the trail and the current position are painted onto a frame.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default)]
pub struct TrailStyle {
    pub trail_color: Color,
    pub trail_thickness: u32,
    pub marker_color: Color,
    pub marker_radius: u32,
    /// detected boxes that were not selected for the trail
    pub candidate_color: Color,
}

impl Default for TrailStyle {
    fn default() -> Self {
        Self {
            trail_color: Color::GREEN,
            trail_thickness: DEFAULT_TRAIL_THICKNESS,
            marker_color: Color::RED,
            marker_radius: DEFAULT_MARKER_RADIUS,
            candidate_color: Color::YELLOW,
        }
    }
}

/// Midpoint of the box diagonal, truncated toward zero.
#[inline]
pub fn centroid(bbox: &BoundingBox) -> Point {
    let cx = (bbox.left() + bbox.right()) / 2.0;
    let cy = (bbox.top() + bbox.bottom()) / 2.0;

    Point::new(cx as i32, cy as i32)
}

/// Connects consecutive points with line segments, oldest to newest.
/// Fewer than two points draw nothing.
pub fn render_trail<C: Canvas>(
    frame: &mut C,
    points: &[Point],
    style: &TrailStyle,
) -> Result<(), C::Error> {
    for pair in points.windows(2) {
        frame.draw_segment(pair[0], pair[1], style.trail_color, style.trail_thickness)?;
    }

    Ok(())
}

/// Puts a disc on every detected centre. The `selected` one is painted
/// last in the marker color so overlapping candidates never hide it.
pub fn mark_detections<C: Canvas>(
    frame: &mut C,
    centers: &[Point],
    selected: Option<usize>,
    style: &TrailStyle,
) -> Result<(), C::Error> {
    for (idx, &pt) in centers.iter().enumerate() {
        if Some(idx) != selected {
            frame.draw_disc(pt, style.marker_radius, style.candidate_color)?;
        }
    }

    if let Some(&pt) = selected.and_then(|idx| centers.get(idx)) {
        frame.draw_disc(pt, style.marker_radius, style.marker_color)?;
    }

    Ok(())
}
