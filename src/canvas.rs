use crate::geometry::{Color, Point};

use image::{Rgb, RgbImage};
use imageproc::drawing;
use std::convert::Infallible;

/// A raster frame the pipeline can paint on.
pub trait Canvas {
    type Error: std::error::Error + Send + Sync + 'static;

    /// (width, height) in pixels
    fn dims(&self) -> (u32, u32);

    fn draw_segment(
        &mut self,
        from: Point,
        to: Point,
        color: Color,
        thickness: u32,
    ) -> Result<(), Self::Error>;

    fn draw_disc(&mut self, center: Point, radius: u32, color: Color) -> Result<(), Self::Error>;
}

impl From<Color> for Rgb<u8> {
    #[inline]
    fn from(c: Color) -> Self {
        Rgb([c.r, c.g, c.b])
    }
}

/// Clips the segment `from -> to` to the frame grown by `margin` on every
/// side (Liang-Barsky). Returns `None` when nothing of it is near the frame.
pub(crate) fn clip_segment(
    from: Point,
    to: Point,
    (width, height): (u32, u32),
    margin: f64,
) -> Option<((f64, f64), (f64, f64))> {
    let (x0, y0) = (from.x as f64, from.y as f64);
    let (dx, dy) = (to.x as f64 - x0, to.y as f64 - y0);
    let (xmax, ymax) = (width as f64 + margin, height as f64 + margin);

    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    for (p, q) in [
        (-dx, x0 + margin),
        (dx, xmax - x0),
        (-dy, y0 + margin),
        (dy, ymax - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
    }

    Some(((x0 + t0 * dx, y0 + t0 * dy), (x0 + t1 * dx, y0 + t1 * dy)))
}

/// Largest stroke worth drawing on a frame of the given size.
#[inline]
pub(crate) fn max_stroke((width, height): (u32, u32)) -> u32 {
    width.saturating_add(height).saturating_mul(2).saturating_add(1)
}

/// Whether a disc can touch the frame at all.
#[inline]
pub(crate) fn disc_visible(center: Point, radius: u32, (width, height): (u32, u32)) -> bool {
    let (x, y, r) = (center.x as i64, center.y as i64, radius as i64);

    x + r >= 0 && y + r >= 0 && x - r < width as i64 && y - r < height as i64
}

impl Canvas for RgbImage {
    type Error = Infallible;

    #[inline]
    fn dims(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn draw_segment(
        &mut self,
        from: Point,
        to: Point,
        color: Color,
        thickness: u32,
    ) -> Result<(), Self::Error> {
        let dims = self.dims();
        let thickness = thickness.clamp(1, max_stroke(dims)) as i64;

        let ((x0, y0), (x1, y1)) = match clip_segment(from, to, dims, thickness as f64 + 1.0) {
            Some(seg) => seg,
            None => return Ok(()),
        };
        let horizontalish = (x1 - x0).abs() >= (y1 - y0).abs();

        // thick lines are stacked 1px segments shifted across the minor axis
        for k in 0..thickness {
            let shift = (k - (thickness - 1) / 2) as f64;
            let (ox, oy) = if horizontalish { (0.0, shift) } else { (shift, 0.0) };

            drawing::draw_line_segment_mut(
                self,
                ((x0 + ox) as f32, (y0 + oy) as f32),
                ((x1 + ox) as f32, (y1 + oy) as f32),
                color.into(),
            );
        }

        Ok(())
    }

    fn draw_disc(&mut self, center: Point, radius: u32, color: Color) -> Result<(), Self::Error> {
        let dims = self.dims();
        let radius = radius.min(max_stroke(dims));

        if disc_visible(center, radius, dims) {
            drawing::draw_filled_circle_mut(self, (center.x, center.y), radius as i32, color.into());
        }

        Ok(())
    }
}
