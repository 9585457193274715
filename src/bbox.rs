use serde::{Deserialize, Serialize};
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq>(
    [f32; 4],
    PhantomData<F>,
);

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

/// The `(x1, y1, x2, y2)` box the detector hands back and the record log stores.
pub type BoundingBox = BBox<Ltrb>;

impl BBox<Ltrb> {
    /// Builds a box from its corners, swapping them if they arrive reversed
    /// so that `x1 <= x2` and `y1 <= y2` always hold.
    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox(
            [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
            Default::default(),
        )
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_xywh(&self) -> BBox<Xywh> {
        self.into()
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        BBox([cx, cy, w.abs(), h.abs()], Default::default())
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        let (hw, hh) = (v.0[2] / 2.0, v.0[3] / 2.0);

        Self(
            [v.0[0] - hw, v.0[1] - hh, v.0[0] + hw, v.0[1] + hh],
            Default::default(),
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xywh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        let (w, h) = (v.0[2] - v.0[0], v.0[3] - v.0[1]);

        Self(
            [v.0[0] + w / 2.0, v.0[1] + h / 2.0, w, h],
            Default::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ltrb_normalizes_reversed_corners() {
        let b = BBox::ltrb(20.0, 30.0, 10.0, 5.0);
        assert_eq!(b.as_slice(), &[10.0, 5.0, 20.0, 30.0]);
    }

    #[test]
    fn center_format_converts_to_corners() {
        let b = BBox::xywh(15.0, 15.0, 10.0, 10.0).as_ltrb();
        assert_eq!(b.as_slice(), &[10.0, 10.0, 20.0, 20.0]);

        let back = b.as_xywh();
        assert_eq!(back.cx(), 15.0);
        assert_eq!(back.width(), 10.0);
    }
}
