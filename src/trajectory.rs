use crate::circular_queue::CircularQueue;
use crate::geometry::Point;

pub const DEFAULT_TRAIL_LENGTH: usize = 30;

/// Bounded history of recent object positions for one video.
///
/// A missed detection leaves the trail as it is, so short detector dropouts
/// do not break the drawn path. With `max_gap` set, the trail is cleared once
/// more than `max_gap` consecutive frames pass without a detection.
#[derive(Debug, Clone)]
pub struct Trajectory {
    points: CircularQueue<Point>,
    max_gap: Option<usize>,
    gap: usize,
}

impl Trajectory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: CircularQueue::with_capacity(capacity),
            max_gap: None,
            gap: 0,
        }
    }

    pub fn with_max_gap(capacity: usize, max_gap: Option<usize>) -> Self {
        Self {
            max_gap,
            ..Self::new(capacity)
        }
    }

    /// Feeds one frame's outcome and returns the trail, oldest point first.
    pub fn update(&mut self, detection: Option<Point>) -> &[Point] {
        match detection {
            Some(pt) => {
                self.gap = 0;
                self.points.push(pt);
            }
            None => {
                self.gap += 1;

                if let Some(max_gap) = self.max_gap {
                    if self.gap > max_gap && !self.points.is_empty() {
                        tracing::debug!(gap = self.gap, "trail cleared after gap");
                        self.points.clear();
                    }
                }
            }
        }

        self.points.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Consecutive frames since the last detection.
    #[inline]
    pub fn gap(&self) -> usize {
        self.gap
    }

    #[inline]
    pub fn last(&self) -> Option<Point> {
        self.points.newest().copied()
    }
}

impl Default for Trajectory {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_LENGTH)
    }
}
