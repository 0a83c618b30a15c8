//! Straight line segments.

use crate::segment::Curve;
use crate::utils::towards;
use crate::{point, Box2D, Matrix, Point};

/// A line segment from `start` to `end`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Line {
        Line { start, end }
    }

    /// Sample the segment at t (expecting t between 0 and 1).
    #[inline]
    pub fn sample(&self, t: f64) -> Point {
        towards(self.start, self.end, t)
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.end - self.start).length()
    }

    pub fn bounding_box(&self) -> Box2D {
        Box2D {
            min: point(
                self.start.x.min(self.end.x),
                self.start.y.min(self.end.y),
            ),
            max: point(
                self.start.x.max(self.end.x),
                self.start.y.max(self.end.y),
            ),
        }
    }

    /// Swap the direction of the segment.
    pub fn flip(&self) -> Line {
        Line::new(self.end, self.start)
    }

    pub fn transform(&mut self, m: &Matrix) {
        self.start = m.transform_point(self.start);
        self.end = m.transform_point(self.end);
    }

    /// Closest point on the segment to `p`, clamped to the segment range.
    pub fn closest_point(&self, p: Point) -> Point {
        let v = self.end - self.start;
        let len_sq = v.square_length();
        if len_sq == 0.0 {
            return self.start;
        }
        let t = ((p - self.start).dot(v) / len_sq).clamp(0.0, 1.0);
        self.sample(t)
    }
}

impl Curve for Line {
    fn start(&self) -> Point {
        self.start
    }
    fn end(&self) -> Point {
        self.end
    }
    fn sample(&self, t: f64) -> Point {
        self.sample(t)
    }
}
