//! Cubic bézier curve segments.

use arrayvec::ArrayVec;

use crate::quadratic_bezier::bounds_of;
use crate::segment::{segment_length, segment_length_default, Curve};
use crate::utils::point_eq;
use crate::{point, Box2D, Matrix, Point, Vector};

/// A cubic bézier curve from `start` to `end` through two control points.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct CubicBezier {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl CubicBezier {
    pub fn new(start: Point, control1: Point, control2: Point, end: Point) -> CubicBezier {
        CubicBezier {
            start,
            control1,
            control2,
            end,
        }
    }

    /// Sample the curve at t (expecting t between 0 and 1).
    pub fn sample(&self, t: f64) -> Point {
        let u = 1.0 - t;
        let w0 = u * u * u;
        let w1 = 3.0 * u * u * t;
        let w2 = 3.0 * u * t * t;
        let w3 = t * t * t;
        point(
            w0 * self.start.x + w1 * self.control1.x + w2 * self.control2.x + w3 * self.end.x,
            w0 * self.start.y + w1 * self.control1.y + w2 * self.control2.y + w3 * self.end.y,
        )
    }

    /// Sample the derivative at t.
    pub fn derivative(&self, t: f64) -> Vector {
        let u = 1.0 - t;
        (self.control1 - self.start) * (3.0 * u * u)
            + (self.control2 - self.control1) * (6.0 * u * t)
            + (self.end - self.control2) * (3.0 * t * t)
    }

    /// Arc length by adaptive subdivision.
    pub fn length(&self) -> f64 {
        segment_length_default(self)
    }

    /// Arc length with explicit tolerances.
    pub fn length_with(&self, error: f64, min_depth: u32) -> f64 {
        segment_length(self, 0.0, 1.0, error, min_depth)
    }

    /// Interior derivative roots along x, in `(0, 1)`.
    pub fn local_x_extrema(&self) -> ArrayVec<f64, 2> {
        derivative_roots(self.start.x, self.control1.x, self.control2.x, self.end.x)
    }

    /// Interior derivative roots along y, in `(0, 1)`.
    pub fn local_y_extrema(&self) -> ArrayVec<f64, 2> {
        derivative_roots(self.start.y, self.control1.y, self.control2.y, self.end.y)
    }

    pub fn bounding_box(&self) -> Box2D {
        let mut candidates: ArrayVec<Point, 6> = ArrayVec::new();
        candidates.push(self.start);
        candidates.push(self.end);
        for t in self.local_x_extrema() {
            candidates.push(self.sample(t));
        }
        for t in self.local_y_extrema() {
            candidates.push(self.sample(t));
        }
        bounds_of(&candidates)
    }

    /// Swap the direction of the segment.
    pub fn flip(&self) -> CubicBezier {
        CubicBezier::new(self.end, self.control2, self.control1, self.start)
    }

    pub fn transform(&mut self, m: &Matrix) {
        self.start = m.transform_point(self.start);
        self.control1 = m.transform_point(self.control1);
        self.control2 = m.transform_point(self.control2);
        self.end = m.transform_point(self.end);
    }

    /// True when this curve continues `previous` smoothly (`S` shorthand).
    pub fn is_smooth_from(&self, previous: &CubicBezier) -> bool {
        point_eq(self.start, previous.end)
            && point_eq(
                point(
                    self.control1.x - self.start.x,
                    self.control1.y - self.start.y,
                ),
                point(
                    previous.end.x - previous.control2.x,
                    previous.end.y - previous.control2.y,
                ),
            )
    }
}

/// Roots of the derivative `at² + bt + c` for one axis, clamped to `(0, 1)`.
fn derivative_roots(p0: f64, p1: f64, p2: f64, p3: f64) -> ArrayVec<f64, 2> {
    let mut roots = ArrayVec::new();
    let a = 3.0 * (-p0 + 3.0 * p1 - 3.0 * p2 + p3);
    let b = 6.0 * (p0 - 2.0 * p1 + p2);
    let c = 3.0 * (p1 - p0);

    let mut push = |t: f64| {
        if t > 0.0 && t < 1.0 {
            roots.push(t);
        }
    };

    if a.abs() < 1e-12 {
        if b.abs() > 1e-12 {
            push(-c / b);
        }
        return roots;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return roots;
    }
    let sq = disc.sqrt();
    push((-b + sq) / (2.0 * a));
    push((-b - sq) / (2.0 * a));
    roots
}

impl Curve for CubicBezier {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_endpoints() {
        let c = CubicBezier::new(
            point(0.0, 0.0),
            point(0.0, 10.0),
            point(10.0, 10.0),
            point(10.0, 0.0),
        );
        assert_eq!(c.sample(0.0), c.start);
        assert_eq!(c.sample(1.0), c.end);
    }

    #[test]
    fn straight_length() {
        let c = CubicBezier::new(
            point(0.0, 0.0),
            point(2.0, 0.0),
            point(7.0, 0.0),
            point(9.0, 0.0),
        );
        assert!((c.length() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn containment_property() {
        let c = CubicBezier::new(
            point(-5.0, 1.0),
            point(12.0, -7.0),
            point(-8.0, 11.0),
            point(6.0, 2.0),
        );
        let b = c.bounding_box();
        for i in 0..=200 {
            let p = c.sample(i as f64 / 200.0);
            assert!(p.x >= b.min.x - 1e-9 && p.x <= b.max.x + 1e-9);
            assert!(p.y >= b.min.y - 1e-9 && p.y <= b.max.y + 1e-9);
        }
    }

    #[test]
    fn extrema_of_arch() {
        let c = CubicBezier::new(
            point(0.0, 0.0),
            point(0.0, 10.0),
            point(10.0, 10.0),
            point(10.0, 0.0),
        );
        let ys = c.local_y_extrema();
        assert_eq!(ys.len(), 1);
        assert!((ys[0] - 0.5).abs() < 1e-9);
        assert!(c.local_x_extrema().is_empty());
    }

    #[test]
    fn smooth_continuation() {
        let a = CubicBezier::new(
            point(0.0, 0.0),
            point(10.0, 0.0),
            point(10.0, 10.0),
            point(20.0, 10.0),
        );
        let b = CubicBezier::new(
            point(20.0, 10.0),
            point(30.0, 10.0),
            point(30.0, 20.0),
            point(40.0, 20.0),
        );
        assert!(b.is_smooth_from(&a));
    }
}
