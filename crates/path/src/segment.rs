//! The path segment sum type.
//!
//! The curve maths live in `kerf_geom`; this module adds the two segments
//! that only make sense inside a path — [`Move`] (a pen lift) and [`Close`]
//! (the stroke back to the subpath origin) — and the [`PathSegment`] enum
//! dispatching over all six.

use kerf_geom::utils::point_eq;
use kerf_geom::{
    point, segment_length_default, Box2D, CubicBezier, Curve, EllipticalArc, Line, Matrix,
    Point, QuadraticBezier,
};

/// A pen lift to `end`.
///
/// `start` is `None` only for the very first segment of a path, before any
/// pen position exists.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Move {
    pub start: Option<Point>,
    pub end: Point,
}

impl Move {
    pub fn new(start: Option<Point>, end: Point) -> Move {
        Move { start, end }
    }
}

/// The closing stroke of a subpath, drawn from `start` back to `end` (the
/// subpath origin).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Close {
    pub start: Point,
    pub end: Point,
}

impl Close {
    pub fn new(start: Point, end: Point) -> Close {
        Close { start, end }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.end - self.start).length()
    }
}

/// One drawing command of a path.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum PathSegment {
    Move(Move),
    Line(Line),
    Quadratic(QuadraticBezier),
    Cubic(CubicBezier),
    Arc(EllipticalArc),
    Close(Close),
}

impl PathSegment {
    /// Start point; `None` only for a leading Move.
    pub fn start(&self) -> Option<Point> {
        match self {
            PathSegment::Move(s) => s.start,
            PathSegment::Line(s) => Some(s.start),
            PathSegment::Quadratic(s) => Some(s.start),
            PathSegment::Cubic(s) => Some(s.start),
            PathSegment::Arc(s) => Some(s.start),
            PathSegment::Close(s) => Some(s.start),
        }
    }

    pub fn end(&self) -> Point {
        match self {
            PathSegment::Move(s) => s.end,
            PathSegment::Line(s) => s.end,
            PathSegment::Quadratic(s) => s.end,
            PathSegment::Cubic(s) => s.end,
            PathSegment::Arc(s) => s.end,
            PathSegment::Close(s) => s.end,
        }
    }

    pub fn set_start(&mut self, p: Point) {
        match self {
            PathSegment::Move(s) => s.start = Some(p),
            PathSegment::Line(s) => s.start = p,
            PathSegment::Quadratic(s) => s.start = p,
            PathSegment::Cubic(s) => s.start = p,
            PathSegment::Arc(s) => s.start = p,
            PathSegment::Close(s) => s.start = p,
        }
    }

    pub fn set_end(&mut self, p: Point) {
        match self {
            PathSegment::Move(s) => s.end = p,
            PathSegment::Line(s) => s.end = p,
            PathSegment::Quadratic(s) => s.end = p,
            PathSegment::Cubic(s) => s.end = p,
            PathSegment::Arc(s) => s.end = p,
            PathSegment::Close(s) => s.end = p,
        }
    }

    #[inline]
    pub fn is_move(&self) -> bool {
        matches!(self, PathSegment::Move(_))
    }

    #[inline]
    pub fn is_close(&self) -> bool {
        matches!(self, PathSegment::Close(_))
    }

    /// True for segments drawn with the pen down.
    #[inline]
    pub fn is_drawn(&self) -> bool {
        !self.is_move()
    }

    /// Point at parameter. Move and Close report their `end`.
    pub fn sample(&self, t: f64) -> Point {
        match self {
            PathSegment::Move(s) => s.end,
            PathSegment::Close(s) => s.end,
            PathSegment::Line(s) => s.sample(t),
            PathSegment::Quadratic(s) => s.sample(t),
            PathSegment::Cubic(s) => s.sample(t),
            PathSegment::Arc(s) => s.sample(t),
        }
    }

    /// Drawn length; a Move contributes nothing.
    pub fn length(&self) -> f64 {
        match self {
            PathSegment::Move(_) => 0.0,
            PathSegment::Close(s) => s.length(),
            PathSegment::Line(s) => s.length(),
            PathSegment::Quadratic(s) => s.length(),
            PathSegment::Cubic(s) => s.length(),
            PathSegment::Arc(s) => s.length(),
        }
    }

    pub fn length_with(&self, error: f64, min_depth: u32) -> f64 {
        match self {
            PathSegment::Cubic(s) => s.length_with(error, min_depth),
            PathSegment::Arc(s) => s.length_with(error, min_depth),
            _ => self.length(),
        }
    }

    pub fn bounding_box(&self) -> Box2D {
        match self {
            PathSegment::Move(s) => match s.start {
                Some(start) => endpoint_box(start, s.end),
                None => Box2D {
                    min: s.end,
                    max: s.end,
                },
            },
            PathSegment::Close(s) => endpoint_box(s.start, s.end),
            PathSegment::Line(s) => s.bounding_box(),
            PathSegment::Quadratic(s) => s.bounding_box(),
            PathSegment::Cubic(s) => s.bounding_box(),
            PathSegment::Arc(s) => s.bounding_box(),
        }
    }

    /// Applies a matrix to every stored point.
    pub fn transform(&mut self, m: &Matrix) {
        match self {
            PathSegment::Move(s) => {
                if let Some(start) = s.start {
                    s.start = Some(m.transform_point(start));
                }
                s.end = m.transform_point(s.end);
            }
            PathSegment::Close(s) => {
                s.start = m.transform_point(s.start);
                s.end = m.transform_point(s.end);
            }
            PathSegment::Line(s) => s.transform(m),
            PathSegment::Quadratic(s) => s.transform(m),
            PathSegment::Cubic(s) => s.transform(m),
            PathSegment::Arc(s) => s.transform(m),
        }
    }

    /// The same geometry walked in the opposite direction.
    ///
    /// Move and Close swap endpoints like the drawn segments do; the
    /// path-level reversal re-anchors them afterwards.
    pub fn reversed(&self) -> PathSegment {
        match self {
            PathSegment::Move(s) => PathSegment::Move(Move::new(Some(s.end), match s.start {
                Some(start) => start,
                None => s.end,
            })),
            PathSegment::Close(s) => PathSegment::Close(Close::new(s.end, s.start)),
            PathSegment::Line(s) => PathSegment::Line(s.flip()),
            PathSegment::Quadratic(s) => PathSegment::Quadratic(s.flip()),
            PathSegment::Cubic(s) => PathSegment::Cubic(s.flip()),
            PathSegment::Arc(s) => PathSegment::Arc(s.flip()),
        }
    }

    /// Connectivity check against the previous segment.
    pub fn connects_to(&self, previous: &PathSegment) -> bool {
        match self.start() {
            Some(start) => {
                (start.x - previous.end().x).abs() <= kerf_geom::GEOMETRY_EPSILON
                    && (start.y - previous.end().y).abs() <= kerf_geom::GEOMETRY_EPSILON
            }
            None => false,
        }
    }

    /// Equality within [`POINT_EPSILON`](kerf_geom::POINT_EPSILON) per point.
    pub fn approx_eq(&self, other: &PathSegment) -> bool {
        match (self, other) {
            (PathSegment::Move(a), PathSegment::Move(b)) => {
                let starts = match (a.start, b.start) {
                    (Some(sa), Some(sb)) => point_eq(sa, sb),
                    (None, None) => true,
                    _ => false,
                };
                starts && point_eq(a.end, b.end)
            }
            (PathSegment::Line(a), PathSegment::Line(b)) => {
                point_eq(a.start, b.start) && point_eq(a.end, b.end)
            }
            (PathSegment::Quadratic(a), PathSegment::Quadratic(b)) => {
                point_eq(a.start, b.start)
                    && point_eq(a.control, b.control)
                    && point_eq(a.end, b.end)
            }
            (PathSegment::Cubic(a), PathSegment::Cubic(b)) => {
                point_eq(a.start, b.start)
                    && point_eq(a.control1, b.control1)
                    && point_eq(a.control2, b.control2)
                    && point_eq(a.end, b.end)
            }
            (PathSegment::Arc(a), PathSegment::Arc(b)) => {
                point_eq(a.start, b.start)
                    && point_eq(a.end, b.end)
                    && point_eq(a.center, b.center)
                    && (a.sweep - b.sweep).abs() <= 1e-9
            }
            (PathSegment::Close(a), PathSegment::Close(b)) => {
                point_eq(a.start, b.start) && point_eq(a.end, b.end)
            }
            _ => false,
        }
    }
}

fn endpoint_box(a: Point, b: Point) -> Box2D {
    Box2D {
        min: point(a.x.min(b.x), a.y.min(b.y)),
        max: point(a.x.max(b.x), a.y.max(b.y)),
    }
}

impl From<Line> for PathSegment {
    fn from(s: Line) -> PathSegment {
        PathSegment::Line(s)
    }
}

impl From<QuadraticBezier> for PathSegment {
    fn from(s: QuadraticBezier) -> PathSegment {
        PathSegment::Quadratic(s)
    }
}

impl From<CubicBezier> for PathSegment {
    fn from(s: CubicBezier) -> PathSegment {
        PathSegment::Cubic(s)
    }
}

impl From<EllipticalArc> for PathSegment {
    fn from(s: EllipticalArc) -> PathSegment {
        PathSegment::Arc(s)
    }
}

// Keep the adaptive integrator usable on whole segments, e.g. for plot
// planning heuristics.
impl Curve for PathSegment {
    fn start(&self) -> Point {
        self.start().unwrap_or_else(|| self.end())
    }
    fn end(&self) -> Point {
        self.end()
    }
    fn sample(&self, t: f64) -> Point {
        self.sample(t)
    }
}

/// Length by flattening for segments without a better answer.
pub fn fallback_length(segment: &PathSegment) -> f64 {
    segment_length_default(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_lengths() {
        let line = PathSegment::Line(Line::new(point(0.0, 0.0), point(3.0, 4.0)));
        assert_eq!(line.start(), Some(point(0.0, 0.0)));
        assert_eq!(line.end(), point(3.0, 4.0));
        assert_eq!(line.length(), 5.0);

        let mv = PathSegment::Move(Move::new(None, point(7.0, 7.0)));
        assert_eq!(mv.start(), None);
        assert_eq!(mv.length(), 0.0);
        assert_eq!(mv.sample(0.3), point(7.0, 7.0));

        let close = PathSegment::Close(Close::new(point(10.0, 0.0), point(0.0, 0.0)));
        assert_eq!(close.length(), 10.0);
    }

    #[test]
    fn transform_applies_to_all_points() {
        let mut seg = PathSegment::Quadratic(QuadraticBezier::new(
            point(0.0, 0.0),
            point(5.0, 5.0),
            point(10.0, 0.0),
        ));
        seg.transform(&Matrix::translate(1.0, 2.0));
        match seg {
            PathSegment::Quadratic(q) => {
                assert_eq!(q.start, point(1.0, 2.0));
                assert_eq!(q.control, point(6.0, 7.0));
                assert_eq!(q.end, point(11.0, 2.0));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn reversal_swaps_direction() {
        let seg = PathSegment::Cubic(CubicBezier::new(
            point(0.0, 0.0),
            point(1.0, 1.0),
            point(2.0, 1.0),
            point(3.0, 0.0),
        ));
        let rev = seg.reversed();
        assert_eq!(rev.start(), Some(point(3.0, 0.0)));
        assert_eq!(rev.end(), point(0.0, 0.0));
    }
}
