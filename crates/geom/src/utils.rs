//! Point-level helpers shared across the workspace.

use crate::{point, Point, Vector, POINT_EPSILON};

/// Point equality within [`POINT_EPSILON`](crate::POINT_EPSILON).
#[inline]
pub fn point_eq(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() <= POINT_EPSILON && (a.y - b.y).abs() <= POINT_EPSILON
}

#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).length()
}

/// `atan2` of the vector `a → b`.
#[inline]
pub fn angle_between(a: Point, b: Point) -> f64 {
    (b.y - a.y).atan2(b.x - a.x)
}

/// Point at `angle` radians and distance `r` from `origin`.
#[inline]
pub fn polar(origin: Point, angle: f64, r: f64) -> Point {
    point(origin.x + r * angle.cos(), origin.y + r * angle.sin())
}

/// Linear interpolation from `a` towards `b`.
#[inline]
pub fn towards(a: Point, b: Point, t: f64) -> Point {
    point(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Reflection of `p` across the center `c`: `2c − p`.
#[inline]
pub fn reflected_across(p: Point, c: Point) -> Point {
    point(2.0 * c.x - p.x, 2.0 * c.y - p.y)
}

/// Angle between vectors, positive and in `[0, τ)`.
pub fn directed_angle(a: Vector, b: Vector) -> f64 {
    let angle = b.y.atan2(b.x) - a.y.atan2(a.x);
    if angle < 0.0 {
        angle + std::f64::consts::TAU
    } else {
        angle
    }
}

/// Turn direction of the triplet `(p, q, r)`.
///
/// Returns 0 when collinear, 1 for a clockwise turn, 2 for counterclockwise.
pub fn orientation(p: Point, q: Point, r: Point) -> u8 {
    let val = (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y);
    if val == 0.0 {
        0
    } else if val > 0.0 {
        1
    } else {
        2
    }
}

/// Convex hull by gift wrapping.
///
/// Quadratic, which is the right trade for the handful of control points this
/// gets called with. Returns the hull in traversal order; fewer than three
/// input points come back unchanged.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut hull = Vec::new();
    let start = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut p = start;
    loop {
        hull.push(points[p]);
        let mut q = (p + 1) % points.len();
        for (r, _) in points.iter().enumerate() {
            if orientation(points[p], points[r], points[q]) == 2 {
                q = r;
            }
        }
        p = q;
        if p == start || hull.len() > points.len() {
            break;
        }
    }
    hull
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_measures() {
        assert_eq!(distance(point(0.0, 0.0), point(3.0, 4.0)), 5.0);
        assert!((angle_between(point(0.0, 0.0), point(0.0, 2.0))
            - std::f64::consts::FRAC_PI_2)
            .abs()
            < 1e-12);
        let p = polar(point(1.0, 1.0), 0.0, 2.0);
        assert!(point_eq(p, point(3.0, 1.0)));
    }

    #[test]
    fn lerp_and_reflect() {
        assert_eq!(
            towards(point(0.0, 0.0), point(10.0, 20.0), 0.25),
            point(2.5, 5.0)
        );
        assert_eq!(
            reflected_across(point(1.0, 2.0), point(4.0, 4.0)),
            point(7.0, 6.0)
        );
    }

    #[test]
    fn orientation_cases() {
        assert_eq!(
            orientation(point(0.0, 0.0), point(1.0, 0.0), point(2.0, 0.0)),
            0
        );
        assert_eq!(
            orientation(point(0.0, 0.0), point(1.0, 0.0), point(1.0, 1.0)),
            2
        );
        assert_eq!(
            orientation(point(0.0, 0.0), point(1.0, 0.0), point(1.0, -1.0)),
            1
        );
    }

    #[test]
    fn hull_of_square_with_interior_point() {
        let pts = [
            point(0.0, 0.0),
            point(4.0, 0.0),
            point(4.0, 4.0),
            point(0.0, 4.0),
            point(2.0, 2.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.iter().any(|p| point_eq(*p, point(2.0, 2.0))));
    }
}
