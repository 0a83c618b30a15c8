//! Elliptic arc segments.
//!
//! Arcs are stored in center parameterization: `center`, the point `prx` at
//! ellipse parameter 0 (so `center → prx` is the x radius *and* the ellipse
//! rotation), the point `pry` at parameter τ/4, and a signed `sweep` in
//! radians. Keeping five points plus a scalar makes affine transformation
//! trivial — map the points, flip the sweep on a mirroring transform —
//! where the SVG endpoint parameterization would need a full re-derivation.

use std::f64::consts::{PI, TAU};

use arrayvec::ArrayVec;
use thiserror::Error;

use crate::quadratic_bezier::bounds_of;
use crate::segment::{segment_length, segment_length_default, Curve};
use crate::utils::{distance, point_eq};
use crate::{point, Angle, Box2D, CubicBezier, Matrix, Point, LENGTH_ERROR};

/// An arc whose stored points contradict each other — an implementation bug
/// upstream, not a user input error.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("Geometry invariant violated: {0}.")]
pub struct GeometryInvariant(pub String);

/// An elliptic arc from `start` to `end`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct EllipticalArc {
    pub start: Point,
    pub end: Point,
    pub center: Point,
    /// Point at ellipse parameter 0; `center → prx` spans the x radius.
    pub prx: Point,
    /// Point at ellipse parameter τ/4; `center → pry` spans the y radius.
    pub pry: Point,
    /// Signed sweep in radians. `|sweep| ≤ τ` is the expected range.
    pub sweep: f64,
}

/// The SVG endpoint form of an arc command.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SvgArcParameters {
    pub rx: f64,
    pub ry: f64,
    /// x-axis rotation in degrees, as written in path data.
    pub rotation: f64,
    pub large_arc: bool,
    pub sweep: bool,
    pub end: Point,
}

impl EllipticalArc {
    /// Builds an arc from the SVG endpoint parameterization (spec F.6.5).
    ///
    /// Out-of-range radii are scaled up per the implementation notes.
    /// Degenerate input — coincident endpoints or a zero radius — collapses
    /// to a zero-sweep arc anchored at `start`, which the rest of the
    /// pipeline treats as an omitted segment.
    pub fn from_svg_parameters(
        start: Point,
        rx: f64,
        ry: f64,
        rotation: Angle,
        large_arc: bool,
        sweep_flag: bool,
        end: Point,
    ) -> EllipticalArc {
        if point_eq(start, end) || rx == 0.0 || ry == 0.0 {
            return EllipticalArc {
                start,
                end,
                center: start,
                prx: start,
                pry: start,
                sweep: 0.0,
            };
        }

        let mut rx = rx.abs();
        let mut ry = ry.abs();
        let (sinr, cosr) = rotation.radians.sin_cos();

        let dx = (start.x - end.x) / 2.0;
        let dy = (start.y - end.y) / 2.0;
        let x1p = cosr * dx + sinr * dy;
        let y1p = -sinr * dx + cosr * dy;
        let x1p_sq = x1p * x1p;
        let y1p_sq = y1p * y1p;

        let mut rx_sq = rx * rx;
        let mut ry_sq = ry * ry;

        // Correct out of range radii.
        let radius_check = x1p_sq / rx_sq + y1p_sq / ry_sq;
        if radius_check > 1.0 {
            let scale = radius_check.sqrt();
            rx *= scale;
            ry *= scale;
            rx_sq = rx * rx;
            ry_sq = ry * ry;
        }

        let t1 = rx_sq * y1p_sq;
        let t2 = ry_sq * x1p_sq;
        let mut c = ((rx_sq * ry_sq - t1 - t2) / (t1 + t2)).abs().sqrt();
        if large_arc == sweep_flag {
            c = -c;
        }
        let cxp = c * rx * y1p / ry;
        let cyp = -c * ry * x1p / rx;

        let center = point(
            cosr * cxp - sinr * cyp + (start.x + end.x) / 2.0,
            sinr * cxp + cosr * cyp + (start.y + end.y) / 2.0,
        );

        let ux = (x1p - cxp) / rx;
        let uy = (y1p - cyp) / ry;
        let vx = (-x1p - cxp) / rx;
        let vy = (-y1p - cyp) / ry;

        let n = ((ux * ux + uy * uy) * (vx * vx + vy * vy)).sqrt();
        let mut d = (ux * vx + uy * vy) / n;
        d = d.clamp(-1.0, 1.0);
        let mut delta = d.acos();
        if ux * vy - uy * vx < 0.0 {
            delta = -delta;
        }
        delta %= TAU;
        if !sweep_flag {
            delta -= TAU;
        }

        let prx = point(
            center.x + rx * cosr,
            center.y + rx * sinr,
        );
        let pry = point(
            center.x - ry * sinr,
            center.y + ry * cosr,
        );

        EllipticalArc {
            start,
            end,
            center,
            prx,
            pry,
            sweep: delta,
        }
    }

    /// The SVG endpoint form: `rx ry rotation large-arc sweep end`.
    pub fn to_svg_parameters(&self) -> SvgArcParameters {
        SvgArcParameters {
            rx: self.rx(),
            ry: self.ry(),
            rotation: self.rotation().to_degrees(),
            large_arc: self.sweep.abs() > TAU / 2.0,
            sweep: self.sweep >= 0.0,
            end: self.end,
        }
    }

    #[inline]
    pub fn rx(&self) -> f64 {
        distance(self.center, self.prx)
    }

    #[inline]
    pub fn ry(&self) -> f64 {
        distance(self.center, self.pry)
    }

    /// Ellipse rotation, the angle of `center → prx`.
    pub fn rotation(&self) -> Angle {
        Angle::radians((self.prx.y - self.center.y).atan2(self.prx.x - self.center.x))
    }

    pub fn is_circular(&self) -> bool {
        (self.rx() - self.ry()).abs() < LENGTH_ERROR
    }

    /// Point on the ellipse at parameter `t` (not arc-length uniform).
    pub fn point_at_t(&self, t: f64) -> Point {
        let (sinr, cosr) = self.rotation().radians.sin_cos();
        let rx = self.rx();
        let ry = self.ry();
        let (sint, cost) = t.sin_cos();
        point(
            self.center.x + rx * cost * cosr - ry * sint * sinr,
            self.center.y + rx * cost * sinr + ry * sint * cosr,
        )
    }

    /// Ellipse parameter of a point assumed on the ellipse.
    pub fn t_at_point(&self, p: Point) -> f64 {
        let (sinr, cosr) = self.rotation().radians.sin_cos();
        let dx = p.x - self.center.x;
        let dy = p.y - self.center.y;
        // Rotate into the ellipse frame, then normalize out the radii.
        let local_x = (cosr * dx + sinr * dy) / self.rx();
        let local_y = (-sinr * dx + cosr * dy) / self.ry();
        local_y.atan2(local_x)
    }

    /// Geometric angle from the center to a point.
    pub fn angle_at_point(&self, p: Point) -> Angle {
        Angle::radians((p.y - self.center.y).atan2(p.x - self.center.x))
    }

    /// Point on the ellipse at a geometric angle from the center.
    ///
    /// Converts the angle to the ellipse parameter through
    /// `tan t = (rx / ry) · tan(a − θ)`.
    pub fn point_at_angle(&self, angle: Angle) -> Point {
        let relative = angle.radians - self.rotation().radians;
        let t = (self.rx() * relative.sin()).atan2(self.ry() * relative.cos());
        self.point_at_t(t)
    }

    /// Checks the stored points against each other: `prx` and `pry` must
    /// span perpendicular radii, and degenerate radii require a zero sweep.
    /// A violation means a construction or transform bug, not bad input.
    pub fn validate(&self) -> Result<(), GeometryInvariant> {
        let rx_vec = self.prx - self.center;
        let ry_vec = self.pry - self.center;
        let rx = rx_vec.length();
        let ry = ry_vec.length();
        if rx <= LENGTH_ERROR || ry <= LENGTH_ERROR {
            if self.sweep != 0.0 {
                return Err(GeometryInvariant(
                    "zero radius with non-zero sweep".to_string(),
                ));
            }
            return Ok(());
        }
        let alignment = rx_vec.dot(ry_vec) / (rx * ry);
        if alignment.abs() > 1e-6 {
            return Err(GeometryInvariant(format!(
                "radius axes are not perpendicular (cos = {})",
                alignment
            )));
        }
        Ok(())
    }

    /// Parameter of the start point.
    pub fn start_t(&self) -> f64 {
        if point_eq(self.start, self.center) {
            return 0.0;
        }
        self.t_at_point(self.start)
    }

    /// Sample the arc at `s` in `[0, 1]` along the sweep.
    pub fn sample(&self, s: f64) -> Point {
        if self.sweep == 0.0 {
            return self.start;
        }
        let t = self.start_t() + self.sweep * s;
        self.point_at_t(t)
    }

    /// Arc length; exact for circles, adaptive for true ellipses.
    pub fn length(&self) -> f64 {
        if self.sweep == 0.0 {
            return 0.0;
        }
        if self.is_circular() {
            return (self.rx() * self.sweep).abs();
        }
        segment_length_default(self)
    }

    pub fn length_with(&self, error: f64, min_depth: u32) -> f64 {
        if self.sweep == 0.0 {
            return 0.0;
        }
        if self.is_circular() {
            return (self.rx() * self.sweep).abs();
        }
        segment_length(self, 0.0, 1.0, error, min_depth)
    }

    /// Decomposes into cubic béziers of at most τ/12 sweep each.
    ///
    /// Uses the half-angle control point weight
    /// `α = sin Δ · (√(4 + 3·tan²(Δ/2)) − 1) / 3`.
    pub fn for_each_cubic<F: FnMut(&CubicBezier)>(&self, cb: &mut F) {
        let sweep_limit = TAU / 12.0;
        let arcs_required = (self.sweep.abs() / sweep_limit).ceil() as usize;
        if arcs_required == 0 {
            return;
        }
        let slice = self.sweep / arcs_required as f64;

        let theta = self.rotation().radians;
        let (sin_theta, cos_theta) = theta.sin_cos();
        let rx = self.rx();
        let ry = self.ry();
        let alpha =
            slice.sin() * ((4.0 + 3.0 * (slice / 2.0).tan().powi(2)).sqrt() - 1.0) / 3.0;

        let mut p_start = self.start;
        let mut current_t = self.start_t();

        for i in 0..arcs_required {
            let next_t = current_t + slice;

            let (sin_t0, cos_t0) = current_t.sin_cos();
            let d0x = -rx * cos_theta * sin_t0 - ry * sin_theta * cos_t0;
            let d0y = -rx * sin_theta * sin_t0 + ry * cos_theta * cos_t0;

            let (sin_t1, cos_t1) = next_t.sin_cos();
            let mut p_end = point(
                self.center.x + rx * cos_t1 * cos_theta - ry * sin_t1 * sin_theta,
                self.center.y + rx * cos_t1 * sin_theta + ry * sin_t1 * cos_theta,
            );
            if i == arcs_required - 1 {
                p_end = self.end;
            }
            let d1x = -rx * cos_theta * sin_t1 - ry * sin_theta * cos_t1;
            let d1y = -rx * sin_theta * sin_t1 + ry * cos_theta * cos_t1;

            let c1 = point(p_start.x + alpha * d0x, p_start.y + alpha * d0y);
            let c2 = point(p_end.x - alpha * d1x, p_end.y - alpha * d1y);

            cb(&CubicBezier::new(p_start, c1, c2, p_end));
            p_start = p_end;
            current_t = next_t;
        }
    }

    /// Bounding box of the swept portion.
    ///
    /// Unions the endpoints with the cardinal-axis extrema of the
    /// parameterized ellipse that fall inside the swept range.
    pub fn bounding_box(&self) -> Box2D {
        let mut candidates: ArrayVec<Point, 6> = ArrayVec::new();
        candidates.push(self.start);
        candidates.push(self.end);
        if self.sweep != 0.0 {
            let theta = self.rotation().radians;
            let rx = self.rx();
            let ry = self.ry();
            // dx/dt = 0 and dy/dt = 0 of the rotated parameterization.
            let tx = (-ry * theta.sin()).atan2(rx * theta.cos());
            let ty = (ry * theta.cos()).atan2(rx * theta.sin());
            for t in [tx, tx + PI, ty, ty + PI] {
                if self.contains_t(t) {
                    candidates.push(self.point_at_t(t));
                }
            }
        }
        bounds_of(&candidates)
    }

    /// True when ellipse parameter `t` lies inside the swept range.
    fn contains_t(&self, t: f64) -> bool {
        let offset = if self.sweep >= 0.0 {
            (t - self.start_t()).rem_euclid(TAU)
        } else {
            (self.start_t() - t).rem_euclid(TAU)
        };
        offset <= self.sweep.abs()
    }

    /// Swap the direction of the segment.
    pub fn flip(&self) -> EllipticalArc {
        EllipticalArc {
            start: self.end,
            end: self.start,
            sweep: -self.sweep,
            ..*self
        }
    }

    /// Applies an affine map; a mirroring transform flips the sweep sign.
    pub fn transform(&mut self, m: &Matrix) {
        self.start = m.transform_point(self.start);
        self.end = m.transform_point(self.end);
        self.center = m.transform_point(self.center);
        self.prx = m.transform_point(self.prx);
        self.pry = m.transform_point(self.pry);
        if m.determinant() < 0.0 {
            self.sweep = -self.sweep;
        }
    }
}

impl Curve for EllipticalArc {
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
    use crate::angle::AngleExt;

    fn half_circle() -> EllipticalArc {
        EllipticalArc::from_svg_parameters(
            point(0.0, 0.0),
            50.0,
            50.0,
            Angle::degrees(0.0),
            false,
            true,
            point(100.0, 0.0),
        )
    }

    #[test]
    fn svg_parameterization_circle() {
        let arc = half_circle();
        assert!(point_eq(arc.center, point(50.0, 0.0)));
        assert!((arc.rx() - 50.0).abs() < 1e-9);
        assert!((arc.sweep - PI).abs() < 1e-9);
        // A positive sweep from 180° runs through 270°: midpoint at -y.
        let mid = arc.sample(0.5);
        assert!((mid.x - 50.0).abs() < 1e-6);
        assert!((mid.y + 50.0).abs() < 1e-6);
    }

    #[test]
    fn radius_correction() {
        // Radii too small to span the endpoints get scaled up.
        let arc = EllipticalArc::from_svg_parameters(
            point(0.0, 0.0),
            1.0,
            1.0,
            Angle::degrees(0.0),
            false,
            true,
            point(100.0, 0.0),
        );
        assert!((arc.rx() - 50.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_collapses() {
        let arc = EllipticalArc::from_svg_parameters(
            point(5.0, 5.0),
            0.0,
            10.0,
            Angle::degrees(0.0),
            false,
            true,
            point(20.0, 5.0),
        );
        assert_eq!(arc.sweep, 0.0);
        assert_eq!(arc.length(), 0.0);
        assert_eq!(arc.sample(0.7), arc.start);
    }

    #[test]
    fn svg_round_trip() {
        let arc = EllipticalArc::from_svg_parameters(
            point(0.0, 0.0),
            50.0,
            25.0,
            Angle::degrees(0.0),
            false,
            true,
            point(100.0, 0.0),
        );
        let params = arc.to_svg_parameters();
        assert!((params.rx - 50.0).abs() < 1e-6);
        assert!((params.ry - 25.0).abs() < 1e-6);
        assert!(!params.large_arc);
        assert!(params.sweep);
        assert!(point_eq(params.end, point(100.0, 0.0)));
    }

    #[test]
    fn circle_length_is_exact() {
        let arc = half_circle();
        assert!((arc.length() - 50.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn ellipse_length_adaptive() {
        let arc = EllipticalArc::from_svg_parameters(
            point(0.0, 0.0),
            50.0,
            25.0,
            Angle::degrees(0.0),
            false,
            true,
            point(100.0, 0.0),
        );
        // Ramanujan approximation of the half ellipse perimeter for sanity.
        let len = arc.length();
        assert!(len > 110.0 && len < 125.0, "{}", len);
    }

    #[test]
    fn cubic_decomposition_tracks_arc() {
        let arc = half_circle();
        let mut pieces = Vec::new();
        arc.for_each_cubic(&mut |c| pieces.push(*c));
        assert_eq!(pieces.len(), 6);
        assert!(point_eq(pieces[0].start, arc.start));
        assert!(point_eq(pieces.last().unwrap().end, arc.end));
        // Interior joints stay on the circle.
        for c in &pieces {
            let r = distance(arc.center, c.end);
            assert!((r - 50.0).abs() < 1e-6);
        }
    }

    #[test]
    fn bounding_box_of_swept_quarter() {
        // Quarter circle from (50,0)+r50 ending at the top: x in [50,100].
        let arc = EllipticalArc::from_svg_parameters(
            point(100.0, 0.0),
            50.0,
            50.0,
            Angle::degrees(0.0),
            false,
            true,
            point(50.0, 50.0),
        );
        let b = arc.bounding_box();
        assert!((b.min.x - 50.0).abs() < 1e-6);
        assert!((b.max.x - 100.0).abs() < 1e-6);
        assert!(b.min.y >= -1e-6);
        assert!((b.max.y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn angle_and_parameter_views() {
        let arc = EllipticalArc::from_svg_parameters(
            point(0.0, 0.0),
            50.0,
            25.0,
            Angle::degrees(0.0),
            false,
            true,
            point(100.0, 0.0),
        );
        let top = arc.point_at_angle(Angle::degrees(90.0));
        assert!((top.x - 50.0).abs() < 1e-9);
        assert!((top.y - 25.0).abs() < 1e-9);
        let back = arc.angle_at_point(top);
        assert!(back.tau_eq(Angle::degrees(90.0)));
        assert!(arc.validate().is_ok());

        let mut broken = arc;
        broken.pry = point(broken.center.x + 30.0, broken.center.y + 1.0);
        assert!(broken.validate().is_err());
    }

    #[test]
    fn mirror_flips_sweep() {
        let mut arc = half_circle();
        let sweep = arc.sweep;
        arc.transform(&Matrix::scale(1.0, -1.0));
        assert_eq!(arc.sweep, -sweep);
    }
}
