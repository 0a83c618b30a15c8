//! 2×3 affine matrices in the SVG convention.
//!
//! The six components map a column vector as `[a c e; b d f; 0 0 1]`, so
//! `a`/`d` carry scale, `b`/`c` carry skew and `e`/`f` carry translation.
//! Multiplication composes as functions: `(m1 * m2)(p) == m1(m2(p))`.
//! `pre_cat` makes the operand apply *before* the receiver and `post_cat`
//! *after*; an SVG transform list is a sequence of `pre_cat`s onto identity,
//! which is what makes `"translate(10,0) scale(2)"` send `(1, 0)` to
//! `(12, 0)`.

use std::fmt;
use std::ops::Mul;

use thiserror::Error;

use crate::angle::parse_angle;
use crate::length::{Length, RenderContext};
use crate::{point, vector, Angle, Point, Vector};

/// Inversion was requested on a zero-determinant matrix.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
#[error("Matrix is singular and cannot be inverted.")]
pub struct SingularMatrix;

#[derive(Error, Clone, Debug, PartialEq)]
#[error("Invalid transform clause {clause:?}.")]
pub struct TransformParseError {
    pub clause: String,
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Matrix {
        Matrix { a, b, c, d, e, f }
    }

    pub fn identity() -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translate(tx: f64, ty: f64) -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Matrix {
        Matrix::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn rotate(angle: Angle) -> Matrix {
        let (sin, cos) = angle.radians.sin_cos();
        Matrix::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    /// Rotation about a pivot: `T(x, y) · R(angle) · T(-x, -y)`.
    pub fn rotate_about(angle: Angle, x: f64, y: f64) -> Matrix {
        Matrix::translate(x, y) * Matrix::rotate(angle) * Matrix::translate(-x, -y)
    }

    pub fn skew_x(angle: Angle) -> Matrix {
        Matrix::new(1.0, 0.0, angle.radians.tan(), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(angle: Angle) -> Matrix {
        Matrix::new(1.0, angle.radians.tan(), 0.0, 1.0, 0.0, 0.0)
    }

    pub fn skew(angle_a: Angle, angle_b: Angle) -> Matrix {
        Matrix::new(1.0, angle_b.radians.tan(), angle_a.radians.tan(), 1.0, 0.0, 0.0)
    }

    // Component accessors, named for what they mean in a skew-free matrix.

    #[inline]
    pub fn scale_x(&self) -> f64 {
        self.a
    }

    #[inline]
    pub fn scale_y(&self) -> f64 {
        self.d
    }

    #[inline]
    pub fn skew_x_component(&self) -> f64 {
        self.b
    }

    #[inline]
    pub fn skew_y_component(&self) -> f64 {
        self.c
    }

    #[inline]
    pub fn trans_x(&self) -> f64 {
        self.e
    }

    #[inline]
    pub fn trans_y(&self) -> f64 {
        self.f
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Matrix::identity(), 1e-12)
    }

    pub fn approx_eq(&self, other: &Matrix, tolerance: f64) -> bool {
        (self.a - other.a).abs() <= tolerance
            && (self.b - other.b).abs() <= tolerance
            && (self.c - other.c).abs() <= tolerance
            && (self.d - other.d).abs() <= tolerance
            && (self.e - other.e).abs() <= tolerance
            && (self.f - other.f).abs() <= tolerance
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// True when the matrix has no skew component (within tolerance).
    pub fn is_skew_free(&self) -> bool {
        self.b.abs() <= 1e-12 && self.c.abs() <= 1e-12
    }

    pub fn inverse(&self) -> Result<Matrix, SingularMatrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(SingularMatrix);
        }
        Ok(Matrix::new(
            self.d / det,
            -self.b / det,
            -self.c / det,
            self.a / det,
            (self.c * self.f - self.d * self.e) / det,
            (self.b * self.e - self.a * self.f) / det,
        ))
    }

    #[inline]
    pub fn transform_point(&self, p: Point) -> Point {
        point(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    /// Applies the linear part only.
    #[inline]
    pub fn transform_vector(&self, v: Vector) -> Vector {
        vector(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    /// Makes `other` apply before `self`.
    pub fn pre_cat(&mut self, other: &Matrix) {
        *self = *self * *other;
    }

    /// Makes `other` apply after `self`.
    pub fn post_cat(&mut self, other: &Matrix) {
        *self = *other * *self;
    }

    pub fn pre_translate(&mut self, tx: f64, ty: f64) {
        self.pre_cat(&Matrix::translate(tx, ty));
    }

    pub fn post_translate(&mut self, tx: f64, ty: f64) {
        self.post_cat(&Matrix::translate(tx, ty));
    }

    pub fn pre_scale(&mut self, sx: f64, sy: f64) {
        self.pre_cat(&Matrix::scale(sx, sy));
    }

    pub fn post_scale(&mut self, sx: f64, sy: f64) {
        self.post_cat(&Matrix::scale(sx, sy));
    }

    pub fn pre_rotate(&mut self, angle: Angle) {
        self.pre_cat(&Matrix::rotate(angle));
    }

    pub fn post_rotate(&mut self, angle: Angle) {
        self.post_cat(&Matrix::rotate(angle));
    }

    pub fn pre_rotate_about(&mut self, angle: Angle, x: f64, y: f64) {
        self.pre_cat(&Matrix::rotate_about(angle, x, y));
    }

    pub fn post_rotate_about(&mut self, angle: Angle, x: f64, y: f64) {
        self.post_cat(&Matrix::rotate_about(angle, x, y));
    }

    /// The rotation carried by the linear part.
    pub fn rotation(&self) -> Angle {
        Angle::radians(self.b.atan2(self.a))
    }

    /// Parses an SVG transform list.
    ///
    /// Clauses apply in source order as successive `pre_cat`s onto identity.
    /// Length arguments resolve against `ctx` (percent translations use the
    /// viewport dimensions). Unparsable clauses are skipped, matching SVG's
    /// permissive error handling; a malformed clause *shape* (no
    /// parenthesis) fails the parse.
    pub fn parse(src: &str, ctx: &RenderContext) -> Result<Matrix, TransformParseError> {
        let mut m = Matrix::identity();
        let src = src.trim();
        if src.is_empty() {
            return Ok(m);
        }

        for clause in src.split(')') {
            let clause = clause.trim().trim_start_matches(',').trim();
            if clause.is_empty() {
                continue;
            }
            let mut it = clause.splitn(2, '(');
            let name = it.next().unwrap_or("").trim().to_ascii_lowercase();
            let args = match it.next() {
                Some(args) => args,
                None => {
                    return Err(TransformParseError {
                        clause: clause.to_string(),
                    })
                }
            };
            let args: Vec<&str> = args
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .collect();

            if let Some(op) = parse_clause(&name, &args, ctx) {
                m.pre_cat(&op);
            }
        }
        Ok(m)
    }
}

fn parse_clause(name: &str, args: &[&str], ctx: &RenderContext) -> Option<Matrix> {
    let number = |i: usize| -> Option<f64> { args.get(i)?.parse::<f64>().ok() };
    let length_x = |i: usize| -> Option<f64> {
        let l = Length::parse(args.get(i)?).ok()?;
        l.resolve(&horizontal_context(ctx)).ok()
    };
    let length_y = |i: usize| -> Option<f64> {
        let l = Length::parse(args.get(i)?).ok()?;
        l.resolve(&vertical_context(ctx)).ok()
    };
    let angle = |i: usize| -> Option<Angle> { parse_angle(args.get(i)?).ok() };

    match name {
        "matrix" => {
            if args.len() != 6 {
                return None;
            }
            Some(Matrix::new(
                number(0)?,
                number(1)?,
                number(2)?,
                number(3)?,
                number(4)?,
                number(5)?,
            ))
        }
        "translate" => {
            let tx = length_x(0)?;
            let ty = if args.len() > 1 { length_y(1)? } else { 0.0 };
            Some(Matrix::translate(tx, ty))
        }
        "translatex" => Some(Matrix::translate(length_x(0)?, 0.0)),
        "translatey" => Some(Matrix::translate(0.0, length_y(0)?)),
        "scale" => {
            let sx = number(0)?;
            let sy = if args.len() > 1 { number(1)? } else { sx };
            Some(Matrix::scale(sx, sy))
        }
        "scalex" => Some(Matrix::scale(number(0)?, 1.0)),
        "scaley" => Some(Matrix::scale(1.0, number(0)?)),
        "rotate" => {
            let a = angle(0)?;
            if args.len() >= 3 {
                Some(Matrix::rotate_about(a, length_x(1)?, length_y(2)?))
            } else {
                Some(Matrix::rotate(a))
            }
        }
        "skew" => {
            let a = angle(0)?;
            let b = angle(1)?;
            if args.len() >= 4 {
                let (x, y) = (length_x(2)?, length_y(3)?);
                Some(
                    Matrix::translate(x, y)
                        * Matrix::skew(a, b)
                        * Matrix::translate(-x, -y),
                )
            } else {
                Some(Matrix::skew(a, b))
            }
        }
        "skewx" => {
            let a = angle(0)?;
            if args.len() >= 3 {
                let (x, y) = (length_x(1)?, length_y(2)?);
                Some(
                    Matrix::translate(x, y)
                        * Matrix::skew_x(a)
                        * Matrix::translate(-x, -y),
                )
            } else {
                Some(Matrix::skew_x(a))
            }
        }
        "skewy" => {
            let a = angle(0)?;
            if args.len() >= 3 {
                let (x, y) = (length_x(1)?, length_y(2)?);
                Some(
                    Matrix::translate(x, y)
                        * Matrix::skew_y(a)
                        * Matrix::translate(-x, -y),
                )
            } else {
                Some(Matrix::skew_y(a))
            }
        }
        _ => None,
    }
}

fn horizontal_context(ctx: &RenderContext) -> RenderContext {
    RenderContext {
        relative_length: ctx
            .viewbox
            .map(|(w, _)| w)
            .or(ctx.relative_length),
        ..*ctx
    }
}

fn vertical_context(ctx: &RenderContext) -> RenderContext {
    RenderContext {
        relative_length: ctx
            .viewbox
            .map(|(_, h)| h)
            .or(ctx.relative_length),
        ..*ctx
    }
}

impl Default for Matrix {
    fn default() -> Matrix {
        Matrix::identity()
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    /// Function composition: `(m1 * m2)(p) == m1(m2(p))`.
    fn mul(self, rhs: Matrix) -> Matrix {
        Matrix::new(
            self.a * rhs.a + self.c * rhs.b,
            self.b * rhs.a + self.d * rhs.b,
            self.a * rhs.c + self.c * rhs.d,
            self.b * rhs.c + self.d * rhs.d,
            self.a * rhs.e + self.c * rhs.f + self.e,
            self.b * rhs.e + self.d * rhs.f + self.f,
        )
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use crate::length::format_number as fmt_n;
        write!(
            f,
            "matrix({}, {}, {}, {}, {}, {})",
            fmt_n(self.a),
            fmt_n(self.b),
            fmt_n(self.c),
            fmt_n(self.d),
            fmt_n(self.e),
            fmt_n(self.f)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext::with_default_ppi()
    }

    #[test]
    fn composition_order() {
        let m = Matrix::parse("translate(10,0) scale(2)", &ctx()).unwrap();
        let p = m.transform_point(point(1.0, 0.0));
        assert_eq!(p, point(12.0, 0.0));
    }

    #[test]
    fn composition_is_function_composition() {
        let a = Matrix::rotate(Angle::degrees(30.0));
        let b = Matrix::new(2.0, 0.5, -0.25, 3.0, 7.0, -2.0);
        let p = point(3.5, -1.25);
        let composed = (a * b).transform_point(p);
        let stepped = a.transform_point(b.transform_point(p));
        assert!((composed.x - stepped.x).abs() < 1e-12);
        assert!((composed.y - stepped.y).abs() < 1e-12);
    }

    #[test]
    fn inverse_round_trip() {
        let m = Matrix::parse("rotate(37) translate(3,4) scale(2,0.5)", &ctx()).unwrap();
        let inv = m.inverse().unwrap();
        assert!((m * inv).approx_eq(&Matrix::identity(), 1e-9));
        assert!((inv * m).approx_eq(&Matrix::identity(), 1e-9));
    }

    #[test]
    fn singular_inverse_fails() {
        assert_eq!(
            Matrix::scale(0.0, 1.0).inverse(),
            Err(SingularMatrix)
        );
    }

    #[test]
    fn rotate_about_pivot() {
        let m = Matrix::rotate_about(Angle::degrees(180.0), 5.0, 5.0);
        let p = m.transform_point(point(0.0, 0.0));
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn parse_matrix_clause() {
        let m = Matrix::parse("matrix(1 2 3 4 5 6)", &ctx()).unwrap();
        assert_eq!(m, Matrix::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
    }

    #[test]
    fn parse_rotate_with_pivot() {
        let m = Matrix::parse("rotate(90, 10, 10)", &ctx()).unwrap();
        let expected = Matrix::rotate_about(Angle::degrees(90.0), 10.0, 10.0);
        assert!(m.approx_eq(&expected, 1e-9));
    }

    #[test]
    fn parse_units_and_percent() {
        let m = Matrix::parse("translate(1in)", &ctx()).unwrap();
        assert_eq!(m.trans_x(), 96.0);

        let ctx = RenderContext {
            viewbox: Some((200.0, 100.0)),
            ..RenderContext::default()
        };
        let m = Matrix::parse("translate(50%, 50%)", &ctx).unwrap();
        assert_eq!(m.trans_x(), 100.0);
        assert_eq!(m.trans_y(), 50.0);
    }

    #[test]
    fn parse_skips_bad_clause() {
        // SVG recovery: the unknown clause is ignored, the rest applies.
        let m = Matrix::parse("frobnicate(3) translate(5, 0)", &ctx()).unwrap();
        assert_eq!(m.trans_x(), 5.0);
    }

    #[test]
    fn skew_components() {
        let m = Matrix::skew_x(Angle::degrees(45.0));
        assert!((m.skew_y_component() - 1.0).abs() < 1e-9);
        assert!(!m.is_skew_free());
        assert!(Matrix::scale(2.0, 3.0).is_skew_free());
    }
}
