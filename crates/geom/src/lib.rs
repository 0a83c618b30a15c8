#![deny(bare_trait_objects)]
#![deny(unconditional_recursion)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::many_single_char_names)]

//! Geometric and unit-bearing value types for the kerf crates.
//!
//! This crate implements the maths the rest of the workspace is built on:
//!
//! - lazily resolved lengths with SVG/CSS units,
//! - RGBA colors with CSS parsing, compositing and perceptual distance,
//! - angles with degree/gradian/turn parsing,
//! - 2×3 affine matrices with SVG `transform` parsing,
//! - line segments, quadratic and cubic bézier curves, elliptic arcs.
//!
//! Everything is `f64`. Laser coordinates are mil-scale integers at the
//! device end and sub-pixel precision matters long before that, so there is
//! no `f32` variant.

// Reexport dependencies.
pub use arrayvec;
pub use euclid;

#[cfg(feature = "serialization")]
#[macro_use]
pub extern crate serde;

pub mod angle;
pub mod arc;
pub mod color;
pub mod cubic_bezier;
pub mod length;
pub mod line;
pub mod matrix;
pub mod quadratic_bezier;
mod segment;
pub mod utils;

#[doc(inline)]
pub use crate::angle::{parse_angle, AngleExt};
#[doc(inline)]
pub use crate::arc::EllipticalArc;
#[doc(inline)]
pub use crate::color::Color;
#[doc(inline)]
pub use crate::cubic_bezier::CubicBezier;
#[doc(inline)]
pub use crate::length::{format_number, Length, RenderContext, Unit};
#[doc(inline)]
pub use crate::line::Line;
#[doc(inline)]
pub use crate::matrix::Matrix;
#[doc(inline)]
pub use crate::quadratic_bezier::QuadraticBezier;
pub use crate::segment::{segment_length, segment_length_default, Curve};

/// Alias for `euclid::default::Point2D<f64>`.
pub type Point = euclid::default::Point2D<f64>;

/// Alias for `euclid::default::Vector2D<f64>`.
pub type Vector = euclid::default::Vector2D<f64>;

/// Alias for `euclid::default::Size2D<f64>`.
pub type Size = euclid::default::Size2D<f64>;

/// Alias for `euclid::default::Box2D<f64>`.
pub type Box2D = euclid::default::Box2D<f64>;

/// An angle in radians.
pub type Angle = euclid::Angle<f64>;

/// Shorthand for `Point::new(x, y)`.
#[inline]
pub fn point(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

/// Shorthand for `Vector::new(x, y)`.
#[inline]
pub fn vector(x: f64, y: f64) -> Vector {
    Vector::new(x, y)
}

/// Tolerance used by the adaptive length integration.
pub const LENGTH_ERROR: f64 = 1e-12;
/// Minimum recursion depth of the adaptive length integration.
pub const LENGTH_MIN_DEPTH: u32 = 5;
/// Tolerance for geometric point equality.
pub const GEOMETRY_EPSILON: f64 = 1e-9;
/// Tolerance for exact point identity (validation, hashing-adjacent checks).
pub const POINT_EPSILON: f64 = 1e-12;
/// Tolerance for angle equality modulo τ.
pub const ANGLE_EPSILON: f64 = 1e-11;

/// Errors surfaced by the value-type algebra.
pub mod errors {
    pub use crate::angle::AngleParseError;
    pub use crate::arc::GeometryInvariant;
    pub use crate::color::ColorParseError;
    pub use crate::length::{LengthParseError, ResolveDeferred, UnitMismatch};
    pub use crate::matrix::{SingularMatrix, TransformParseError};
}
