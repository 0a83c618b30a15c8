#![deny(bare_trait_objects)]
#![deny(unconditional_recursion)]
#![allow(clippy::many_single_char_names)]

//! Path data structures for the kerf crates.
//!
//! A [`Path`] is an ordered sequence of typed [`PathSegment`]s — Move, Line,
//! QuadraticBezier, CubicBezier, EllipticalArc, Close — together with a
//! transform and graphic attributes. Paths can be built verb by verb, parsed
//! from SVG path data, measured, transformed, reified and re-emitted.
//!
//! The invariant the container maintains is *connectivity*: inside a path
//! every segment starts where its predecessor ended, and every Close points
//! back at its subpath's origin. Structural edits repair the neighborhood of
//! the edit instead of trusting the caller.

// Reexport the geometry crate.
pub use kerf_geom as geom;

#[cfg(feature = "serialization")]
#[macro_use]
pub extern crate serde;

pub mod parser;
pub mod path;
pub mod segment;
pub mod subpath;
pub mod writer;

#[doc(inline)]
pub use crate::parser::PathParseError;
#[doc(inline)]
pub use crate::path::Path;
#[doc(inline)]
pub use crate::segment::{Close, Move, PathSegment};
#[doc(inline)]
pub use crate::subpath::Subpath;

/// Re-exported math types, so dependents rarely need `kerf_geom` directly.
pub mod math {
    pub use kerf_geom::{point, vector, Angle, Box2D, Matrix, Point, Vector};
}
