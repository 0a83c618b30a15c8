#![deny(bare_trait_objects)]
#![deny(unconditional_recursion)]

//! SVG element model for the kerf crates.
//!
//! Three layers:
//!
//! - parametric shape primitives (`rect`, `circle`, `ellipse`, `line`,
//!   `polyline`, `polygon`, plus image and text carriers) that decompose
//!   deterministically into [`kerf_path::Path`] segments,
//! - a streaming document reader that walks an SVG tree, maintains the
//!   inherited attribute stack and yields resolved elements,
//! - a writer that serializes core elements back to SVG.
//!
//! Unknown elements are skipped silently; attribute-level parse failures
//! default the attribute and keep going, which is the permissive behavior
//! SVG renderers are expected to have.

pub use kerf_geom as geom;
pub use kerf_path as path;

pub mod image;
pub mod reader;
pub mod shapes;
pub mod text;
pub mod viewbox;
pub mod writer;

#[doc(inline)]
pub use crate::image::SvgImage;
#[doc(inline)]
pub use crate::reader::{Document, Element, ParseOptions, SvgError};
#[doc(inline)]
pub use crate::shapes::{
    Circle, Ellipse, Polygon, Polyline, Rect, Shape, ShapeAttributes, SimpleLine,
};
#[doc(inline)]
pub use crate::text::{SvgDesc, SvgText};
#[doc(inline)]
pub use crate::viewbox::{
    viewbox_transform, MeetOrSlice, PreserveAspectRatio, Viewbox, Viewport,
};
#[doc(inline)]
pub use crate::writer::write_svg;
