#![deny(bare_trait_objects)]

//! The geometry and rasterization core of a laser-cutting application.
//!
//! This meta-crate re-exports the workspace crates for convenience:
//!
//! * **kerf_geom** - lengths with units, colors, angles, affine matrices and
//!   curve segment math.
//! * **kerf_path** - the typed path model with SVG path data parsing and
//!   emission.
//! * **kerf_svg** - shape primitives, the streaming SVG reader and the
//!   writer.
//! * **kerf_raster** - Zingl-Bresenham pixel plotting, raster actualization
//!   and camera undistortion.
//! * **kerf_egv** - engrave-stream parsing and the device plot-command
//!   model.
//!
//! Each `kerf_<name>` crate is reexported as a `<name>` module. For example:
//!
//! ```
//! use kerf::path::Path;
//! use kerf::raster::plot_path;
//!
//! let path = Path::parse("M 0,0 L 5,3").unwrap();
//! let pixels: Vec<_> = plot_path(&path).collect();
//! assert_eq!(pixels.len(), 7);
//! ```
//!
//! # Scope
//!
//! The core is synchronous and free of device and UI concerns. The GUI, the
//! spooler, the serial transport and the console language all live above it
//! and consume it through the element, path and plot iterators.

pub extern crate kerf_egv;
pub extern crate kerf_raster;
pub extern crate kerf_svg;

pub use kerf_egv as egv;
pub use kerf_raster as raster;
pub use kerf_svg as svg;

pub use kerf_svg::geom;
pub use kerf_svg::path;

pub use kerf_svg::geom as math;
