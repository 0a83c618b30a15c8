#![deny(bare_trait_objects)]
#![deny(unconditional_recursion)]
#![allow(clippy::many_single_char_names)]

//! Rasterization for the kerf crates.
//!
//! Two halves:
//!
//! - **plotting**: pixel-perfect enumeration of path segments as integer
//!   `(x, y, pen)` triples using Zingl-Bresenham line, conic and cubic
//!   walks, consumed lazily by the device layers;
//! - **imaging**: baking transforms into raster data (actualization) and
//!   the fisheye undistortion/calibration used by the camera alignment
//!   workflow.
//!
//! Everything here is synchronous and allocation-light; the iterators hold
//! no locks and the remap caches are plain value state.

pub use kerf_geom as geom;
pub use kerf_path as path;

// Reexport the pixel container dependency.
pub use image;

pub mod actualize;
pub mod calibrate;
pub mod fisheye;
pub mod plot;

#[doc(inline)]
pub use crate::actualize::{actualize, Actualized, ActualizeError};
#[doc(inline)]
pub use crate::calibrate::{CalibrationError, CalibrationSession, CHECKERBOARD};
#[doc(inline)]
pub use crate::fisheye::{CameraMatrix, Distortion, UndistortCache, UndistortMap};
#[doc(inline)]
pub use crate::plot::{plot_path, plot_segment, LinePlot, Pixel};

/// Failure to decode the bytes behind an `<image>` element.
#[derive(thiserror::Error, Debug)]
#[error("Image decode failed: {0}")]
pub struct ImageDecodeError(#[from] pub image::ImageError);

/// Decodes the raw bytes carried by an SVG image element.
pub fn decode_image(data: &[u8]) -> Result<image::RgbaImage, ImageDecodeError> {
    let decoded = image::load_from_memory(data)?;
    Ok(decoded.to_rgba8())
}
