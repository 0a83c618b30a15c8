#![deny(bare_trait_objects)]
#![deny(unconditional_recursion)]

//! Engrave-stream support for the kerf crates.
//!
//! `.egv` files are the native job format of the K40-family controllers: a
//! byte stream of single-letter commands with variable-length distance
//! encodings. This crate tokenizes and interprets those streams back into
//! vector paths and raster scans, and defines the [`PlotCommand`] wire the
//! device spooler consumes.

pub use kerf_geom as geom;
pub use kerf_path as path;

pub mod command;
pub mod parser;
pub mod raster;

#[doc(inline)]
pub use crate::command::{commands_for_path, PlotCommand};
#[doc(inline)]
pub use crate::parser::{parse_egv, EgvBlock, EgvParser, SpeedCode};
#[doc(inline)]
pub use crate::raster::EgvRaster;
