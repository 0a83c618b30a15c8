//! Angle parsing and unit views.
//!
//! Angles are stored as radians in `euclid::Angle<f64>`; this module adds the
//! CSS/SVG parse forms (`deg`, `grad`, `rad`, `turn`, bare number = degrees)
//! and the unit accessors the device layers want.

use std::f64::consts::TAU;

use thiserror::Error;

use crate::{Angle, ANGLE_EPSILON};

#[derive(Error, Clone, Debug, PartialEq)]
#[error("Not an angle: {src:?}.")]
pub struct AngleParseError {
    pub src: String,
}

/// Parses `"90deg"`, `"100grad"`, `"1.5708rad"`, `"0.25turn"` or a bare
/// number of degrees.
pub fn parse_angle(src: &str) -> Result<Angle, AngleParseError> {
    let s = src.trim();
    let err = || AngleParseError {
        src: src.to_string(),
    };

    let (number, factor) = if let Some(n) = s.strip_suffix("deg") {
        (n, Angle::degrees as fn(f64) -> Angle)
    } else if let Some(n) = s.strip_suffix("grad") {
        (n, gradians as fn(f64) -> Angle)
    } else if let Some(n) = s.strip_suffix("rad") {
        (n, Angle::radians as fn(f64) -> Angle)
    } else if let Some(n) = s.strip_suffix("turn") {
        (n, turns as fn(f64) -> Angle)
    } else {
        (s, Angle::degrees as fn(f64) -> Angle)
    };

    let value: f64 = number.trim().parse().map_err(|_| err())?;
    Ok(factor(value))
}

/// `Angle` from gradians (400 per turn).
#[inline]
pub fn gradians(gradians: f64) -> Angle {
    Angle::radians(gradians * TAU / 400.0)
}

/// `Angle` from turns.
#[inline]
pub fn turns(turns: f64) -> Angle {
    Angle::radians(turns * TAU)
}

/// Extra unit views on `euclid::Angle<f64>`.
pub trait AngleExt {
    fn as_gradians(&self) -> f64;
    fn as_turns(&self) -> f64;
    /// Degrees normalized to `[0, 360)`.
    fn as_positive_degrees(&self) -> f64;
    /// True when the angle is a multiple of τ/4 within tolerance.
    fn is_orthogonal(&self) -> bool;
    /// Equality modulo τ within [`ANGLE_EPSILON`](crate::ANGLE_EPSILON).
    fn tau_eq(&self, other: Angle) -> bool;
}

impl AngleExt for Angle {
    #[inline]
    fn as_gradians(&self) -> f64 {
        self.radians * 400.0 / TAU
    }

    #[inline]
    fn as_turns(&self) -> f64 {
        self.radians / TAU
    }

    fn as_positive_degrees(&self) -> f64 {
        let mut deg = self.to_degrees() % 360.0;
        if deg < 0.0 {
            deg += 360.0;
        }
        deg
    }

    fn is_orthogonal(&self) -> bool {
        let quarter = self.radians.rem_euclid(TAU / 4.0);
        quarter <= ANGLE_EPSILON || (TAU / 4.0 - quarter) <= ANGLE_EPSILON
    }

    fn tau_eq(&self, other: Angle) -> bool {
        let diff = (self.radians - other.radians).rem_euclid(TAU);
        diff <= ANGLE_EPSILON || (TAU - diff) <= ANGLE_EPSILON
    }
}
