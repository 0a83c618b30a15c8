//! Lazily resolved lengths with SVG/CSS units.
//!
//! A [`Length`] stores an amount together with its unit and only commits to a
//! pixel value once a [`RenderContext`] supplies the missing conversions.
//! `50%` stays `50%` until something knows the relative base; `30cm` stays
//! `30cm` until a pixels-per-inch density is known. Arithmetic between
//! convertible families works symbolically: `Length::parse("20in")? +
//! Length::parse("3cm")?` is exact without ever touching pixels.

use std::fmt;
use std::ops::{Div, Mul, Neg};

use thiserror::Error;

/// Default display density used when a caller has no better value.
pub const DEFAULT_PPI: f64 = 96.0;

const PIXELS_PER_POINT: f64 = 1.3333;
const PIXELS_PER_PICA: f64 = 16.0;
const INCHES_PER_MM: f64 = 0.0393701;
const INCHES_PER_CM: f64 = 0.393701;

/// The unit tag carried by a [`Length`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub enum Unit {
    /// No unit; interconvertible 1:1 with `Px`.
    Native,
    Px,
    Pt,
    Pc,
    Mm,
    Cm,
    In,
    Em,
    Ex,
    Percent,
    Vw,
    Vh,
    Vmin,
    Vmax,
}

impl Unit {
    fn suffix(self) -> &'static str {
        match self {
            Unit::Native => "",
            Unit::Px => "px",
            Unit::Pt => "pt",
            Unit::Pc => "pc",
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::In => "in",
            Unit::Em => "em",
            Unit::Ex => "ex",
            Unit::Percent => "%",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
            Unit::Vmin => "vmin",
            Unit::Vmax => "vmax",
        }
    }

    fn from_suffix(s: &str) -> Option<Unit> {
        Some(match s {
            "" => Unit::Native,
            "px" => Unit::Px,
            "pt" => Unit::Pt,
            "pc" => Unit::Pc,
            "mm" => Unit::Mm,
            "cm" => Unit::Cm,
            "in" => Unit::In,
            "em" => Unit::Em,
            "ex" => Unit::Ex,
            "%" => Unit::Percent,
            "vw" => Unit::Vw,
            "vh" => Unit::Vh,
            "vmin" => Unit::Vmin,
            "vmax" => Unit::Vmax,
            _ => return None,
        })
    }
}

/// The information a [`Length`] may need to resolve to pixels.
///
/// Every field is optional; `resolve` succeeds exactly when the fields the
/// unit requires are present.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RenderContext {
    /// Pixels per inch, for physical units.
    pub ppi: Option<f64>,
    /// The base a percentage resolves against.
    pub relative_length: Option<f64>,
    /// Font size in pixels, for `em`.
    pub font_size: Option<f64>,
    /// Font x-height in pixels, for `ex`.
    pub font_height: Option<f64>,
    /// Viewport (width, height) in pixels, for `vw`/`vh`/`vmin`/`vmax`.
    pub viewbox: Option<(f64, f64)>,
}

impl RenderContext {
    /// A context with the default 96 ppi density and nothing else.
    pub fn with_default_ppi() -> RenderContext {
        RenderContext {
            ppi: Some(DEFAULT_PPI),
            ..RenderContext::default()
        }
    }

    /// Same context with a different percentage base.
    pub fn with_relative(&self, relative_length: f64) -> RenderContext {
        RenderContext {
            relative_length: Some(relative_length),
            ..*self
        }
    }
}

#[derive(Error, Clone, Debug, PartialEq)]
#[error("Not a length: {src:?}.")]
pub struct LengthParseError {
    pub src: String,
}

/// Arithmetic across unit families with no conversion path.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
#[error("Incompatible length units {0:?} and {1:?}.")]
pub struct UnitMismatch(pub Unit, pub Unit);

/// Returned in place of a pixel value when a length cannot resolve yet.
///
/// Callers decide whether this is an error or a value to keep symbolic.
#[derive(Error, Clone, Debug, PartialEq)]
#[error("Length {0} cannot resolve without more context.")]
pub struct ResolveDeferred(pub Length);

/// A unit-bearing scalar.
///
/// The `none` sentinel (an absent amount) is distinct from zero: it survives
/// arithmetic as `none` so that a downstream consumer can still tell an
/// explicitly disabled attribute from a zero-valued one.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Length {
    amount: Option<f64>,
    unit: Unit,
}

impl Length {
    pub fn new(amount: f64, unit: Unit) -> Length {
        Length {
            amount: Some(amount),
            unit,
        }
    }

    /// The `none` sentinel.
    pub fn none() -> Length {
        Length {
            amount: None,
            unit: Unit::Native,
        }
    }

    #[inline]
    pub fn zero() -> Length {
        Length::new(0.0, Unit::Native)
    }

    #[inline]
    pub fn px(amount: f64) -> Length {
        Length::new(amount, Unit::Px)
    }

    #[inline]
    pub fn mm(amount: f64) -> Length {
        Length::new(amount, Unit::Mm)
    }

    #[inline]
    pub fn percent(amount: f64) -> Length {
        Length::new(amount, Unit::Percent)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.amount.is_none()
    }

    #[inline]
    pub fn amount(&self) -> Option<f64> {
        self.amount
    }

    #[inline]
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Parses a number with an optional unit suffix.
    ///
    /// `"none"` parses as the none sentinel. Scientific notation is accepted
    /// in the number part.
    pub fn parse(src: &str) -> Result<Length, LengthParseError> {
        let s = src.trim();
        if s.eq_ignore_ascii_case("none") {
            return Ok(Length::none());
        }

        let bytes = s.as_bytes();
        let mut end = 0;
        if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
            end += 1;
        }
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
        if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
            let mut exp = end + 1;
            if exp < bytes.len() && (bytes[exp] == b'-' || bytes[exp] == b'+') {
                exp += 1;
            }
            let digits = exp;
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            if exp > digits {
                end = exp;
            }
        }

        let amount: f64 = s[..end].parse().map_err(|_| LengthParseError {
            src: src.to_string(),
        })?;
        let unit = Unit::from_suffix(s[end..].trim()).ok_or_else(|| LengthParseError {
            src: src.to_string(),
        })?;

        Ok(Length::new(amount, unit))
    }

    /// Pixel value if the unit belongs to the pixel family.
    pub fn in_pixels(&self) -> Option<f64> {
        let amount = self.amount?;
        match self.unit {
            Unit::Native | Unit::Px => Some(amount),
            Unit::Pt => Some(amount * PIXELS_PER_POINT),
            Unit::Pc => Some(amount * PIXELS_PER_PICA),
            _ => None,
        }
    }

    /// Inch value if the unit belongs to the physical family.
    pub fn in_inches(&self) -> Option<f64> {
        let amount = self.amount?;
        match self.unit {
            Unit::Mm => Some(amount * INCHES_PER_MM),
            Unit::Cm => Some(amount * INCHES_PER_CM),
            Unit::In => Some(amount),
            _ => None,
        }
    }

    /// Checked addition.
    ///
    /// Same units add exactly. {native, px, pt, pc} and {mm, cm, in} convert
    /// within their families. A zero amount adopts the other operand. A none
    /// operand is absorbing. Everything else is a [`UnitMismatch`].
    pub fn checked_add(&self, other: &Length) -> Result<Length, UnitMismatch> {
        let (a, b) = match (self.amount, other.amount) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(Length::none()),
        };
        if self.unit == other.unit {
            return Ok(Length::new(a + b, self.unit));
        }
        if a == 0.0 {
            return Ok(*other);
        }
        if b == 0.0 {
            return Ok(*self);
        }
        if let (Some(pa), Some(pb)) = (self.in_pixels(), other.in_pixels()) {
            // Converted into the left operand's unit to keep addition stable.
            let amount = match self.unit {
                Unit::Pt => (pa + pb) / PIXELS_PER_POINT,
                Unit::Pc => (pa + pb) / PIXELS_PER_PICA,
                _ => pa + pb,
            };
            return Ok(Length::new(amount, self.unit));
        }
        if let (Some(ia), Some(ib)) = (self.in_inches(), other.in_inches()) {
            let amount = match self.unit {
                Unit::Mm => (ia + ib) / INCHES_PER_MM,
                Unit::Cm => (ia + ib) / INCHES_PER_CM,
                _ => ia + ib,
            };
            return Ok(Length::new(amount, self.unit));
        }
        Err(UnitMismatch(self.unit, other.unit))
    }

    pub fn checked_sub(&self, other: &Length) -> Result<Length, UnitMismatch> {
        self.checked_add(&-*other)
    }

    /// Length × length.
    ///
    /// A percentage scales the other operand by `amount / 100` and takes its
    /// unit; two percentages multiply amounts and stay a percentage; equal
    /// units multiply amounts.
    pub fn checked_mul(&self, other: &Length) -> Result<Length, UnitMismatch> {
        let (a, b) = match (self.amount, other.amount) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(Length::none()),
        };
        if self.unit == other.unit {
            return Ok(Length::new(a * b, self.unit));
        }
        if self.unit == Unit::Percent {
            return Ok(Length::new(a * b / 100.0, other.unit));
        }
        if other.unit == Unit::Percent {
            return Ok(Length::new(a * b / 100.0, self.unit));
        }
        Err(UnitMismatch(self.unit, other.unit))
    }

    /// Resolves to pixels given a context, or defers.
    pub fn resolve(&self, ctx: &RenderContext) -> Result<f64, ResolveDeferred> {
        let deferred = || ResolveDeferred(*self);
        let amount = self.amount.ok_or_else(deferred)?;
        match self.unit {
            Unit::Native | Unit::Px => Ok(amount),
            Unit::Pt => Ok(amount * PIXELS_PER_POINT),
            Unit::Pc => Ok(amount * PIXELS_PER_PICA),
            Unit::Mm => ctx
                .ppi
                .map(|ppi| amount * ppi * INCHES_PER_MM)
                .ok_or_else(deferred),
            Unit::Cm => ctx
                .ppi
                .map(|ppi| amount * ppi * INCHES_PER_CM)
                .ok_or_else(deferred),
            Unit::In => ctx.ppi.map(|ppi| amount * ppi).ok_or_else(deferred),
            Unit::Em => ctx
                .font_size
                .map(|f| amount * f)
                .ok_or_else(deferred),
            Unit::Ex => ctx
                .font_height
                .map(|f| amount * f)
                .ok_or_else(deferred),
            Unit::Percent => ctx
                .relative_length
                .map(|rel| rel * amount / 100.0)
                .ok_or_else(deferred),
            Unit::Vw => ctx
                .viewbox
                .map(|(w, _)| amount * w / 100.0)
                .ok_or_else(deferred),
            Unit::Vh => ctx
                .viewbox
                .map(|(_, h)| amount * h / 100.0)
                .ok_or_else(deferred),
            Unit::Vmin => ctx
                .viewbox
                .map(|(w, h)| amount * w.min(h) / 100.0)
                .ok_or_else(deferred),
            Unit::Vmax => ctx
                .viewbox
                .map(|(w, h)| amount * w.max(h) / 100.0)
                .ok_or_else(deferred),
        }
    }

    /// Resolved value converted into millimeters.
    pub fn to_mm(&self, ctx: &RenderContext) -> Result<Length, ResolveDeferred> {
        let ppi = ctx.ppi.unwrap_or(DEFAULT_PPI);
        let value = self.resolve(ctx)?;
        Ok(Length::new(value / (ppi * INCHES_PER_MM), Unit::Mm))
    }

    /// Resolved value converted into centimeters.
    pub fn to_cm(&self, ctx: &RenderContext) -> Result<Length, ResolveDeferred> {
        let ppi = ctx.ppi.unwrap_or(DEFAULT_PPI);
        let value = self.resolve(ctx)?;
        Ok(Length::new(value / (ppi * INCHES_PER_CM), Unit::Cm))
    }

    /// Resolved value converted into inches.
    pub fn to_inch(&self, ctx: &RenderContext) -> Result<Length, ResolveDeferred> {
        let ppi = ctx.ppi.unwrap_or(DEFAULT_PPI);
        let value = self.resolve(ctx)?;
        Ok(Length::new(value / ppi, Unit::In))
    }
}

impl Default for Length {
    fn default() -> Length {
        Length::zero()
    }
}

impl PartialEq for Length {
    fn eq(&self, other: &Length) -> bool {
        match (self.amount, other.amount) {
            (None, None) => true,
            (None, _) | (_, None) => false,
            (Some(a), Some(b)) => {
                if self.unit == other.unit {
                    return (a - b).abs() <= crate::LENGTH_ERROR;
                }
                if let (Some(pa), Some(pb)) = (self.in_pixels(), other.in_pixels()) {
                    return (pa - pb).abs() <= crate::LENGTH_ERROR;
                }
                if let (Some(ia), Some(ib)) = (self.in_inches(), other.in_inches()) {
                    return (ia - ib).abs() <= crate::LENGTH_ERROR;
                }
                false
            }
        }
    }
}

impl PartialOrd for Length {
    fn partial_cmp(&self, other: &Length) -> Option<std::cmp::Ordering> {
        if self.unit == other.unit {
            return self.amount?.partial_cmp(&other.amount?);
        }
        if let (Some(a), Some(b)) = (self.in_pixels(), other.in_pixels()) {
            return a.partial_cmp(&b);
        }
        if let (Some(a), Some(b)) = (self.in_inches(), other.in_inches()) {
            return a.partial_cmp(&b);
        }
        None
    }
}

impl Neg for Length {
    type Output = Length;
    fn neg(self) -> Length {
        Length {
            amount: self.amount.map(|a| -a),
            unit: self.unit,
        }
    }
}

impl Mul<f64> for Length {
    type Output = Length;
    fn mul(self, rhs: f64) -> Length {
        Length {
            amount: self.amount.map(|a| a * rhs),
            unit: self.unit,
        }
    }
}

impl Div<f64> for Length {
    type Output = Length;
    fn div(self, rhs: f64) -> Length {
        Length {
            amount: self.amount.map(|a| a / rhs),
            unit: self.unit,
        }
    }
}

/// Formats a float with up to 12 fractional digits, trailing zeros stripped.
///
/// This is the number form used everywhere serialized output is emitted:
/// length strings, path data, transform clauses.
pub fn format_number(v: f64) -> String {
    let mut s = format!("{:.12}", v);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.amount {
            None => write!(f, "none"),
            Some(a) => write!(f, "{}{}", format_number(a), self.unit.suffix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_units() {
        assert_eq!(Length::parse("10").unwrap(), Length::new(10.0, Unit::Native));
        assert_eq!(Length::parse("10px").unwrap(), Length::px(10.0));
        assert_eq!(Length::parse("-2.5mm").unwrap(), Length::mm(-2.5));
        assert_eq!(Length::parse("50%").unwrap(), Length::percent(50.0));
        assert_eq!(
            Length::parse("1e-2in").unwrap(),
            Length::new(0.01, Unit::In)
        );
        assert!(Length::parse("banana").is_err());
        assert!(Length::parse("10furlong").is_err());
        assert!(Length::parse("none").unwrap().is_none());
    }

    #[test]
    fn add_same_family() {
        let a = Length::parse("20in").unwrap();
        let b = Length::parse("3cm").unwrap();
        let sum = a.checked_add(&b).unwrap();
        assert_eq!(sum.unit(), Unit::In);
        assert!((sum.amount().unwrap() - (20.0 + 3.0 * INCHES_PER_CM)).abs() < 1e-9);

        let c = Length::px(4.0).checked_add(&Length::new(3.0, Unit::Pt)).unwrap();
        assert_eq!(c.unit(), Unit::Px);
        assert!((c.amount().unwrap() - (4.0 + 3.0 * PIXELS_PER_POINT)).abs() < 1e-9);
    }

    #[test]
    fn add_mismatch() {
        let a = Length::percent(50.0);
        let b = Length::mm(3.0);
        assert_eq!(a.checked_add(&b), Err(UnitMismatch(Unit::Percent, Unit::Mm)));
        // A zero operand adopts the other unit instead of failing.
        let z = Length::new(0.0, Unit::Percent).checked_add(&b).unwrap();
        assert_eq!(z, Length::mm(3.0));
    }

    #[test]
    fn add_associative_within_family() {
        let a = Length::mm(1.25);
        let b = Length::mm(2.5);
        let c = Length::mm(4.125);
        let left = a.checked_add(&b).unwrap().checked_add(&c).unwrap();
        let right = a.checked_add(&b.checked_add(&c).unwrap()).unwrap();
        assert!((left.amount().unwrap() - right.amount().unwrap()).abs() <= 1e-12);
    }

    #[test]
    fn percent_multiplication() {
        let p = Length::percent(50.0);
        let l = Length::mm(30.0);
        assert_eq!(p.checked_mul(&l).unwrap(), Length::mm(15.0));
        let pp = p.checked_mul(&Length::percent(50.0)).unwrap();
        assert_eq!(pp, Length::percent(25.0));
    }

    #[test]
    fn none_is_absorbing() {
        let n = Length::none();
        assert!(n.checked_add(&Length::px(5.0)).unwrap().is_none());
        assert!(n.checked_mul(&Length::px(5.0)).unwrap().is_none());
        assert_eq!(format!("{}", n), "none");
    }

    #[test]
    fn resolve_rules() {
        let ctx = RenderContext::with_default_ppi();
        assert_eq!(Length::parse("1in").unwrap().resolve(&ctx).unwrap(), 96.0);
        assert!(
            (Length::parse("1cm").unwrap().resolve(&ctx).unwrap() - 96.0 * INCHES_PER_CM).abs()
                < 1e-9
        );
        assert_eq!(Length::px(12.0).resolve(&ctx).unwrap(), 12.0);

        let pct = Length::percent(50.0);
        assert!(pct.resolve(&ctx).is_err());
        assert_eq!(pct.resolve(&ctx.with_relative(200.0)).unwrap(), 100.0);

        let vw = Length::parse("10vw").unwrap();
        let ctx = RenderContext {
            viewbox: Some((500.0, 300.0)),
            ..RenderContext::default()
        };
        assert_eq!(vw.resolve(&ctx).unwrap(), 50.0);
        let vmin = Length::parse("10vmin").unwrap();
        assert_eq!(vmin.resolve(&ctx).unwrap(), 30.0);
    }

    #[test]
    fn resolve_deferred_keeps_value() {
        let l = Length::parse("2.5em").unwrap();
        let err = l.resolve(&RenderContext::default()).unwrap_err();
        assert_eq!(err.0, l);
    }

    #[test]
    fn physical_round_trip() {
        let ctx = RenderContext::with_default_ppi();
        let l = Length::parse("25.4mm").unwrap();
        let inch = l.to_inch(&ctx).unwrap();
        assert!((inch.amount().unwrap() - 1.0).abs() < 1e-4);
        let back = inch.to_mm(&ctx).unwrap();
        assert!((back.amount().unwrap() - 25.4).abs() < 1e-3);
    }

    #[test]
    fn display_strips_zeros() {
        assert_eq!(format!("{}", Length::mm(12.5)), "12.5mm");
        assert_eq!(format!("{}", Length::px(3.0)), "3px");
        assert_eq!(format!("{}", Length::new(7.0, Unit::Native)), "7");
    }
}
