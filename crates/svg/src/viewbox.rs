//! viewBox / preserveAspectRatio resolution.
//!
//! Implements the SVG 2 §8.2 equivalent-transform algorithm: the viewBox
//! rectangle is mapped onto the element rectangle with per-axis scales,
//! unified by `meet` (smaller) or `slice` (larger) unless alignment is
//! `none`, then nudged by the x/y alignment halves.

use kerf_geom::{Length, Matrix, RenderContext};
use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq)]
#[error("Not a viewBox: {src:?}.")]
pub struct ViewboxParseError {
    pub src: String,
}

/// The `viewBox` attribute: a source coordinate rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewbox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewbox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Viewbox {
        Viewbox {
            x,
            y,
            width,
            height,
        }
    }

    /// Parses `"min-x min-y width height"`.
    pub fn parse(src: &str) -> Result<Viewbox, ViewboxParseError> {
        let err = ViewboxParseError {
            src: src.to_string(),
        };
        let values: Result<Vec<f64>, _> = src
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>())
            .collect();
        let values = values.map_err(|_| err.clone())?;
        if values.len() < 4 {
            return Err(err);
        }
        Ok(Viewbox {
            x: values[0],
            y: values[1],
            width: values[2],
            height: values[3],
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MeetOrSlice {
    /// Uniform scale such that the whole viewBox is visible.
    Meet,
    /// Uniform scale such that the whole element area is covered.
    Slice,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AxisAlign {
    Min,
    Mid,
    Max,
}

/// The `preserveAspectRatio` attribute.
///
/// `align == None` is the literal `"none"` keyword: non-uniform scaling with
/// no alignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PreserveAspectRatio {
    pub align: Option<(AxisAlign, AxisAlign)>,
    pub meet_or_slice: MeetOrSlice,
}

impl Default for PreserveAspectRatio {
    fn default() -> PreserveAspectRatio {
        PreserveAspectRatio {
            align: Some((AxisAlign::Mid, AxisAlign::Mid)),
            meet_or_slice: MeetOrSlice::Meet,
        }
    }
}

impl PreserveAspectRatio {
    /// Parses `"xMidYMid meet"` and friends. Malformed input falls back to
    /// the default, per the permissive recovery policy.
    pub fn parse(src: &str) -> PreserveAspectRatio {
        let mut parts = src.split_whitespace();
        let align_str = parts.next().unwrap_or("");
        let meet_str = parts.next().unwrap_or("meet");

        if align_str.eq_ignore_ascii_case("none") {
            return PreserveAspectRatio {
                align: None,
                meet_or_slice: MeetOrSlice::Meet,
            };
        }

        let lower = align_str.to_ascii_lowercase();
        let axis = |tag: &str| match tag {
            "min" => Some(AxisAlign::Min),
            "mid" => Some(AxisAlign::Mid),
            "max" => Some(AxisAlign::Max),
            _ => None,
        };
        let align = if lower.len() == 8 && lower.starts_with('x') && lower[4..].starts_with('y')
        {
            match (axis(&lower[1..4]), axis(&lower[5..8])) {
                (Some(x), Some(y)) => Some((x, y)),
                _ => Some((AxisAlign::Mid, AxisAlign::Mid)),
            }
        } else {
            Some((AxisAlign::Mid, AxisAlign::Mid))
        };

        let meet_or_slice = if meet_str.eq_ignore_ascii_case("slice") {
            MeetOrSlice::Slice
        } else {
            MeetOrSlice::Meet
        };

        PreserveAspectRatio {
            align,
            meet_or_slice,
        }
    }
}

/// An SVG viewport: the element rectangle, its optional viewBox and the
/// aspect rule, with the equivalent transform.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub element_x: f64,
    pub element_y: f64,
    pub element_width: f64,
    pub element_height: f64,
    pub viewbox: Option<Viewbox>,
    pub preserve_aspect_ratio: PreserveAspectRatio,
}

impl Viewport {
    /// Builds a viewport from raw attribute strings.
    ///
    /// `outer` supplies the physical width/height percentages resolve
    /// against; attribute parse failures default to the outer dimension.
    pub fn from_attributes(
        x: Option<&str>,
        y: Option<&str>,
        width: Option<&str>,
        height: Option<&str>,
        viewbox: Option<&str>,
        preserve_aspect_ratio: Option<&str>,
        outer: (f64, f64),
        ctx: &RenderContext,
    ) -> Viewport {
        let resolve = |attr: Option<&str>, base: f64, fallback: f64| -> f64 {
            match attr {
                None => fallback,
                Some(s) => Length::parse(s)
                    .ok()
                    .and_then(|l| l.resolve(&ctx.with_relative(base)).ok())
                    .unwrap_or(fallback),
            }
        };

        Viewport {
            element_x: resolve(x, outer.0, 0.0),
            element_y: resolve(y, outer.1, 0.0),
            element_width: resolve(width, outer.0, outer.0),
            element_height: resolve(height, outer.1, outer.1),
            viewbox: viewbox.and_then(|s| Viewbox::parse(s).ok()),
            preserve_aspect_ratio: preserve_aspect_ratio
                .map(PreserveAspectRatio::parse)
                .unwrap_or_default(),
        }
    }

    /// The SVG 2 §8.2 equivalent transform, `translate(tx, ty)·scale(sx, sy)`.
    ///
    /// Identity when there is no viewBox.
    pub fn transform(&self) -> Matrix {
        let vb = match self.viewbox {
            Some(vb) => vb,
            None => return Matrix::identity(),
        };
        viewbox_transform(
            self.element_x,
            self.element_y,
            self.element_width,
            self.element_height,
            vb,
            &self.preserve_aspect_ratio,
        )
    }
}

/// The §8.2 algorithm on raw values.
pub fn viewbox_transform(
    e_x: f64,
    e_y: f64,
    e_width: f64,
    e_height: f64,
    vb: Viewbox,
    aspect: &PreserveAspectRatio,
) -> Matrix {
    let mut scale_x = e_width / vb.width;
    let mut scale_y = e_height / vb.height;

    if aspect.align.is_some() {
        match aspect.meet_or_slice {
            MeetOrSlice::Meet => {
                let s = scale_x.min(scale_y);
                scale_x = s;
                scale_y = s;
            }
            MeetOrSlice::Slice => {
                let s = scale_x.max(scale_y);
                scale_x = s;
                scale_y = s;
            }
        }
    }

    let mut translate_x = e_x - vb.x * scale_x;
    let mut translate_y = e_y - vb.y * scale_y;

    if let Some((x_align, y_align)) = aspect.align {
        match x_align {
            AxisAlign::Min => {}
            AxisAlign::Mid => translate_x += (e_width - vb.width * scale_x) / 2.0,
            AxisAlign::Max => translate_x += e_width - vb.width * scale_x,
        }
        match y_align {
            AxisAlign::Min => {}
            AxisAlign::Mid => translate_y += (e_height - vb.height * scale_y) / 2.0,
            AxisAlign::Max => translate_y += e_height - vb.height * scale_y,
        }
    }

    Matrix::translate(translate_x, translate_y) * Matrix::scale(scale_x, scale_y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::point;

    #[test]
    fn parse_viewbox() {
        assert_eq!(
            Viewbox::parse("0 0 100 50").unwrap(),
            Viewbox::new(0.0, 0.0, 100.0, 50.0)
        );
        assert_eq!(
            Viewbox::parse("-10,5 20,30").unwrap(),
            Viewbox::new(-10.0, 5.0, 20.0, 30.0)
        );
        assert!(Viewbox::parse("1 2 3").is_err());
    }

    #[test]
    fn parse_preserve_aspect_ratio() {
        let par = PreserveAspectRatio::parse("xMinYMax slice");
        assert_eq!(par.align, Some((AxisAlign::Min, AxisAlign::Max)));
        assert_eq!(par.meet_or_slice, MeetOrSlice::Slice);
        assert_eq!(PreserveAspectRatio::parse("none").align, None);
        assert_eq!(
            PreserveAspectRatio::parse("garbage"),
            PreserveAspectRatio::default()
        );
    }

    #[test]
    fn meet_takes_smaller_scale() {
        // 200x200 source into a 100x50 element: the y scale wins, x centers.
        let m = viewbox_transform(
            0.0,
            0.0,
            100.0,
            50.0,
            Viewbox::new(0.0, 0.0, 200.0, 200.0),
            &PreserveAspectRatio::default(),
        );
        let p = m.transform_point(point(0.0, 0.0));
        assert_eq!(p, point(25.0, 0.0));
        let q = m.transform_point(point(200.0, 200.0));
        assert_eq!(q, point(75.0, 50.0));
    }

    #[test]
    fn slice_takes_larger_scale() {
        let m = viewbox_transform(
            0.0,
            0.0,
            100.0,
            50.0,
            Viewbox::new(0.0, 0.0, 200.0, 200.0),
            &PreserveAspectRatio::parse("xMidYMid slice"),
        );
        // Scale 0.5: x fits exactly, y overflows and centers.
        let p = m.transform_point(point(0.0, 0.0));
        assert_eq!(p, point(0.0, -25.0));
        let q = m.transform_point(point(200.0, 200.0));
        assert_eq!(q, point(100.0, 75.0));
    }

    #[test]
    fn corner_mapping_property() {
        // The viewbox corner maps to the element corner exactly for Min/Min.
        let vb = Viewbox::new(7.0, -3.0, 40.0, 80.0);
        let m = viewbox_transform(
            5.0,
            6.0,
            10.0,
            20.0,
            vb,
            &PreserveAspectRatio::parse("xMinYMin meet"),
        );
        let p = m.transform_point(point(vb.x, vb.y));
        assert!((p.x - 5.0).abs() < 1e-12);
        assert!((p.y - 6.0).abs() < 1e-12);
    }

    #[test]
    fn none_scales_each_axis() {
        let m = viewbox_transform(
            0.0,
            0.0,
            100.0,
            50.0,
            Viewbox::new(0.0, 0.0, 200.0, 200.0),
            &PreserveAspectRatio::parse("none"),
        );
        assert_eq!(m.scale_x(), 0.5);
        assert_eq!(m.scale_y(), 0.25);
        assert_eq!(m.trans_x(), 0.0);
    }

    #[test]
    fn viewport_from_attributes() {
        let ctx = RenderContext::with_default_ppi();
        let vp = Viewport::from_attributes(
            None,
            None,
            Some("100"),
            Some("50%"),
            Some("0 0 200 200"),
            Some("xMidYMid meet"),
            (100.0, 100.0),
            &ctx,
        );
        assert_eq!(vp.element_width, 100.0);
        assert_eq!(vp.element_height, 50.0);
        assert!(vp.viewbox.is_some());
        let m = vp.transform();
        assert_eq!(m.scale_x(), 0.25);
    }
}
