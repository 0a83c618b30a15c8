//! Text and description carriers.
//!
//! Glyph outlines are out of scope for the core; text elements carry their
//! string, anchor position and font size so a renderer can lay them out, and
//! the bounding box is the documented approximation.

use kerf_geom::{point, Box2D, Matrix, Point};

use crate::shapes::ShapeAttributes;

/// `<text>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SvgText {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    /// Resolved `font-size` in user units.
    pub font_size: f64,
    pub attributes: ShapeAttributes,
}

impl SvgText {
    pub fn new(text: impl Into<String>) -> SvgText {
        SvgText {
            text: text.into(),
            font_size: 16.0,
            ..SvgText::default()
        }
    }

    pub fn anchor(&self) -> Point {
        point(self.x + self.dx, self.y + self.dy)
    }

    /// Approximate bounding box: advance ≈ 0.6·em per character, one em
    /// tall, anchored at the baseline.
    pub fn bounding_box(&self) -> Box2D {
        let anchor = self.anchor();
        let width = self.text.chars().count() as f64 * self.font_size * 0.6;
        let raw = Box2D {
            min: point(anchor.x, anchor.y - self.font_size),
            max: point(anchor.x + width, anchor.y),
        };
        transform_box(&self.attributes.transform, raw)
    }

    /// Text cannot absorb scale into glyph metrics exactly; only the anchor
    /// translation reifies.
    pub fn reify(&mut self) {
        let m = self.attributes.transform;
        let anchor = m.transform_point(point(self.x, self.y));
        self.x = anchor.x;
        self.y = anchor.y;
        self.attributes.transform.e = 0.0;
        self.attributes.transform.f = 0.0;
    }
}

/// `<desc>`, yielded with its inner text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SvgDesc {
    pub desc: String,
}

fn transform_box(m: &Matrix, b: Box2D) -> Box2D {
    let corners = [
        m.transform_point(b.min),
        m.transform_point(point(b.max.x, b.min.y)),
        m.transform_point(point(b.min.x, b.max.y)),
        m.transform_point(b.max),
    ];
    let mut min = corners[0];
    let mut max = corners[0];
    for c in &corners[1..] {
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
    }
    Box2D { min, max }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_scales_with_text() {
        let mut t = SvgText::new("ab");
        t.font_size = 10.0;
        let b2 = t.bounding_box();
        t.text = "abcd".to_string();
        let b4 = t.bounding_box();
        assert!((b4.max.x - b4.min.x) > (b2.max.x - b2.min.x));
        assert_eq!(b2.max.y - b2.min.y, 10.0);
    }

    #[test]
    fn transformed_bbox() {
        let mut t = SvgText::new("hi");
        t.x = 10.0;
        t.y = 10.0;
        t.attributes.transform = Matrix::translate(5.0, 5.0);
        let b = t.bounding_box();
        assert_eq!(b.min.x, 15.0);
        assert_eq!(b.max.y, 15.0);
    }
}
