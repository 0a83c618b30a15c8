//! Parametric shape primitives.
//!
//! Every shape stores resolved user-unit values plus the common transform and
//! graphic attributes, decomposes deterministically into path segments (SVG 2
//! §10), and knows how far it can fold its transform into its own fields.
//! Rectangles and round shapes absorb translation and scale but have no slot
//! for rotation or skew, so those stay on the transform; lines and polygons
//! reify completely.

use std::f64::consts::TAU;

use kerf_geom::{point, Angle, Box2D, Color, EllipticalArc, Matrix, Point};
use kerf_path::{Close, Move, Path, PathSegment};

/// Transform and graphic attributes shared by every shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeAttributes {
    pub transform: Matrix,
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub id: Option<String>,
}

/// Common shape behavior: decomposition, reification, measurement.
pub trait Shape {
    fn attributes(&self) -> &ShapeAttributes;
    fn attributes_mut(&mut self) -> &mut ShapeAttributes;

    /// Decomposes into path segments in local (untransformed) coordinates.
    fn decompose(&self) -> Vec<PathSegment>;

    /// Folds as much of the transform into the intrinsic fields as the
    /// shape can represent.
    fn reify(&mut self);

    /// The shape as a [`Path`] carrying the transform and attributes.
    fn path(&self) -> Path {
        let attrs = self.attributes();
        let mut path: Path = self.decompose().into_iter().collect();
        path.transform = attrs.transform;
        path.stroke = attrs.stroke;
        path.fill = attrs.fill;
        path.id = attrs.id.clone();
        path
    }

    fn bounding_box(&self) -> Option<Box2D> {
        self.path().bounding_box()
    }
}

/// Absorbs translation and scale into a shape when the transform is
/// skew-free with non-degenerate scales. Returns the factors applied, or
/// `None` when the transform was left untouched.
fn absorb_scale_translate(attrs: &mut ShapeAttributes) -> Option<(f64, f64, f64, f64)> {
    let m = attrs.transform;
    if !m.is_skew_free() || m.scale_x() == 0.0 || m.scale_y() == 0.0 {
        return None;
    }
    let (sx, sy, tx, ty) = (m.scale_x(), m.scale_y(), m.trans_x(), m.trans_y());
    attrs
        .transform
        .pre_cat(&(Matrix::scale(1.0 / sx, 1.0 / sy) * Matrix::translate(-tx, -ty)));
    Some((sx, sy, tx, ty))
}

// --- rect ---

/// `<rect>` with optional corner radii.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rx: f64,
    pub ry: f64,
    pub attributes: ShapeAttributes,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
            ..Rect::default()
        }
    }

    /// Applies the corner-radius rules: a missing radius copies the other,
    /// a zero radius zeroes both, and radii clamp to half the side.
    pub fn with_radii(mut self, rx: Option<f64>, ry: Option<f64>) -> Rect {
        let (rx, ry) = match (rx, ry) {
            (None, None) => (0.0, 0.0),
            (Some(rx), None) => (rx, rx),
            (None, Some(ry)) => (ry, ry),
            (Some(rx), Some(ry)) => (rx, ry),
        };
        if rx == 0.0 || ry == 0.0 {
            self.rx = 0.0;
            self.ry = 0.0;
        } else {
            self.rx = rx.min(self.width / 2.0);
            self.ry = ry.min(self.height / 2.0);
        }
        self
    }
}

impl Shape for Rect {
    fn attributes(&self) -> &ShapeAttributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut ShapeAttributes {
        &mut self.attributes
    }

    fn decompose(&self) -> Vec<PathSegment> {
        let (x, y, w, h) = (self.x, self.y, self.width, self.height);
        if w == 0.0 || h == 0.0 {
            // A zero dimension disables rendering.
            return Vec::new();
        }
        let (rx, ry) = (self.rx, self.ry);
        if rx == 0.0 && ry == 0.0 {
            let mut p = Path::new();
            p.move_to(point(x, y))
                .line_to(point(x + w, y))
                .line_to(point(x + w, y + h))
                .line_to(point(x, y + h))
                .close();
            return p.segments().to_vec();
        }
        let corner = |start: Point, end: Point| {
            PathSegment::Arc(EllipticalArc::from_svg_parameters(
                start,
                rx,
                ry,
                Angle::degrees(0.0),
                false,
                true,
                end,
            ))
        };
        vec![
            PathSegment::Move(Move::new(None, point(x + rx, y))),
            line(point(x + rx, y), point(x + w - rx, y)),
            corner(point(x + w - rx, y), point(x + w, y + ry)),
            line(point(x + w, y + ry), point(x + w, y + h - ry)),
            corner(point(x + w, y + h - ry), point(x + w - rx, y + h)),
            line(point(x + w - rx, y + h), point(x + rx, y + h)),
            corner(point(x + rx, y + h), point(x, y + h - ry)),
            line(point(x, y + h - ry), point(x, y + ry)),
            corner(point(x, y + ry), point(x + rx, y)),
            PathSegment::Close(Close::new(point(x + rx, y), point(x + rx, y))),
        ]
    }

    fn reify(&mut self) {
        if let Some((sx, sy, tx, ty)) = absorb_scale_translate(&mut self.attributes) {
            self.x = self.x * sx + tx;
            self.y = self.y * sy + ty;
            self.width *= sx;
            self.height *= sy;
            self.rx *= sx;
            self.ry *= sy;
        }
    }
}

fn line(start: Point, end: Point) -> PathSegment {
    PathSegment::Line(kerf_geom::Line::new(start, end))
}

// --- circle / ellipse ---

/// `<circle>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Circle {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub attributes: ShapeAttributes,
}

impl Circle {
    pub fn new(cx: f64, cy: f64, r: f64) -> Circle {
        Circle {
            cx,
            cy,
            r,
            ..Circle::default()
        }
    }
}

/// `<ellipse>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ellipse {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
    pub attributes: ShapeAttributes,
}

impl Ellipse {
    pub fn new(cx: f64, cy: f64, rx: f64, ry: f64) -> Ellipse {
        Ellipse {
            cx,
            cy,
            rx,
            ry,
            ..Ellipse::default()
        }
    }
}

/// Four τ/4 arcs around `(cx, cy)`.
fn decompose_round(cx: f64, cy: f64, rx: f64, ry: f64) -> Vec<PathSegment> {
    if rx == 0.0 || ry == 0.0 {
        return Vec::new();
    }
    let center = point(cx, cy);
    let prx = point(cx + rx, cy);
    let pry = point(cx, cy + ry);
    let at = |t: f64| point(cx + rx * t.cos(), cy + ry * t.sin());

    let mut segments = vec![PathSegment::Move(Move::new(None, at(0.0)))];
    for i in 0..4 {
        let t0 = TAU / 4.0 * i as f64;
        let t1 = TAU / 4.0 * (i + 1) as f64;
        segments.push(PathSegment::Arc(EllipticalArc {
            start: at(t0),
            end: at(t1),
            center,
            prx,
            pry,
            sweep: TAU / 4.0,
        }));
    }
    segments.push(PathSegment::Close(Close::new(at(TAU), at(0.0))));
    segments
}

/// The round-shape reify: translation and scale are absorbable, a rotation
/// has no intrinsic field to land in and stays on the transform.
fn reify_round(attrs: &mut ShapeAttributes, cx: &mut f64, cy: &mut f64, rx: &mut f64, ry: &mut f64) {
    if let Some((sx, sy, tx, ty)) = absorb_scale_translate(attrs) {
        *cx = *cx * sx + tx;
        *cy = *cy * sy + ty;
        *rx *= sx.abs();
        *ry *= sy.abs();
    }
}

impl Shape for Circle {
    fn attributes(&self) -> &ShapeAttributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut ShapeAttributes {
        &mut self.attributes
    }

    fn decompose(&self) -> Vec<PathSegment> {
        decompose_round(self.cx, self.cy, self.r, self.r)
    }

    fn reify(&mut self) {
        let mut rx = self.r;
        let mut ry = self.r;
        let (mut cx, mut cy) = (self.cx, self.cy);
        reify_round(&mut self.attributes, &mut cx, &mut cy, &mut rx, &mut ry);
        self.cx = cx;
        self.cy = cy;
        // A non-uniform scale turns a circle into an ellipse, which this
        // shape cannot express; keep the x radius in that case.
        self.r = rx;
        if (rx - ry).abs() > kerf_geom::GEOMETRY_EPSILON {
            log::warn!("circle reified under non-uniform scale; radius follows x");
        }
    }
}

impl Shape for Ellipse {
    fn attributes(&self) -> &ShapeAttributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut ShapeAttributes {
        &mut self.attributes
    }

    fn decompose(&self) -> Vec<PathSegment> {
        decompose_round(self.cx, self.cy, self.rx, self.ry)
    }

    fn reify(&mut self) {
        let (mut cx, mut cy, mut rx, mut ry) = (self.cx, self.cy, self.rx, self.ry);
        reify_round(&mut self.attributes, &mut cx, &mut cy, &mut rx, &mut ry);
        self.cx = cx;
        self.cy = cy;
        self.rx = rx;
        self.ry = ry;
    }
}

// --- line ---

/// `<line>`. Named for what it is in SVG, distinct from the geometric
/// [`kerf_geom::Line`] segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimpleLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub attributes: ShapeAttributes,
}

impl SimpleLine {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> SimpleLine {
        SimpleLine {
            x1,
            y1,
            x2,
            y2,
            ..SimpleLine::default()
        }
    }
}

impl Shape for SimpleLine {
    fn attributes(&self) -> &ShapeAttributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut ShapeAttributes {
        &mut self.attributes
    }

    fn decompose(&self) -> Vec<PathSegment> {
        vec![
            PathSegment::Move(Move::new(None, point(self.x1, self.y1))),
            line(point(self.x1, self.y1), point(self.x2, self.y2)),
        ]
    }

    /// Lines always reify completely.
    fn reify(&mut self) {
        let m = self.attributes.transform;
        let p1 = m.transform_point(point(self.x1, self.y1));
        let p2 = m.transform_point(point(self.x2, self.y2));
        self.x1 = p1.x;
        self.y1 = p1.y;
        self.x2 = p2.x;
        self.y2 = p2.y;
        self.attributes.transform = Matrix::identity();
    }
}

// --- polyline / polygon ---

/// `<polyline>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    pub attributes: ShapeAttributes,
}

/// `<polygon>`; a polyline with a closing stroke.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub attributes: ShapeAttributes,
}

/// Parses a `points` attribute into coordinate pairs. A trailing odd number
/// is dropped, matching the permissive SVG reading.
pub fn parse_points(src: &str) -> Vec<Point> {
    let values: Vec<f64> = src
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    values
        .chunks_exact(2)
        .map(|pair| point(pair[0], pair[1]))
        .collect()
}

fn decompose_poly(points: &[Point], closed: bool) -> Vec<PathSegment> {
    if points.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::with_capacity(points.len() + 1);
    segments.push(PathSegment::Move(Move::new(None, points[0])));
    for window in points.windows(2) {
        segments.push(line(window[0], window[1]));
    }
    if closed {
        let last = *points.last().unwrap_or(&points[0]);
        segments.push(PathSegment::Close(Close::new(last, points[0])));
    }
    segments
}

fn reify_points(attrs: &mut ShapeAttributes, points: &mut [Point]) {
    let m = attrs.transform;
    for p in points.iter_mut() {
        *p = m.transform_point(*p);
    }
    attrs.transform = Matrix::identity();
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Polyline {
        Polyline {
            points,
            attributes: ShapeAttributes::default(),
        }
    }
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Polygon {
        Polygon {
            points,
            attributes: ShapeAttributes::default(),
        }
    }
}

impl Shape for Polyline {
    fn attributes(&self) -> &ShapeAttributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut ShapeAttributes {
        &mut self.attributes
    }

    fn decompose(&self) -> Vec<PathSegment> {
        decompose_poly(&self.points, false)
    }

    fn reify(&mut self) {
        reify_points(&mut self.attributes, &mut self.points);
    }
}

impl Shape for Polygon {
    fn attributes(&self) -> &ShapeAttributes {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut ShapeAttributes {
        &mut self.attributes
    }

    fn decompose(&self) -> Vec<PathSegment> {
        decompose_poly(&self.points, true)
    }

    fn reify(&mut self) {
        reify_points(&mut self.attributes, &mut self.points);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::utils::point_eq;
    use kerf_geom::RenderContext;

    #[test]
    fn rect_decomposes_to_closed_square() {
        let rect = Rect::new(10.0, 10.0, 40.0, 20.0);
        let segments = rect.decompose();
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0].end(), point(10.0, 10.0));
        assert_eq!(segments[2].end(), point(50.0, 30.0));
        assert!(segments[4].is_close());
        let path = rect.path();
        assert!(path.is_valid());
        assert!((path.length() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn rect_radius_rules() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0).with_radii(Some(2.0), None);
        assert_eq!((r.rx, r.ry), (2.0, 2.0));
        let r = Rect::new(0.0, 0.0, 10.0, 10.0).with_radii(Some(8.0), Some(8.0));
        assert_eq!((r.rx, r.ry), (5.0, 5.0));
        let r = Rect::new(0.0, 0.0, 10.0, 10.0).with_radii(Some(0.0), Some(3.0));
        assert_eq!((r.rx, r.ry), (0.0, 0.0));
    }

    #[test]
    fn rounded_rect_stays_connected() {
        let rect = Rect::new(0.0, 0.0, 20.0, 10.0).with_radii(Some(3.0), Some(2.0));
        let path = rect.path();
        assert!(path.is_valid());
        assert_eq!(path.len(), 10);
    }

    #[test]
    fn rect_reify_translate() {
        // Scenario: rect at (10,10) 40x20 with translate(5,3) reifies to
        // (15,13) with an identity transform.
        let mut rect = Rect::new(10.0, 10.0, 40.0, 20.0);
        rect.attributes.transform =
            Matrix::parse("translate(5, 3)", &RenderContext::with_default_ppi()).unwrap();
        rect.reify();
        assert_eq!(rect.x, 15.0);
        assert_eq!(rect.y, 13.0);
        assert_eq!(rect.width, 40.0);
        assert_eq!(rect.height, 20.0);
        assert!(rect.attributes.transform.is_identity());
    }

    #[test]
    fn rect_reify_keeps_rotation() {
        let mut rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let rotation = Matrix::rotate(Angle::degrees(30.0));
        rect.attributes.transform = rotation;
        rect.reify();
        assert_eq!(rect.attributes.transform, rotation);
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.width, 10.0);
    }

    #[test]
    fn circle_decomposition_on_circle() {
        let c = Circle::new(10.0, 10.0, 5.0);
        let path = c.path();
        assert!(path.is_valid());
        assert!((path.length() - TAU * 5.0).abs() < 1e-6);
        for i in 0..=40 {
            let p = path.sample(i as f64 / 40.0).unwrap();
            let r = ((p.x - 10.0).powi(2) + (p.y - 10.0).powi(2)).sqrt();
            assert!((r - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn ellipse_reify_scale() {
        let mut e = Ellipse::new(1.0, 2.0, 3.0, 4.0);
        e.attributes.transform = Matrix::scale(2.0, 0.5);
        e.reify();
        assert_eq!((e.cx, e.cy), (2.0, 1.0));
        assert_eq!((e.rx, e.ry), (6.0, 2.0));
        assert!(e.attributes.transform.is_identity());
    }

    #[test]
    fn ellipse_rotation_survives_reify() {
        let mut e = Ellipse::new(0.0, 0.0, 3.0, 4.0);
        let m = Matrix::rotate(Angle::degrees(45.0));
        e.attributes.transform = m;
        e.reify();
        assert_eq!(e.attributes.transform, m);
    }

    #[test]
    fn simple_line_reifies_fully() {
        let mut l = SimpleLine::new(0.0, 0.0, 10.0, 0.0);
        l.attributes.transform = Matrix::rotate(Angle::degrees(90.0));
        l.reify();
        assert!(l.attributes.transform.is_identity());
        assert!((l.x2 - 0.0).abs() < 1e-9);
        assert!((l.y2 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn polygon_closes_polyline_does_not() {
        let pts = vec![point(0.0, 0.0), point(10.0, 0.0), point(10.0, 10.0)];
        let open = Polyline::new(pts.clone()).path();
        let closed = Polygon::new(pts).path();
        assert!(!open.segments().last().unwrap().is_close());
        assert!(closed.segments().last().unwrap().is_close());
        assert!(closed.is_valid());
    }

    #[test]
    fn parse_points_forms() {
        let pts = parse_points("0,0 10,0 10,10");
        assert_eq!(pts.len(), 3);
        let pts = parse_points("0 0 10 0 10 10 5");
        assert_eq!(pts.len(), 3);
        assert!(point_eq(pts[2], point(10.0, 10.0)));
    }
}
