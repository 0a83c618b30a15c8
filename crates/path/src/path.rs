//! The path container.

use std::ops::Range;

use kerf_geom::{
    point, Angle, Box2D, Color, CubicBezier, EllipticalArc, Line, Matrix, Point,
    QuadraticBezier, LENGTH_ERROR, LENGTH_MIN_DEPTH,
};

use crate::parser::{self, PathParseError};
use crate::segment::{Close, Move, PathSegment};
use crate::subpath::Subpath;
use crate::writer;

/// An ordered sequence of path segments with a transform and graphic
/// attributes.
///
/// Segment mutation goes through the container so connectivity can be
/// repaired at the edit site: every non-Move segment starts where its
/// predecessor ended, and every Close points back at its subpath origin.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct Path {
    segments: Vec<PathSegment>,
    pub transform: Matrix,
    pub stroke: Option<Color>,
    pub fill: Option<Color>,
    pub id: Option<String>,
}

impl Path {
    pub fn new() -> Path {
        Path {
            segments: Vec::new(),
            transform: Matrix::identity(),
            stroke: None,
            fill: None,
            id: None,
        }
    }

    /// Parses SVG path data.
    pub fn parse(d: &str) -> Result<Path, PathParseError> {
        parser::parse_path(d)
    }

    #[inline]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First point along the path.
    pub fn first_point(&self) -> Option<Point> {
        let first = self.segments.first()?;
        Some(first.start().unwrap_or_else(|| first.end()))
    }

    /// The pen position after the last segment.
    pub fn current_point(&self) -> Option<Point> {
        Some(self.segments.last()?.end())
    }

    /// The destination a `Z` command would connect to: the end of the most
    /// recent Move, or the first segment's end when there is none.
    pub fn z_point(&self) -> Option<Point> {
        for segment in self.segments.iter().rev() {
            if let PathSegment::Move(m) = segment {
                return Some(m.end);
            }
        }
        self.segments.first().map(|s| s.end())
    }

    /// Reflection of the previous control point, for smooth curve commands.
    /// Coincident with the current point when the last command was not a
    /// curve of the matching kind.
    pub fn smooth_point(&self) -> Option<Point> {
        let current = self.current_point()?;
        Some(match self.segments.last() {
            Some(PathSegment::Quadratic(q)) => {
                kerf_geom::utils::reflected_across(q.control, current)
            }
            Some(PathSegment::Cubic(c)) => {
                kerf_geom::utils::reflected_across(c.control2, current)
            }
            _ => current,
        })
    }

    // --- builder verbs ---

    pub fn move_to(&mut self, p: Point) -> &mut Path {
        let start = self.current_point();
        self.segments.push(PathSegment::Move(Move::new(start, p)));
        self
    }

    pub fn line_to(&mut self, p: Point) -> &mut Path {
        let start = self.pen();
        self.segments.push(PathSegment::Line(Line::new(start, p)));
        self
    }

    pub fn horizontal_to(&mut self, x: f64) -> &mut Path {
        let start = self.pen();
        self.line_to(point(x, start.y))
    }

    pub fn vertical_to(&mut self, y: f64) -> &mut Path {
        let start = self.pen();
        self.line_to(point(start.x, y))
    }

    pub fn quadratic_to(&mut self, control: Point, end: Point) -> &mut Path {
        let start = self.pen();
        self.segments
            .push(PathSegment::Quadratic(QuadraticBezier::new(
                start, control, end,
            )));
        self
    }

    pub fn smooth_quadratic_to(&mut self, end: Point) -> &mut Path {
        let control = match self.segments.last() {
            Some(PathSegment::Quadratic(_)) => self.smooth_point().unwrap_or_else(|| end),
            _ => self.pen(),
        };
        self.quadratic_to(control, end)
    }

    pub fn cubic_to(&mut self, control1: Point, control2: Point, end: Point) -> &mut Path {
        let start = self.pen();
        self.segments.push(PathSegment::Cubic(CubicBezier::new(
            start, control1, control2, end,
        )));
        self
    }

    pub fn smooth_cubic_to(&mut self, control2: Point, end: Point) -> &mut Path {
        let control1 = match self.segments.last() {
            Some(PathSegment::Cubic(_)) => self.smooth_point().unwrap_or_else(|| end),
            _ => self.pen(),
        };
        self.cubic_to(control1, control2, end)
    }

    /// Arc in the SVG endpoint parameterization.
    pub fn arc_to(
        &mut self,
        rx: f64,
        ry: f64,
        rotation: Angle,
        large_arc: bool,
        sweep: bool,
        end: Point,
    ) -> &mut Path {
        let start = self.pen();
        self.segments
            .push(PathSegment::Arc(EllipticalArc::from_svg_parameters(
                start, rx, ry, rotation, large_arc, sweep, end,
            )));
        self
    }

    pub fn close(&mut self) -> &mut Path {
        let start = self.pen();
        let end = self.z_point().unwrap_or(start);
        self.segments.push(PathSegment::Close(Close::new(start, end)));
        self
    }

    fn pen(&self) -> Point {
        self.current_point().unwrap_or_else(|| point(0.0, 0.0))
    }

    // --- structural edits ---

    /// Appends a segment, repairing its start against the current pen.
    pub fn push(&mut self, segment: PathSegment) {
        let index = self.segments.len();
        self.segments.push(segment);
        if index > 0 {
            self.repair_joint(index);
        }
        if self.segments[index].is_close() {
            self.repair_close(index);
        }
    }

    pub fn insert(&mut self, index: usize, segment: PathSegment) {
        self.segments.insert(index, segment);
        self.repair_joint(index);
        self.repair_joint(index + 1);
        match self.segments[index] {
            PathSegment::Move(_) => self.repair_close_after_move(index),
            PathSegment::Close(_) => self.repair_close(index),
            _ => {}
        }
    }

    pub fn remove(&mut self, index: usize) -> PathSegment {
        let removed = self.segments.remove(index);
        if index < self.segments.len() {
            self.repair_joint(index);
        }
        removed
    }

    pub fn replace(&mut self, index: usize, segment: PathSegment) -> PathSegment {
        let old = std::mem::replace(&mut self.segments[index], segment);
        self.repair_joint(index);
        self.repair_joint(index + 1);
        match self.segments[index] {
            PathSegment::Move(_) => self.repair_close_after_move(index),
            PathSegment::Close(_) => self.repair_close(index),
            _ => {}
        }
        old
    }

    /// The joint between `index - 1` and `index`; the earlier side is
    /// authoritative.
    fn repair_joint(&mut self, index: usize) {
        if index == 0 || index >= self.segments.len() {
            return;
        }
        let prev_end = self.segments[index - 1].end();
        match self.segments[index].start() {
            Some(start) if kerf_geom::utils::point_eq(start, prev_end) => {}
            _ => self.segments[index].set_start(prev_end),
        }
    }

    /// Re-points the Close at `index` to its subpath's Move.
    fn repair_close(&mut self, index: usize) {
        for i in (0..index).rev() {
            if let PathSegment::Move(m) = self.segments[i] {
                self.segments[index].set_end(m.end);
                return;
            }
        }
        if index > 0 {
            let anchor = self.segments[0].end();
            self.segments[index].set_end(anchor);
        }
    }

    /// After a Move edit, re-points the next Close in the same subpath.
    fn repair_close_after_move(&mut self, index: usize) {
        let end = self.segments[index].end();
        for i in index + 1..self.segments.len() {
            match self.segments[i] {
                PathSegment::Move(_) => return,
                PathSegment::Close(_) => {
                    self.segments[i].set_end(end);
                    return;
                }
                _ => {}
            }
        }
    }

    /// Full connectivity scan: links every joint and re-points every Close.
    pub fn validate_connections(&mut self) {
        let mut z_point: Option<Point> = None;
        for i in 0..self.segments.len() {
            if z_point.is_none() || self.segments[i].is_move() {
                z_point = Some(self.segments[i].end());
            }
            if i > 0 {
                self.repair_joint(i);
            }
            if self.segments[i].is_close() {
                if let Some(z) = z_point {
                    self.segments[i].set_end(z);
                }
            }
        }
    }

    /// True when every adjacent pair is connected and every Close points at
    /// its subpath origin.
    pub fn is_valid(&self) -> bool {
        let mut z_point: Option<Point> = None;
        for (i, segment) in self.segments.iter().enumerate() {
            if z_point.is_none() || segment.is_move() {
                z_point = Some(segment.end());
            }
            if i > 0 && !segment.is_move() && !segment.connects_to(&self.segments[i - 1]) {
                return false;
            }
            if let PathSegment::Close(c) = segment {
                match z_point {
                    Some(z)
                        if (c.end.x - z.x).abs() <= kerf_geom::GEOMETRY_EPSILON
                            && (c.end.y - z.y).abs() <= kerf_geom::GEOMETRY_EPSILON => {}
                    _ => return false,
                }
            }
        }
        true
    }

    // --- measurement ---

    /// Total drawn length, transform not applied.
    pub fn length(&self) -> f64 {
        self.length_with(LENGTH_ERROR, LENGTH_MIN_DEPTH)
    }

    pub fn length_with(&self, error: f64, min_depth: u32) -> f64 {
        self.segments
            .iter()
            .map(|s| s.length_with(error, min_depth))
            .sum()
    }

    /// Point at `position` in `[0, 1]` along the drawn length.
    pub fn sample(&self, position: f64) -> Option<Point> {
        if self.segments.is_empty() {
            return None;
        }
        if position <= 0.0 {
            return Some(self.segments[0].sample(0.0));
        }
        if position >= 1.0 {
            return Some(self.segments[self.segments.len() - 1].sample(1.0));
        }
        let lengths: Vec<f64> = self.segments.iter().map(|s| s.length()).collect();
        let total: f64 = lengths.iter().sum();
        if total <= 0.0 {
            return Some(self.segments[0].sample(0.0));
        }
        let mut segment_start = 0.0;
        for (segment, len) in self.segments.iter().zip(&lengths) {
            let weight = len / total;
            if weight <= 0.0 {
                continue;
            }
            let segment_end = segment_start + weight;
            if segment_end >= position {
                return Some(segment.sample((position - segment_start) / weight));
            }
            segment_start = segment_end;
        }
        Some(self.segments[self.segments.len() - 1].sample(1.0))
    }

    /// Bounding box of the drawn geometry with the transform applied.
    pub fn bounding_box(&self) -> Option<Box2D> {
        if self.transform.is_identity() {
            return self.local_bounding_box();
        }
        let mut union: Option<Box2D> = None;
        for segment in &self.segments {
            let mut s = *segment;
            s.transform(&self.transform);
            union = Some(union_box(union, s.bounding_box()));
        }
        union
    }

    /// Bounding box ignoring the transform.
    pub fn local_bounding_box(&self) -> Option<Box2D> {
        let mut union: Option<Box2D> = None;
        for segment in &self.segments {
            union = Some(union_box(union, segment.bounding_box()));
        }
        union
    }

    // --- transforms ---

    /// Composes `m` to apply after the current transform.
    pub fn post_transform(&mut self, m: &Matrix) {
        self.transform.post_cat(m);
    }

    /// Folds the transform into segment coordinates. Paths reify exactly.
    pub fn reify(&mut self) -> &mut Path {
        for segment in &mut self.segments {
            segment.transform(&self.transform);
        }
        self.transform = Matrix::identity();
        self
    }

    /// Segments with the transform applied, leaving the path untouched.
    pub fn transformed_segments(&self) -> Vec<PathSegment> {
        self.segments
            .iter()
            .map(|segment| {
                let mut s = *segment;
                s.transform(&self.transform);
                s
            })
            .collect()
    }

    // --- subpaths ---

    /// Index ranges split at every Move boundary after the first segment.
    pub(crate) fn subpath_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut last = 0;
        for (current, segment) in self.segments.iter().enumerate() {
            if current != last && segment.is_move() {
                ranges.push(last..current);
                last = current;
            }
        }
        if !self.segments.is_empty() {
            ranges.push(last..self.segments.len());
        }
        ranges
    }

    pub fn as_subpaths(&self) -> impl Iterator<Item = Subpath<'_>> {
        self.subpath_ranges()
            .into_iter()
            .map(move |range| Subpath::new(self, range))
    }

    pub fn subpath(&self, index: usize) -> Option<Subpath<'_>> {
        let range = self.subpath_ranges().into_iter().nth(index)?;
        Some(Subpath::new(self, range))
    }

    pub fn count_subpaths(&self) -> usize {
        self.subpath_ranges().len()
    }

    /// Reverses one subpath in place, re-validating its joints. Returns
    /// false when the index is out of range.
    pub fn reverse_subpath(&mut self, index: usize) -> bool {
        let range = match self.subpath_ranges().into_iter().nth(index) {
            Some(range) => range,
            None => return false,
        };
        self.reverse_range(range);
        self.validate_connections();
        true
    }

    /// Reverses the path: every subpath in place, then the subpath order.
    pub fn reverse(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        let prepoint = self.segments[0].start();
        let ranges = self.subpath_ranges();
        for range in &ranges {
            self.reverse_range(range.clone());
        }
        let mut reordered = Vec::with_capacity(self.segments.len());
        for range in ranges.iter().rev() {
            reordered.extend_from_slice(&self.segments[range.clone()]);
        }
        self.segments = reordered;
        self.validate_connections();
        match (self.segments.first_mut(), prepoint) {
            (Some(first), Some(p)) => first.set_start(p),
            (Some(PathSegment::Move(m)), None) => m.start = None,
            _ => {}
        }
    }

    /// Reverses the drawing run of one subpath in place.
    ///
    /// The Move stays at position 0 but is re-pointed at the new first
    /// drawing segment; a trailing Close is flipped and re-anchored.
    fn reverse_range(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let has_close = self.segments[range.end - 1].is_close();
        let has_move = self.segments[range.start].is_move();
        let mut i = range.start as i64 + has_move as i64;
        let mut j = range.end as i64 - 1 - has_close as i64;
        while i < j {
            let a = self.segments[i as usize].reversed();
            let b = self.segments[j as usize].reversed();
            self.segments[i as usize] = b;
            self.segments[j as usize] = a;
            i += 1;
            j -= 1;
        }
        if i == j {
            self.segments[i as usize] = self.segments[i as usize].reversed();
        }

        if has_move && range.len() > 1 {
            if let Some(next_start) = self.segments[range.start + 1].start() {
                self.segments[range.start].set_end(next_start);
            }
        }
        if has_close {
            let ci = range.end - 1;
            let prev_end = if ci > range.start {
                self.segments[ci - 1].end()
            } else {
                self.segments[ci].end()
            };
            let origin = self.segments[range.start].end();
            self.segments[ci].set_start(prev_end);
            self.segments[ci].set_end(origin);
        }
    }

    // --- emission ---

    /// SVG path data for the transformed geometry.
    pub fn to_svg_d(&self, relative: bool) -> String {
        if self.transform.is_identity() {
            writer::svg_d(&self.segments, relative)
        } else {
            writer::svg_d(&self.transformed_segments(), relative)
        }
    }

    /// Per-segment tolerance-based equality.
    pub fn approx_eq(&self, other: &Path) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.approx_eq(b))
    }
}

fn union_box(acc: Option<Box2D>, b: Box2D) -> Box2D {
    match acc {
        None => b,
        Some(a) => Box2D {
            min: point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
            max: point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
        },
    }
}

impl Extend<PathSegment> for Path {
    fn extend<T: IntoIterator<Item = PathSegment>>(&mut self, iter: T) {
        for segment in iter {
            self.push(segment);
        }
    }
}

impl std::iter::FromIterator<PathSegment> for Path {
    fn from_iter<T: IntoIterator<Item = PathSegment>>(iter: T) -> Path {
        let mut path = Path::new();
        path.extend(iter);
        path
    }
}

impl std::ops::Index<usize> for Path {
    type Output = PathSegment;
    fn index(&self, index: usize) -> &PathSegment {
        &self.segments[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::utils::point_eq;

    fn square() -> Path {
        let mut p = Path::new();
        p.move_to(point(0.0, 0.0))
            .line_to(point(10.0, 0.0))
            .line_to(point(10.0, 10.0))
            .line_to(point(0.0, 10.0))
            .close();
        p
    }

    #[test]
    fn builder_connectivity() {
        let p = square();
        assert!(p.is_valid());
        assert_eq!(p.len(), 5);
        match p[4] {
            PathSegment::Close(c) => {
                assert_eq!(c.start, point(0.0, 10.0));
                assert_eq!(c.end, point(0.0, 0.0));
            }
            _ => panic!("expected close"),
        }
    }

    #[test]
    fn replace_repairs_neighbors() {
        let mut p = square();
        p.replace(
            1,
            PathSegment::Line(Line::new(point(50.0, 50.0), point(20.0, 0.0))),
        );
        assert!(p.is_valid());
        // The replaced segment keeps the joint with its predecessor.
        assert_eq!(p[1].start(), Some(point(0.0, 0.0)));
        assert_eq!(p[2].start(), Some(point(20.0, 0.0)));
    }

    #[test]
    fn remove_relinks() {
        let mut p = square();
        p.remove(2);
        assert!(p.is_valid());
        assert_eq!(p[2].start(), Some(point(10.0, 0.0)));
    }

    #[test]
    fn move_edit_repoints_close() {
        let mut p = square();
        p.replace(0, PathSegment::Move(Move::new(None, point(5.0, 5.0))));
        match p[4] {
            PathSegment::Close(c) => assert_eq!(c.end, point(5.0, 5.0)),
            _ => panic!("expected close"),
        }
    }

    #[test]
    fn length_of_square() {
        assert!((square().length() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn sample_walks_perimeter() {
        let p = square();
        assert!(point_eq(p.sample(0.0).unwrap(), point(0.0, 0.0)));
        // A quarter of the perimeter is the first corner.
        assert!(point_eq(p.sample(0.25).unwrap(), point(10.0, 0.0)));
        assert!(point_eq(p.sample(0.5).unwrap(), point(10.0, 10.0)));
        assert!(point_eq(p.sample(1.0).unwrap(), point(0.0, 0.0)));
    }

    #[test]
    fn reify_equals_transform_then_sample() {
        let mut p = square();
        p.transform = Matrix::parse(
            "translate(3,4) scale(2)",
            &kerf_geom::RenderContext::with_default_ppi(),
        )
        .unwrap();
        let expected: Vec<Point> = (0..=10)
            .map(|i| {
                let t = i as f64 / 10.0;
                p.transform.transform_point(p.sample(t).unwrap())
            })
            .collect();
        p.reify();
        assert!(p.transform.is_identity());
        for (i, want) in expected.iter().enumerate() {
            let t = i as f64 / 10.0;
            let got = p.sample(t).unwrap();
            assert!((got.x - want.x).abs() < 1e-9);
            assert!((got.y - want.y).abs() < 1e-9);
        }
    }

    #[test]
    fn bounding_box_contains_samples() {
        let mut p = Path::new();
        p.move_to(point(0.0, 0.0))
            .cubic_to(point(10.0, 20.0), point(30.0, -20.0), point(40.0, 0.0))
            .arc_to(10.0, 5.0, Angle::degrees(0.0), false, true, point(60.0, 0.0));
        let b = p.bounding_box().unwrap();
        for i in 0..=100 {
            let s = p.sample(i as f64 / 100.0).unwrap();
            assert!(s.x >= b.min.x - 1e-9 && s.x <= b.max.x + 1e-9);
            assert!(s.y >= b.min.y - 1e-9 && s.y <= b.max.y + 1e-9);
        }
    }

    #[test]
    fn subpath_split() {
        let mut p = Path::new();
        p.move_to(point(0.0, 0.0))
            .line_to(point(5.0, 0.0))
            .move_to(point(10.0, 0.0))
            .line_to(point(15.0, 0.0))
            .close();
        assert_eq!(p.count_subpaths(), 2);
        let first = p.subpath(0).unwrap();
        assert_eq!(first.len(), 2);
        let second = p.subpath(1).unwrap();
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn reverse_single_subpath() {
        let mut p = Path::new();
        p.move_to(point(0.0, 0.0))
            .line_to(point(10.0, 0.0))
            .line_to(point(10.0, 10.0));
        p.reverse();
        assert!(p.is_valid());
        assert!(p[0].is_move());
        assert_eq!(p[0].end(), point(10.0, 10.0));
        assert_eq!(p[1].start(), Some(point(10.0, 10.0)));
        assert_eq!(p[2].end(), point(0.0, 0.0));
    }

    #[test]
    fn reverse_closed_path_stays_valid() {
        let mut p = square();
        p.reverse();
        assert!(p.is_valid(), "{:?}", p.segments());
        assert!(p[0].is_move());
        assert!(p[p.len() - 1].is_close());
    }

    #[test]
    fn reverse_reorders_subpaths() {
        let mut p = Path::new();
        p.move_to(point(0.0, 0.0))
            .line_to(point(5.0, 0.0))
            .move_to(point(100.0, 0.0))
            .line_to(point(105.0, 0.0));
        p.reverse();
        assert!(p.is_valid());
        // The second subpath now comes first, itself reversed.
        assert_eq!(p[0].end(), point(105.0, 0.0));
        assert_eq!(p[1].end(), point(100.0, 0.0));
        assert_eq!(p[3].end(), point(0.0, 0.0));
    }
}
