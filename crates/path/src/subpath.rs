//! Borrowed subpath windows.
//!
//! A [`Subpath`] is a half-open index window over an owning [`Path`] — the
//! run between one Move and the next. It borrows the path, so the borrow
//! checker enforces what the original design documented in prose: a subpath
//! must not outlive structural changes to its path. Mutation (reversal) goes
//! through [`Path::reverse`] so the parent re-validates connectivity.

use std::ops::Range;

use kerf_geom::{Box2D, Point};

use crate::path::Path;
use crate::segment::PathSegment;
use crate::writer;

/// A view over `path.segments()[range]`.
#[derive(Copy, Clone, Debug)]
pub struct Subpath<'l> {
    path: &'l Path,
    start: usize,
    end: usize,
}

impl<'l> Subpath<'l> {
    pub(crate) fn new(path: &'l Path, range: Range<usize>) -> Subpath<'l> {
        Subpath {
            path,
            start: range.start,
            end: range.end,
        }
    }

    #[inline]
    pub fn segments(&self) -> &'l [PathSegment] {
        &self.path.segments()[self.start..self.end]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Index of this window's first segment in the owning path.
    #[inline]
    pub fn path_index(&self, index: usize) -> usize {
        self.start + index
    }

    pub fn first_point(&self) -> Option<Point> {
        let first = self.segments().first()?;
        Some(first.start().unwrap_or_else(|| first.end()))
    }

    pub fn last_point(&self) -> Option<Point> {
        Some(self.segments().last()?.end())
    }

    /// True when the subpath ends with a Close.
    pub fn is_closed(&self) -> bool {
        matches!(self.segments().last(), Some(PathSegment::Close(_)))
    }

    pub fn length(&self) -> f64 {
        self.segments().iter().map(|s| s.length()).sum()
    }

    pub fn bounding_box(&self) -> Option<Box2D> {
        let mut union: Option<Box2D> = None;
        for segment in self.segments() {
            let b = segment.bounding_box();
            union = Some(match union {
                None => b,
                Some(a) => Box2D {
                    min: kerf_geom::point(a.min.x.min(b.min.x), a.min.y.min(b.min.y)),
                    max: kerf_geom::point(a.max.x.max(b.max.x), a.max.y.max(b.max.y)),
                },
            });
        }
        union
    }

    /// SVG path data for just this window.
    pub fn to_svg_d(&self, relative: bool) -> String {
        writer::svg_d(self.segments(), relative)
    }
}

impl<'l> IntoIterator for Subpath<'l> {
    type Item = &'l PathSegment;
    type IntoIter = std::slice::Iter<'l, PathSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments().iter()
    }
}
