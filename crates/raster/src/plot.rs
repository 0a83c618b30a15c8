//! Integer curve plotting.
//!
//! Zingl-Bresenham rasterization: a lazy error-loop iterator for lines, and
//! the monotone-decomposition plotters for quadratic and cubic béziers —
//! split at axis extrema and inflection points, walk each monotone piece
//! with integer second differences, buffer and reverse the swapped pieces so
//! output stays ordered along the curve. Arcs ride on the cubic plotter via
//! their bézier decomposition.
//!
//! Guarantee: every grid pixel the true curve touches is emitted, no emitted
//! pixel lies farther than one pixel from the true curve, and consecutive
//! pixels are king-move adjacent.

use kerf_path::PathSegment;

/// A plotted pixel: x, y, and 1 for pen-down / 0 for pen-up.
pub type Pixel = (i32, i32, u8);

/// Lazy Zingl-Bresenham line walk.
///
/// Emits every pixel from `(x0, y0)` to `(x1, y1)` inclusive, which is
/// exactly `max(|Δx|, |Δy|) + 1` pixels.
#[derive(Clone, Debug)]
pub struct LinePlot {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    dx: i64,
    dy: i64,
    sx: i64,
    sy: i64,
    err: i64,
    done: bool,
}

impl LinePlot {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> LinePlot {
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        LinePlot {
            x0,
            y0,
            x1,
            y1,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }
}

impl Iterator for LinePlot {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        if self.done {
            return None;
        }
        let out = (self.x0 as i32, self.y0 as i32);
        if self.x0 == self.x1 && self.y0 == self.y1 {
            self.done = true;
            return Some(out);
        }
        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.x0 += self.sx;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.y0 += self.sy;
        }
        Some(out)
    }
}

/// Collects a line walk; handy when a buffer is wanted anyway.
fn line_into(x0: i64, y0: i64, x1: i64, y1: i64, emit: &mut dyn FnMut(i64, i64)) {
    for (x, y) in LinePlot::new(x0 as i32, y0 as i32, x1 as i32, y1 as i32) {
        emit(x as i64, y as i64);
    }
}

/// Plots a limited quadratic segment whose gradient does not change sign.
///
/// When the longer part of the curve lies at the far end the walk starts
/// from there, so those pixels are buffered and replayed reversed to keep
/// the along-curve order.
fn quad_bezier_seg(
    mut x0: i64,
    mut y0: i64,
    x1: f64,
    y1: f64,
    mut x2: i64,
    mut y2: i64,
    emit: &mut dyn FnMut(i64, i64),
) {
    let fsx = x2 as f64 - x1;
    let fsy = y2 as f64 - y1;
    // Relative values for checks.
    let mut xx = x0 as f64 - x1;
    let mut yy = y0 as f64 - y1;
    let mut cur = xx * fsy - yy * fsx;

    debug_assert!(
        xx * fsx <= 0.0 && yy * fsy <= 0.0,
        "sign of gradient must not change"
    );

    let mut reversed: Option<Vec<(i64, i64)>> = None;
    if fsx * fsx + fsy * fsy > xx * xx + yy * yy {
        // Begin with the shorter part: swap P0 and P2.
        x2 = x0;
        x0 = (fsx + x1).round() as i64;
        y2 = y0;
        y0 = (fsy + y1).round() as i64;
        cur = -cur;
        reversed = Some(Vec::new());
    }

    let mut buffer_emit = |x: i64, y: i64, reversed: &mut Option<Vec<(i64, i64)>>,
                           emit: &mut dyn FnMut(i64, i64)| match reversed {
        Some(buf) => buf.push((x, y)),
        None => emit(x, y),
    };

    if cur != 0.0 {
        // No straight line.
        xx += fsx;
        let sx: i64 = if x0 < x2 { 1 } else { -1 };
        xx *= sx as f64;
        yy += fsy;
        let sy: i64 = if y0 < y2 { 1 } else { -1 };
        yy *= sy as f64;
        let mut xy = 2.0 * xx * yy;
        xx *= xx;
        yy *= yy;
        if cur * sx as f64 * (sy as f64) < 0.0 {
            // Negated curvature.
            xx = -xx;
            yy = -yy;
            xy = -xy;
            cur = -cur;
        }
        // Differences of the first degree.
        let mut dx = 4.0 * sy as f64 * cur * (x1 - x0 as f64) + xx - xy;
        let mut dy = 4.0 * sx as f64 * cur * (y0 as f64 - y1) + yy - xy;
        xx += xx;
        yy += yy;
        let mut err = dx + dy + xy;

        loop {
            buffer_emit(x0, y0, &mut reversed, emit);
            if x0 == x2 && y0 == y2 {
                // Last pixel, curve finished.
                if let Some(buf) = reversed {
                    for &(x, y) in buf.iter().rev() {
                        emit(x, y);
                    }
                }
                return;
            }
            let y_step = 2.0 * err < dx;
            if 2.0 * err > dy {
                // x step.
                x0 += sx;
                dx -= xy;
                dy += yy;
                err += dy;
            }
            if y_step {
                // y step.
                y0 += sy;
                dy -= xy;
                dx += xx;
                err += dx;
            }
            if !(dy < 0.0 && 0.0 < dx) {
                // Gradient negates, the algorithm fails past this point.
                break;
            }
        }
    }

    // Plot the remaining straight part to the end.
    line_into(x0, y0, x2, y2, &mut |x, y| {
        buffer_emit(x, y, &mut reversed, emit)
    });
    if let Some(buf) = reversed {
        for &(x, y) in buf.iter().rev() {
            emit(x, y);
        }
    }
}

/// Plots any quadratic bézier by splitting at the axis extrema so every
/// piece is monotone in both x and y.
pub fn quad_bezier(
    x0f: f64,
    y0f: f64,
    x1f: f64,
    y1f: f64,
    x2f: f64,
    y2f: f64,
    emit: &mut dyn FnMut(i64, i64),
) {
    // Endpoints land on the grid; control points are permitted fractional.
    let mut x0 = x0f as i64;
    let mut y0 = y0f as i64;
    let mut x1 = x1f;
    let mut y1 = y1f;
    let mut x2 = x2f as i64;
    let mut y2 = y2f as i64;

    let x = x0 as f64 - x1;
    let y = y0 as f64 - y1;
    let mut t = x0 as f64 - 2.0 * x1 + x2 as f64;

    if x * (x2 as f64 - x1) > 0.0 {
        // Horizontal cut at P4?
        if y * (y2 as f64 - y1) > 0.0 {
            // Vertical cut at P6 too? Which comes first?
            if ((y0 as f64 - 2.0 * y1 + y2 as f64) / t * x).abs() > y.abs() {
                // Swap points so the horizontal cut comes first.
                x0 = x2;
                x2 = (x + x1).round() as i64;
                y0 = y2;
                y2 = (y + y1).round() as i64;
            }
        }
        t = (x0 as f64 - x1) / t;
        let mut r = (1.0 - t) * ((1.0 - t) * y0 as f64 + 2.0 * t * y1) + t * t * y2 as f64;
        t = (x0 as f64 * x2 as f64 - x1 * x1) * t / (x0 as f64 - x1);
        let x_split = (t + 0.5).floor() as i64;
        let y_split = (r + 0.5).floor() as i64;
        r = (y1 - y0 as f64) * (t - x0 as f64) / (x1 - x0 as f64) + y0 as f64;
        quad_bezier_seg(x0, y0, x_split as f64, (r + 0.5).floor(), x_split, y_split, emit);
        r = (y1 - y2 as f64) * (t - x2 as f64) / (x1 - x2 as f64) + y2 as f64;
        x0 = x_split;
        x1 = x_split as f64;
        y0 = y_split;
        y1 = (r + 0.5).floor();
    }
    if (y0 as f64 - y1) * (y2 as f64 - y1) > 0.0 {
        // Vertical cut at P6.
        let t2 = y0 as f64 - 2.0 * y1 + y2 as f64;
        let mut t = (y0 as f64 - y1) / t2;
        let mut r = (1.0 - t) * ((1.0 - t) * x0 as f64 + 2.0 * t * x1) + t * t * x2 as f64;
        t = (y0 as f64 * y2 as f64 - y1 * y1) * t / (y0 as f64 - y1);
        let x_split = (r + 0.5).floor() as i64;
        let y_split = (t + 0.5).floor() as i64;
        r = (x1 - x0 as f64) * (t - y0 as f64) / (y1 - y0 as f64) + x0 as f64;
        quad_bezier_seg(x0, y0, (r + 0.5).floor(), y_split as f64, x_split, y_split, emit);
        r = (x1 - x2 as f64) * (t - y2 as f64) / (y1 - y2 as f64) + x2 as f64;
        x0 = x_split;
        x1 = (r + 0.5).floor();
        y0 = y_split;
        y1 = y_split as f64;
    }
    // Remaining monotone part.
    quad_bezier_seg(x0, y0, x1, y1, x2, y2, emit);
}

/// Plots a limited cubic segment that does not inflect, walking both legs
/// toward the middle; the second leg is buffered and replayed reversed.
#[allow(clippy::too_many_arguments)]
fn cubic_bezier_seg(
    mut x0: i64,
    mut y0: i64,
    x1f: f64,
    y1f: f64,
    x2f: f64,
    y2f: f64,
    mut x3: i64,
    mut y3: i64,
    emit: &mut dyn FnMut(i64, i64),
) {
    let mut second_leg: Vec<(i64, i64)> = Vec::new();
    let mut leg = 1;
    let mut sx: i64 = if x0 < x3 { 1 } else { -1 };
    let mut sy: i64 = if y0 < y3 { 1 } else { -1 };

    let xc = -((x0 as f64 + x1f - x2f - x3 as f64).abs());
    let xa = xc - 4.0 * sx as f64 * (x1f - x2f);
    let mut xb = sx as f64 * (x0 as f64 - x1f - x2f + x3 as f64);
    let yc = -((y0 as f64 + y1f - y2f - y3 as f64).abs());
    let ya = yc - 4.0 * sy as f64 * (y1f - y2f);
    let mut yb = sy as f64 * (y0 as f64 - y1f - y2f + y3 as f64);

    if xa == 0.0 && ya == 0.0 {
        // Degenerates to a quadratic with the midpoint as control.
        let mx = ((3.0 * x1f - x0 as f64 + 1.0) / 2.0).floor();
        let my = ((3.0 * y1f - y0 as f64 + 1.0) / 2.0).floor();
        quad_bezier_seg(x0, y0, mx, my, x3, y3, emit);
        return;
    }

    // Line lengths, +1 to avoid a zero resolution.
    let mut len1 = (x1f - x0 as f64).powi(2) + (y1f - y0 as f64).powi(2) + 1.0;
    let len2 = (x2f - x3 as f64).powi(2) + (y2f - y3 as f64).powi(2) + 1.0;

    loop {
        // Loop over both ends.
        let mut ab = xa * yb - xb * ya;
        let mut ac = xa * yc - xc * ya;
        let mut bc = xb * yc - xc * yb;
        let mut ex = ab * (ab + ac - 3.0 * bc) + ac * ac;
        // Resolution: raised inside a self-intersection loop.
        let f = if ex > 0.0 {
            1.0
        } else {
            (1.0 + 1024.0 / len1).sqrt().floor()
        };
        ab *= f;
        ac *= f;
        bc *= f;
        ex *= f * f;

        let mut xy = 9.0 * (ab + ac + bc) / 8.0;
        let mut cb = 8.0 * (xa - ya);
        let mut dx = 27.0 * (8.0 * ab * (yb * yb - ya * yc) + ex * (ya + 2.0 * yb + yc)) / 64.0
            - ya * ya * (xy - ya);
        let mut dy = 27.0 * (8.0 * ab * (xb * xb - xa * xc) - ex * (xa + 2.0 * xb + xc)) / 64.0
            - xa * xa * (xy + xa);
        // Differences of the second degree.
        let mut xx =
            3.0 * (3.0 * ab * (3.0 * yb * yb - ya * ya - 2.0 * ya * yc) - ya * (3.0 * ac * (ya + yb) + ya * cb))
                / 4.0;
        let mut yy =
            3.0 * (3.0 * ab * (3.0 * xb * xb - xa * xa - 2.0 * xa * xc) - xa * (3.0 * ac * (xa + xb) + xa * cb))
                / 4.0;
        xy = xa * ya * (6.0 * ab + 6.0 * ac - 3.0 * bc + cb);
        ac = ya * ya;
        cb = xa * xa;
        xy = 3.0 * (xy + 9.0 * f * (cb * yb * yc - xb * xc * ac) - 18.0 * xb * yb * ab) / 8.0;

        if ex < 0.0 {
            // Negate values inside the self-intersection loop.
            dx = -dx;
            dy = -dy;
            xx = -xx;
            yy = -yy;
            xy = -xy;
            ac = -ac;
            cb = -cb;
        }
        // Differences of the third degree.
        ab = 6.0 * ya * ac;
        ac = -6.0 * xa * ac;
        bc = 6.0 * ya * cb;
        cb = -6.0 * xa * cb;
        dx += xy;
        ex = dx + dy;
        dy += xy;

        let mut pxy = 0;
        let mut fx = f;
        let mut fy = f;
        'walk: while x0 != x3 && y0 != y3 {
            if leg == 0 {
                second_leg.push((x0, y0));
            } else {
                emit(x0, y0);
            }
            loop {
                // Move sub-steps of one pixel.
                if pxy == 0 && (dx > xy || dy < xy) {
                    break 'walk;
                }
                if pxy == 1 && (dx > 0.0 || dy < 0.0) {
                    break 'walk;
                }
                let y_test = 2.0 * ex - dy;
                if 2.0 * ex >= dx {
                    // x sub-step.
                    fx -= 1.0;
                    dx += xx;
                    ex += dx;
                    xy += ac;
                    dy += xy;
                    yy += bc;
                    xx += ab;
                } else if y_test > 0.0 {
                    break 'walk;
                }
                if y_test <= 0.0 {
                    // y sub-step.
                    fy -= 1.0;
                    dy += yy;
                    ex += dy;
                    xy += bc;
                    dx += xy;
                    xx += ac;
                    yy += cb;
                }
                if !(fx > 0.0 && fy > 0.0) {
                    // Pixel complete.
                    break;
                }
            }
            if 2.0 * fx <= f {
                x0 += sx;
                fx += f;
            }
            if 2.0 * fy <= f {
                y0 += sy;
                fy += f;
            }
            if pxy == 0 && dx < 0.0 && dy > 0.0 {
                // Pixel ahead valid.
                pxy = 1;
            }
        }

        // Swap legs.
        std::mem::swap(&mut x0, &mut x3);
        sx = -sx;
        xb = -xb;
        std::mem::swap(&mut y0, &mut y3);
        sy = -sy;
        yb = -yb;
        len1 = len2;
        if leg == 0 {
            break;
        }
        leg -= 1;
    }

    // Remaining part in case of a cusp or crunode.
    line_into(x3, y3, x0, y0, &mut |x, y| second_leg.push((x, y)));
    for &(x, y) in second_leg.iter().rev() {
        emit(x, y);
    }
}

/// Plots any cubic bézier by splitting at the gradient sign changes so every
/// piece can ride the restricted segment plotter.
#[allow(clippy::too_many_arguments)]
pub fn cubic_bezier(
    x0f: f64,
    y0f: f64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    x3f: f64,
    y3f: f64,
    emit: &mut dyn FnMut(i64, i64),
) {
    let mut x0 = x0f as i64;
    let mut y0 = y0f as i64;
    let x3i = x3f as i64;
    let y3i = y3f as i64;

    let xc = x0 as f64 + x1 - x2 - x3i as f64;
    let xa = xc - 4.0 * (x1 - x2);
    let xb = x0 as f64 - x1 - x2 + x3i as f64;
    let xd = xb + 4.0 * (x1 + x2);
    let yc = y0 as f64 + y1 - y2 - y3i as f64;
    let ya = yc - 4.0 * (y1 - y2);
    let yb = y0 as f64 - y1 - y2 + y3i as f64;
    let yd = yb + 4.0 * (y1 + y2);

    let mut fx0 = x0 as f64;
    let mut fy0 = y0 as f64;
    let mut t: [f64; 5] = [0.0; 5];
    let mut n = 0;

    // Sub-divide the curve at gradient sign changes.
    let mut t1 = xb * xb - xa * xc;
    if xa == 0.0 {
        if xc.abs() < 2.0 * xb.abs() {
            t[n] = xc / (2.0 * xb);
            n += 1;
        }
    } else if t1 > 0.0 {
        let t2 = t1.sqrt();
        t1 = (xb - t2) / xa;
        if t1.abs() < 1.0 {
            t[n] = t1;
            n += 1;
        }
        t1 = (xb + t2) / xa;
        if t1.abs() < 1.0 {
            t[n] = t1;
            n += 1;
        }
    }
    t1 = yb * yb - ya * yc;
    if ya == 0.0 {
        if yc.abs() < 2.0 * yb.abs() {
            t[n] = yc / (2.0 * yb);
            n += 1;
        }
    } else if t1 > 0.0 {
        let t2 = t1.sqrt();
        t1 = (yb - t2) / ya;
        if t1.abs() < 1.0 {
            t[n] = t1;
            n += 1;
        }
        t1 = (yb + t2) / ya;
        if t1.abs() < 1.0 {
            t[n] = t1;
            n += 1;
        }
    }

    // Bubble sort of at most four split points.
    let mut i = 1;
    while i < n {
        let prev = t[i - 1];
        if prev > t[i] {
            t[i - 1] = t[i];
            t[i] = prev;
            i = 0;
        }
        i += 1;
    }

    t1 = -1.0;
    t[n] = 1.0;
    for i in 0..=n {
        // Sub-divide at t[i-1], t[i].
        let t2 = t[i];
        let mut fx1 =
            (t1 * (t1 * xb - 2.0 * xc) - t2 * (t1 * (t1 * xa - 2.0 * xb) + xc) + xd) / 8.0 - fx0;
        let mut fy1 =
            (t1 * (t1 * yb - 2.0 * yc) - t2 * (t1 * (t1 * ya - 2.0 * yb) + yc) + yd) / 8.0 - fy0;
        let mut fx2 =
            (t2 * (t2 * xb - 2.0 * xc) - t1 * (t2 * (t2 * xa - 2.0 * xb) + xc) + xd) / 8.0 - fx0;
        let mut fy2 =
            (t2 * (t2 * yb - 2.0 * yc) - t1 * (t2 * (t2 * ya - 2.0 * yb) + yc) + yd) / 8.0 - fy0;
        let fx3 = (t2 * (t2 * (3.0 * xb - t2 * xa) - 3.0 * xc) + xd) / 8.0;
        fx0 -= fx3;
        let fy3 = (t2 * (t2 * (3.0 * yb - t2 * ya) - 3.0 * yc) + yd) / 8.0;
        fy0 -= fy3;
        // Scale bounds.
        let x3 = (fx3 + 0.5).floor() as i64;
        let y3 = (fy3 + 0.5).floor() as i64;
        if fx0 != 0.0 {
            fx0 = (x0 - x3) as f64 / fx0;
            fx1 *= fx0;
            fx2 *= fx0;
        }
        if fy0 != 0.0 {
            fy0 = (y0 - y3) as f64 / fy0;
            fy1 *= fy0;
            fy2 *= fy0;
        }
        if x0 != x3 || y0 != y3 {
            cubic_bezier_seg(
                x0,
                y0,
                x0 as f64 + fx1,
                y0 as f64 + fy1,
                x0 as f64 + fx2,
                y0 as f64 + fy2,
                x3,
                y3,
                emit,
            );
        }
        x0 = x3;
        y0 = y3;
        fx0 = fx3;
        fy0 = fy3;
        t1 = t2;
    }
}

/// Plots one path segment as pen-tagged pixels.
///
/// A Move contributes its destination with the pen up; everything else is
/// pen-down. Arcs go through their cubic decomposition.
pub fn plot_segment(segment: &PathSegment) -> std::vec::IntoIter<Pixel> {
    let mut out: Vec<Pixel> = Vec::new();
    match segment {
        PathSegment::Move(m) => {
            out.push((m.end.x as i32, m.end.y as i32, 0));
        }
        PathSegment::Line(l) => {
            for (x, y) in LinePlot::new(
                l.start.x as i32,
                l.start.y as i32,
                l.end.x as i32,
                l.end.y as i32,
            ) {
                out.push((x, y, 1));
            }
        }
        PathSegment::Close(c) => {
            for (x, y) in LinePlot::new(
                c.start.x as i32,
                c.start.y as i32,
                c.end.x as i32,
                c.end.y as i32,
            ) {
                out.push((x, y, 1));
            }
        }
        PathSegment::Quadratic(q) => {
            let mut pen_down = |x: i64, y: i64| out.push((x as i32, y as i32, 1));
            quad_bezier(
                q.start.x, q.start.y, q.control.x, q.control.y, q.end.x, q.end.y,
                &mut pen_down,
            );
        }
        PathSegment::Cubic(c) => {
            let mut pen_down = |x: i64, y: i64| out.push((x as i32, y as i32, 1));
            cubic_bezier(
                c.start.x,
                c.start.y,
                c.control1.x,
                c.control1.y,
                c.control2.x,
                c.control2.y,
                c.end.x,
                c.end.y,
                &mut pen_down,
            );
        }
        PathSegment::Arc(arc) => {
            let mut pen_down = |x: i64, y: i64| out.push((x as i32, y as i32, 1));
            arc.for_each_cubic(&mut |c| {
                cubic_bezier(
                    c.start.x,
                    c.start.y,
                    c.control1.x,
                    c.control1.y,
                    c.control2.x,
                    c.control2.y,
                    c.end.x,
                    c.end.y,
                    &mut pen_down,
                );
            });
        }
    }
    out.into_iter()
}

/// Plots a whole path, transform applied, in segment order.
pub fn plot_path(path: &kerf_path::Path) -> impl Iterator<Item = Pixel> {
    path.transformed_segments()
        .into_iter()
        .flat_map(|segment| plot_segment(&segment))
}
