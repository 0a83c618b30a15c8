//! SVG path data emission.
//!
//! Picks the shortest correct command per segment: smooth `S`/`T` variants
//! when the curve continues its predecessor, `H`/`V` for axis-aligned lines,
//! and relative forms on request. Coordinates print with up to 12 fractional
//! digits, trailing zeros stripped.

use kerf_geom::{format_number, Point, POINT_EPSILON};

use crate::segment::PathSegment;

/// Emits path data for a run of segments.
pub fn svg_d(segments: &[PathSegment], relative: bool) -> String {
    let mut out = String::new();
    let mut current: Option<Point> = None;
    let mut previous: Option<&PathSegment> = None;

    for segment in segments {
        if !out.is_empty() {
            out.push(' ');
        }
        match segment {
            PathSegment::Move(m) => {
                // A leading relative move is absolute by definition, so the
                // relative form is only worth it with a pen position.
                match (relative, current) {
                    (true, Some(pen)) => {
                        out.push_str("m ");
                        push_delta(&mut out, m.end, pen);
                    }
                    _ => {
                        out.push_str("M ");
                        push_point(&mut out, m.end);
                    }
                }
            }
            PathSegment::Line(l) => {
                let pen = current.unwrap_or(l.start);
                if (l.start.x - l.end.x).abs() <= POINT_EPSILON {
                    if relative {
                        out.push_str("v ");
                        out.push_str(&format_number(l.end.y - pen.y));
                    } else {
                        out.push_str("V ");
                        out.push_str(&format_number(l.end.y));
                    }
                } else if (l.start.y - l.end.y).abs() <= POINT_EPSILON {
                    if relative {
                        out.push_str("h ");
                        out.push_str(&format_number(l.end.x - pen.x));
                    } else {
                        out.push_str("H ");
                        out.push_str(&format_number(l.end.x));
                    }
                } else if relative {
                    out.push_str("l ");
                    push_delta(&mut out, l.end, pen);
                } else {
                    out.push_str("L ");
                    push_point(&mut out, l.end);
                }
            }
            PathSegment::Quadratic(q) => {
                let pen = current.unwrap_or(q.start);
                let smooth = match previous {
                    Some(PathSegment::Quadratic(prev)) => q.is_smooth_from(prev),
                    _ => false,
                };
                if smooth {
                    out.push_str(if relative { "t " } else { "T " });
                    if relative {
                        push_delta(&mut out, q.end, pen);
                    } else {
                        push_point(&mut out, q.end);
                    }
                } else if relative {
                    out.push_str("q ");
                    push_delta(&mut out, q.control, pen);
                    out.push(' ');
                    push_delta(&mut out, q.end, pen);
                } else {
                    out.push_str("Q ");
                    push_point(&mut out, q.control);
                    out.push(' ');
                    push_point(&mut out, q.end);
                }
            }
            PathSegment::Cubic(c) => {
                let pen = current.unwrap_or(c.start);
                let smooth = match previous {
                    Some(PathSegment::Cubic(prev)) => c.is_smooth_from(prev),
                    _ => false,
                };
                if smooth {
                    out.push_str(if relative { "s " } else { "S " });
                    if relative {
                        push_delta(&mut out, c.control2, pen);
                        out.push(' ');
                        push_delta(&mut out, c.end, pen);
                    } else {
                        push_point(&mut out, c.control2);
                        out.push(' ');
                        push_point(&mut out, c.end);
                    }
                } else if relative {
                    out.push_str("c ");
                    push_delta(&mut out, c.control1, pen);
                    out.push(' ');
                    push_delta(&mut out, c.control2, pen);
                    out.push(' ');
                    push_delta(&mut out, c.end, pen);
                } else {
                    out.push_str("C ");
                    push_point(&mut out, c.control1);
                    out.push(' ');
                    push_point(&mut out, c.control2);
                    out.push(' ');
                    push_point(&mut out, c.end);
                }
            }
            PathSegment::Arc(a) => {
                let pen = current.unwrap_or(a.start);
                let params = a.to_svg_parameters();
                out.push_str(if relative { "a " } else { "A " });
                out.push_str(&format_number(params.rx));
                out.push(',');
                out.push_str(&format_number(params.ry));
                out.push(' ');
                out.push_str(&format_number(params.rotation));
                out.push(' ');
                out.push_str(if params.large_arc { "1" } else { "0" });
                out.push(',');
                out.push_str(if params.sweep { "1" } else { "0" });
                out.push(' ');
                if relative {
                    push_delta(&mut out, params.end, pen);
                } else {
                    push_point(&mut out, params.end);
                }
            }
            PathSegment::Close(_) => {
                out.push_str(if relative { "z" } else { "Z" });
            }
        }
        current = Some(segment.end());
        previous = Some(segment);
    }
    out
}

fn push_point(out: &mut String, p: Point) {
    out.push_str(&format_number(p.x));
    out.push(',');
    out.push_str(&format_number(p.y));
}

fn push_delta(out: &mut String, p: Point, pen: Point) {
    out.push_str(&format_number(p.x - pen.x));
    out.push(',');
    out.push_str(&format_number(p.y - pen.y));
}

#[cfg(test)]
mod tests {
    use crate::path::Path;

    #[test]
    fn absolute_round_trip() {
        let cases = [
            "M 0,0 L 10,5 Z",
            "M 0,0 Q 5,10 10,0 T 20,0",
            "M 0,0 C 10,0 10,10 20,10 S 30,20 40,20",
            "M 0,0 A 50,25 0 0,1 100,0",
            "M 0,0 H 10 V 10 H 0 Z M 20,20 L 25,30",
        ];
        for d in cases {
            let p = Path::parse(d).unwrap();
            let emitted = p.to_svg_d(false);
            let reparsed = Path::parse(&emitted).unwrap();
            assert!(p.approx_eq(&reparsed), "{:?} -> {:?}", d, emitted);
        }
    }

    #[test]
    fn axis_aligned_lines_shorten() {
        let p = Path::parse("M 0,0 L 10,0 L 10,10 L 3,7").unwrap();
        let d = p.to_svg_d(false);
        assert_eq!(d, "M 0,0 H 10 V 10 L 3,7");
    }

    #[test]
    fn smooth_variants_used() {
        let p = Path::parse("M0,0 C10,0 10,10 20,10 S30,20 40,20").unwrap();
        let d = p.to_svg_d(false);
        assert!(d.contains("S "), "{}", d);
        let p = Path::parse("M0,0 Q5,5 10,0 T20,0").unwrap();
        let d = p.to_svg_d(false);
        assert!(d.contains("T "), "{}", d);
    }

    #[test]
    fn arc_emission_matches_input() {
        let p = Path::parse("M0,0 A50,25 0 0 1 100,0").unwrap();
        assert_eq!(p.to_svg_d(false), "M 0,0 A 50,25 0 0,1 100,0");
    }

    #[test]
    fn relative_form_round_trips_geometry() {
        let p = Path::parse("M 5,5 L 15,5 Q 20,10 25,5 C 30,0 35,0 40,5 Z").unwrap();
        let rel = p.to_svg_d(true);
        assert!(rel.starts_with("M 5,5"));
        let reparsed = Path::parse(&rel).unwrap();
        assert!(p.approx_eq(&reparsed), "{}", rel);
    }
}
