//! SVG path data parsing.
//!
//! A small state machine over a buffered character source that keeps track of
//! line and column for error reporting. Parsing drives the [`Path`] builder
//! verbs directly, so the connectivity bookkeeping (current point, subpath
//! origin, smooth reflections) lives in one place.

use kerf_geom::{point, Angle, Point};
use thiserror::Error;

use crate::path::Path;

#[non_exhaustive]
#[derive(Error, Clone, Debug, PartialEq)]
pub enum PathParseError {
    #[error("Line {line} Column {column}: Expected number, got {src:?}.")]
    Number { src: String, line: i32, column: i32 },
    #[error("Line {line} Column {column}: Expected flag (0/1), got {src:?}.")]
    Flag { src: char, line: i32, column: i32 },
    #[error("Line {line} Column {column}: Invalid command {command:?}.")]
    Command {
        command: char,
        line: i32,
        column: i32,
    },
    #[error("Line {line} Column {column}: Path data must begin with a move-to, got {command:?}.")]
    MissingMoveTo {
        command: char,
        line: i32,
        column: i32,
    },
}

// A buffered iterator of characters keeping track of line and column.
struct Source<'l> {
    src: std::str::Chars<'l>,
    current: char,
    line: i32,
    col: i32,
    finished: bool,
}

impl<'l> Source<'l> {
    fn new(src: &'l str) -> Source<'l> {
        let mut chars = src.chars();
        let (current, finished) = match chars.next() {
            Some(c) => (c, false),
            None => (' ', true),
        };
        let line = if current == '\n' { 1 } else { 0 };
        Source {
            src: chars,
            current,
            line,
            col: 0,
            finished,
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.finished && (self.current.is_whitespace() || self.current == ',') {
            self.advance_one();
        }
    }

    fn advance_one(&mut self) {
        if self.finished {
            return;
        }
        match self.src.next() {
            Some('\n') => {
                self.current = '\n';
                self.line += 1;
                self.col = -1;
            }
            Some(c) => {
                self.current = c;
                self.col += 1;
            }
            None => {
                self.current = '~';
                self.finished = true;
            }
        }
    }
}

/// Parses SVG path data into a [`Path`].
pub fn parse_path(d: &str) -> Result<Path, PathParseError> {
    let mut path = Path::new();
    let mut src = Source::new(d);
    let mut float_buffer = String::new();
    let mut started = false;
    let mut implicit_cmd = 'M';

    src.skip_whitespace();

    while !src.finished {
        let mut cmd = src.current;
        let cmd_line = src.line;
        let cmd_col = src.col;

        if cmd.is_ascii_alphabetic() {
            src.advance_one();
        } else {
            cmd = implicit_cmd;
        }

        if !started && cmd != 'm' && cmd != 'M' {
            return Err(PathParseError::MissingMoveTo {
                command: cmd,
                line: cmd_line,
                column: cmd_col,
            });
        }

        let is_relative = cmd.is_lowercase();
        let pen = || path.current_point().unwrap_or_else(|| point(0.0, 0.0));

        match cmd {
            'm' | 'M' => {
                let to = parse_pair(&mut src, &mut float_buffer, is_relative, pen())?;
                path.move_to(to);
                started = true;
            }
            'l' | 'L' => {
                let to = parse_pair(&mut src, &mut float_buffer, is_relative, pen())?;
                path.line_to(to);
            }
            'h' | 'H' => {
                let mut x = parse_number(&mut src, &mut float_buffer)?;
                if is_relative {
                    x += pen().x;
                }
                path.horizontal_to(x);
            }
            'v' | 'V' => {
                let mut y = parse_number(&mut src, &mut float_buffer)?;
                if is_relative {
                    y += pen().y;
                }
                path.vertical_to(y);
            }
            'q' | 'Q' => {
                let origin = pen();
                let ctrl = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                let to = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                path.quadratic_to(ctrl, to);
            }
            't' | 'T' => {
                let to = parse_pair(&mut src, &mut float_buffer, is_relative, pen())?;
                path.smooth_quadratic_to(to);
            }
            'c' | 'C' => {
                let origin = pen();
                let ctrl1 = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                let ctrl2 = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                let to = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                path.cubic_to(ctrl1, ctrl2, to);
            }
            's' | 'S' => {
                let origin = pen();
                let ctrl2 = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                let to = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                path.smooth_cubic_to(ctrl2, to);
            }
            'a' | 'A' => {
                let origin = pen();
                let rx = parse_number(&mut src, &mut float_buffer)?;
                let ry = parse_number(&mut src, &mut float_buffer)?;
                let rotation = parse_number(&mut src, &mut float_buffer)?;
                let large_arc = parse_flag(&mut src)?;
                let sweep = parse_flag(&mut src)?;
                let to = parse_pair(&mut src, &mut float_buffer, is_relative, origin)?;
                path.arc_to(
                    rx.abs(),
                    ry.abs(),
                    Angle::degrees(rotation),
                    large_arc,
                    sweep,
                    to,
                );
            }
            'z' | 'Z' => {
                path.close();
            }
            _ => {
                return Err(PathParseError::Command {
                    command: cmd,
                    line: cmd_line,
                    column: cmd_col,
                });
            }
        }

        implicit_cmd = match cmd {
            'm' => 'l',
            'M' => 'L',
            'z' => 'm',
            'Z' => 'M',
            c => c,
        };

        src.skip_whitespace();
    }

    Ok(path)
}

fn parse_pair(
    src: &mut Source,
    float_buffer: &mut String,
    is_relative: bool,
    origin: Point,
) -> Result<Point, PathParseError> {
    let mut x = parse_number(src, float_buffer)?;
    let mut y = parse_number(src, float_buffer)?;
    if is_relative {
        x += origin.x;
        y += origin.y;
    }
    Ok(point(x, y))
}

fn parse_number(src: &mut Source, float_buffer: &mut String) -> Result<f64, PathParseError> {
    float_buffer.clear();

    src.skip_whitespace();

    let line = src.line;
    let column = src.col;

    if src.current == '-' || src.current == '+' {
        float_buffer.push(src.current);
        src.advance_one();
    }

    while src.current.is_ascii_digit() && !src.finished {
        float_buffer.push(src.current);
        src.advance_one();
    }

    if src.current == '.' && !src.finished {
        float_buffer.push('.');
        src.advance_one();

        while src.current.is_ascii_digit() && !src.finished {
            float_buffer.push(src.current);
            src.advance_one();
        }
    }

    if (src.current == 'e' || src.current == 'E') && !src.finished {
        float_buffer.push(src.current);
        src.advance_one();

        if src.current == '-' || src.current == '+' {
            float_buffer.push(src.current);
            src.advance_one();
        }

        while src.current.is_ascii_digit() && !src.finished {
            float_buffer.push(src.current);
            src.advance_one();
        }
    }

    match float_buffer.parse::<f64>() {
        Ok(value) => Ok(value),
        Err(_) => Err(PathParseError::Number {
            src: std::mem::take(float_buffer),
            line,
            column,
        }),
    }
}

// Flags may be packed without separators ("01"), which is why this reads a
// single character instead of a number.
fn parse_flag(src: &mut Source) -> Result<bool, PathParseError> {
    src.skip_whitespace();
    match src.current {
        '1' => {
            src.advance_one();
            Ok(true)
        }
        '0' => {
            src.advance_one();
            Ok(false)
        }
        other => Err(PathParseError::Flag {
            src: other,
            line: src.line,
            column: src.col,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::PathSegment;
    use kerf_geom::utils::point_eq;

    #[test]
    fn empty_input() {
        assert!(parse_path("").unwrap().is_empty());
        assert!(parse_path("   ").unwrap().is_empty());
    }

    #[test]
    fn implicit_lineto_after_move() {
        let p = parse_path("M0,0 10,0 10,10 Z").unwrap();
        assert_eq!(p.len(), 4);
        match p[0] {
            PathSegment::Move(m) => {
                assert_eq!(m.start, None);
                assert_eq!(m.end, point(0.0, 0.0));
            }
            _ => panic!(),
        }
        match (&p[1], &p[2]) {
            (PathSegment::Line(a), PathSegment::Line(b)) => {
                assert_eq!(a.end, point(10.0, 0.0));
                assert_eq!(b.end, point(10.0, 10.0));
            }
            _ => panic!(),
        }
        match p[3] {
            PathSegment::Close(c) => {
                assert_eq!(c.start, point(10.0, 10.0));
                assert_eq!(c.end, point(0.0, 0.0));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn smooth_cubic_reflection() {
        let p = parse_path("M0,0 C10,0 10,10 20,10 S30,20 40,20").unwrap();
        assert_eq!(p.len(), 3);
        match p[2] {
            PathSegment::Cubic(c) => {
                // Reflection of (10,10) across (20,10).
                assert!(point_eq(c.control1, point(30.0, 10.0)));
                assert!(point_eq(c.control2, point(30.0, 20.0)));
                assert!(point_eq(c.end, point(40.0, 20.0)));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn smooth_without_previous_curve_uses_current_point() {
        let p = parse_path("M5,5 S10,0 20,0").unwrap();
        match p[1] {
            PathSegment::Cubic(c) => assert!(point_eq(c.control1, point(5.0, 5.0))),
            _ => panic!(),
        }
    }

    #[test]
    fn arc_flags_packed_and_spaced() {
        let spaced = parse_path("M0,0 A50,25 0 0 1 100,0").unwrap();
        let packed = parse_path("M0,0 A50,25 0 01 100,0").unwrap();
        assert!(spaced.approx_eq(&packed));
        match spaced[1] {
            PathSegment::Arc(arc) => {
                assert!((arc.rx() - 50.0).abs() < 1e-9);
                assert!((arc.ry() - 25.0).abs() < 1e-9);
                assert!(arc.sweep > 0.0);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn relative_commands_offset_from_pen() {
        let p = parse_path("m1,1 l2,0 v3 h-2 z m10,10 l1,1").unwrap();
        assert_eq!(p[1].end(), point(3.0, 1.0));
        assert_eq!(p[2].end(), point(3.0, 4.0));
        assert_eq!(p[3].end(), point(1.0, 4.0));
        // After z the pen is back at the subpath origin; the relative move
        // offsets from there.
        assert_eq!(p[5].end(), point(11.0, 11.0));
        assert_eq!(p[6].end(), point(12.0, 12.0));
    }

    #[test]
    fn number_forms() {
        let p = parse_path("M 0.6.5 L 1e-2 -1E3 L .25 +3").unwrap();
        assert!(point_eq(p[0].end(), point(0.6, 0.5)));
        assert!(point_eq(p[1].end(), point(0.01, -1000.0)));
        assert!(point_eq(p[2].end(), point(0.25, 3.0)));
    }

    #[test]
    fn errors_carry_position() {
        match parse_path("M 0 0 L 1 *") {
            Err(PathParseError::Number { line, .. }) => assert_eq!(line, 0),
            other => panic!("{:?}", other),
        }
        match parse_path("x 0 0") {
            Err(PathParseError::MissingMoveTo { command: 'x', .. }) => {}
            other => panic!("{:?}", other),
        }
        match parse_path("M 0 0 A 1 1 0 2 0 5 5") {
            Err(PathParseError::Flag { src: '2', .. }) => {}
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn connectivity_of_parsed_paths() {
        let p = parse_path("M0,0 Q5,10 10,0 T20,0 C25,5 30,5 35,0 A5,5 0 0 1 45,0 Z").unwrap();
        assert!(p.is_valid());
    }
}
