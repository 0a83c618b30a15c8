//! The device plot-command wire.
//!
//! The spooler pulls these from completed plans and streams them to the
//! controller; nothing here talks back into the geometry core.

use kerf_path::{Path, PathSegment};

/// One tagged command of the internal device wire.
#[derive(Clone, Debug, PartialEq)]
pub enum PlotCommand {
    LaserOn,
    LaserOff,
    /// Pen-up traversal at rapid speed.
    RapidMove(i32, i32),
    /// Pen-up traversal at work speed.
    Move(i32, i32),
    Cut(i32, i32),
    CutQuad(i32, i32, i32, i32),
    CutCubic(i32, i32, i32, i32, i32, i32),
    HStep(i32),
    VStep(i32),
    Home,
    SetSpeed(f64),
    SetPower(u16),
    SetStep(u16),
    SetDirection(i8, i8),
    ModeCompact,
    ModeDefault,
    ModeConcat,
    SetAbsolute,
    SetIncremental,
    Lock,
    Unlock,
    /// An arbitrary segment handed to the plotter for pixel enumeration.
    Plot(PathSegment),
    Shift(i32, i32),
}

/// Walks a path and emits the natural command sequence: rapid moves with the
/// laser gated off, direct cuts for lines, curve commands for béziers, and
/// whole-segment plots for arcs.
pub fn commands_for_path(path: &Path) -> Vec<PlotCommand> {
    let mut out = Vec::new();
    let mut laser_on = false;

    for segment in path.transformed_segments() {
        match &segment {
            PathSegment::Move(m) => {
                if laser_on {
                    out.push(PlotCommand::LaserOff);
                    laser_on = false;
                }
                out.push(PlotCommand::RapidMove(m.end.x as i32, m.end.y as i32));
            }
            PathSegment::Line(l) => {
                gate_on(&mut out, &mut laser_on);
                out.push(PlotCommand::Cut(l.end.x as i32, l.end.y as i32));
            }
            PathSegment::Close(c) => {
                gate_on(&mut out, &mut laser_on);
                out.push(PlotCommand::Cut(c.end.x as i32, c.end.y as i32));
            }
            PathSegment::Quadratic(q) => {
                gate_on(&mut out, &mut laser_on);
                out.push(PlotCommand::CutQuad(
                    q.control.x as i32,
                    q.control.y as i32,
                    q.end.x as i32,
                    q.end.y as i32,
                ));
            }
            PathSegment::Cubic(c) => {
                gate_on(&mut out, &mut laser_on);
                out.push(PlotCommand::CutCubic(
                    c.control1.x as i32,
                    c.control1.y as i32,
                    c.control2.x as i32,
                    c.control2.y as i32,
                    c.end.x as i32,
                    c.end.y as i32,
                ));
            }
            PathSegment::Arc(_) => {
                gate_on(&mut out, &mut laser_on);
                out.push(PlotCommand::Plot(segment));
            }
        }
    }
    if laser_on {
        out.push(PlotCommand::LaserOff);
    }
    out
}

fn gate_on(out: &mut Vec<PlotCommand>, laser_on: &mut bool) {
    if !*laser_on {
        out.push(PlotCommand::LaserOn);
        *laser_on = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::point;

    #[test]
    fn square_command_sequence() {
        let mut path = Path::new();
        path.move_to(point(10.0, 10.0))
            .line_to(point(20.0, 10.0))
            .line_to(point(20.0, 20.0))
            .close();
        let commands = commands_for_path(&path);
        assert_eq!(
            commands,
            vec![
                PlotCommand::RapidMove(10, 10),
                PlotCommand::LaserOn,
                PlotCommand::Cut(20, 10),
                PlotCommand::Cut(20, 20),
                PlotCommand::Cut(10, 10),
                PlotCommand::LaserOff,
            ]
        );
    }

    #[test]
    fn laser_gates_around_pen_lifts() {
        let mut path = Path::new();
        path.move_to(point(0.0, 0.0))
            .line_to(point(5.0, 0.0))
            .move_to(point(10.0, 0.0))
            .line_to(point(15.0, 0.0));
        let commands = commands_for_path(&path);
        let on_count = commands
            .iter()
            .filter(|c| matches!(c, PlotCommand::LaserOn))
            .count();
        let off_count = commands
            .iter()
            .filter(|c| matches!(c, PlotCommand::LaserOff))
            .count();
        assert_eq!(on_count, 2);
        assert_eq!(off_count, 2);
        assert!(matches!(commands[0], PlotCommand::RapidMove(0, 0)));
    }

    #[test]
    fn curves_emit_curve_commands() {
        let mut path = Path::new();
        path.move_to(point(0.0, 0.0))
            .quadratic_to(point(5.0, 10.0), point(10.0, 0.0))
            .cubic_to(point(12.0, 5.0), point(18.0, 5.0), point(20.0, 0.0));
        let commands = commands_for_path(&path);
        assert!(commands.contains(&PlotCommand::CutQuad(5, 10, 10, 0)));
        assert!(commands.contains(&PlotCommand::CutCubic(12, 5, 18, 5, 20, 0)));
    }
}
