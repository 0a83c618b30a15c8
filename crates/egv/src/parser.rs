//! `.egv` stream parsing.
//!
//! The byte language: lowercase `a..y` accumulate distance increments of
//! 1..25, `z` adds 255, `|` adds 26; digits accumulate a base-10 numeric
//! parameter for the speed codes; uppercase letters and `@` terminate the
//! current run and begin a new command. The header ends after three
//! newlines followed by five `%` bytes.
//!
//! Interpretation: `B`/`T`/`L`/`R` step right/left/top/bottom, `M` moves on
//! the current diagonal, `D`/`U` gate the laser, `S1` enters compact mode
//! and latches the accumulated speed code, `N` leaves it, `F`/`@` finish and
//! reset. When the latched speed code carries a raster step, the plot runs
//! in harmonic raster mode: every horizontal direction reversal adds one
//! vertical step of `raster_step`.

use kerf_geom::point;
use kerf_path::Path;

use crate::raster::EgvRaster;

const CMD_RIGHT: u8 = b'B';
const CMD_LEFT: u8 = b'T';
const CMD_TOP: u8 = b'L';
const CMD_BOTTOM: u8 = b'R';
const CMD_FINISH: u8 = b'F';
const CMD_ANGLE: u8 = b'M';
const CMD_RESET: u8 = b'@';
const CMD_ON: u8 = b'D';
const CMD_OFF: u8 = b'U';
const CMD_POP: u8 = b'P';
const CMD_G: u8 = b'G';
const CMD_INTERRUPT: u8 = b'I';
const CMD_N: u8 = b'N';
const CMD_CUT: u8 = b'C';
const CMD_VELOCITY: u8 = b'V';
const CMD_S: u8 = b'S';
const CMD_E: u8 = b'E';

/// Low-level tokenizer: yields `(command, distance, number)` triples.
#[derive(Debug, Default)]
pub struct EgvParser {
    command: Option<u8>,
    distance: u32,
    number: u32,
}

impl EgvParser {
    pub fn new() -> EgvParser {
        EgvParser::default()
    }

    /// Tokenizes a byte slice; the trailing in-flight command is flushed.
    pub fn tokenize(&mut self, data: &[u8]) -> Vec<(u8, u32, u32)> {
        let mut out = Vec::new();
        for &byte in data {
            match byte {
                b'0'..=b'9' => {
                    self.number = self.number * 10 + (byte - b'0') as u32;
                }
                b'a'..=b'y' => {
                    self.distance += (byte - b'a') as u32 + 1;
                }
                b'z' => {
                    self.distance += 255;
                }
                b'|' => {
                    self.distance += 26;
                }
                b'A'..=b'Z' | b'@' => {
                    if let Some(command) = self.command {
                        out.push((command, self.distance, self.number));
                    }
                    self.distance = 0;
                    self.number = 0;
                    self.command = Some(byte);
                }
                _ => {}
            }
        }
        if let Some(command) = self.command.take() {
            out.push((command, self.distance, self.number));
            self.distance = 0;
            self.number = 0;
        }
        out
    }
}

/// Skips the header: three `\n`, then five `%`. When the pattern is absent
/// the stream is taken from the start.
fn skip_header(data: &[u8]) -> &[u8] {
    let mut pos = 0;
    for (count, byte) in [(3usize, b'\n'), (5usize, b'%')] {
        let mut remaining = count;
        let mut scan = pos;
        while remaining > 0 {
            match data[scan..].iter().position(|&b| b == byte) {
                Some(offset) => {
                    scan += offset + 1;
                    remaining -= 1;
                }
                None => return &data[pos..],
            }
        }
        pos = scan;
    }
    &data[pos..]
}

/// The speed-code fragments latched when compact mode is entered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SpeedCode {
    /// A `C` fragment was present (cut-speed range).
    pub cut_range: bool,
    /// The `V` parameter, the raw period value.
    pub value: u32,
    /// The `G` parameter: the raster step in mils; zero for vector jobs.
    pub raster_step: u16,
}

impl SpeedCode {
    /// Speed from the board's period equation `value = b + m / speed`.
    /// The per-board constants live with the device layer.
    pub fn speed_for(&self, b: f64, m: f64) -> Option<f64> {
        let denominator = self.value as f64 - b;
        if denominator <= 0.0 {
            return None;
        }
        Some(m / denominator)
    }
}

/// One compact run of an engrave stream.
#[derive(Clone, Debug, Default)]
pub struct EgvBlock {
    /// Vector geometry, in device mils.
    pub path: Path,
    /// Raster marks, when the run was in harmonic raster mode.
    pub raster: EgvRaster,
    pub speed_code: Option<SpeedCode>,
    pub raster_step: u16,
}

struct EgvPlotter {
    path: Path,
    raster: EgvRaster,
    x: i32,
    y: i32,
    cutting: bool,
    raster_mode: bool,
    raster_step: u16,
}

impl EgvPlotter {
    fn new(x: i32, y: i32) -> EgvPlotter {
        EgvPlotter {
            path: Path::new(),
            raster: EgvRaster::new(),
            x,
            y,
            cutting: false,
            raster_mode: false,
            raster_step: 0,
        }
    }

    fn cut(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        if self.raster_mode {
            if self.cutting && dy == 0 {
                for d in 0..dx {
                    self.raster.set(self.x + d, self.y, 1);
                }
            }
        } else if self.cutting {
            self.path
                .line_to(point((self.x + dx) as f64, (self.y + dy) as f64));
        } else {
            self.path
                .move_to(point((self.x + dx) as f64, (self.y + dy) as f64));
        }
        self.x += dx;
        self.y += dy;
    }

    fn vstep(&mut self) {
        let step = self.raster_step as i32;
        self.cut(0, step);
    }

    fn on(&mut self) {
        if !self.raster_mode {
            self.path.move_to(point(self.x as f64, self.y as f64));
        }
        self.cutting = true;
    }

    fn off(&mut self) {
        self.cutting = false;
    }

    fn into_block(self, speed_code: Option<SpeedCode>) -> EgvBlock {
        EgvBlock {
            path: self.path,
            raster: self.raster,
            speed_code,
            raster_step: self.raster_step,
        }
    }
}

/// Interprets an engrave stream into its compact-run blocks.
pub fn parse_egv(data: &[u8]) -> Vec<EgvBlock> {
    let body = skip_header(data);
    let tokens = EgvParser::new().tokenize(body);

    let mut blocks = Vec::new();
    let mut plotter = EgvPlotter::new(0, 0);
    let mut pending_speed = SpeedCode::default();
    let mut latched_speed: Option<SpeedCode> = None;
    let mut is_compact = false;
    let mut is_left = false;
    let mut is_top = false;
    let mut is_reset = false;
    let mut is_harmonic = false;

    for (cmd, distance_run, number) in tokens {
        let distance = (distance_run + number) as i32;
        match cmd {
            CMD_RIGHT => {
                plotter.cut(distance, 0);
                if is_harmonic && is_left {
                    plotter.vstep();
                }
                is_left = false;
            }
            CMD_LEFT => {
                plotter.cut(-distance, 0);
                if is_harmonic && !is_left {
                    plotter.vstep();
                }
                is_left = true;
            }
            CMD_BOTTOM => {
                plotter.cut(0, distance);
                is_top = false;
            }
            CMD_TOP => {
                plotter.cut(0, -distance);
                is_top = true;
            }
            CMD_ANGLE => {
                let dx = if is_left { -distance } else { distance };
                let dy = if is_top { -distance } else { distance };
                plotter.cut(dx, dy);
            }
            CMD_ON => plotter.on(),
            CMD_OFF => plotter.off(),
            CMD_S => {
                if number == 1 {
                    // S1: enter compact mode with the latched speed code.
                    is_reset = false;
                    is_compact = true;
                    let speed = pending_speed;
                    pending_speed = SpeedCode::default();
                    let (x, y) = (plotter.x, plotter.y);
                    blocks.push(std::mem::replace(&mut plotter, EgvPlotter::new(x, y))
                        .into_block(latched_speed));
                    latched_speed = Some(speed);
                    plotter.raster_step = speed.raster_step;
                    if speed.raster_step != 0 {
                        is_harmonic = true;
                        plotter.raster_mode = true;
                    }
                } else if !is_compact && !is_reset {
                    // Jumped out of compact and back in.
                    is_compact = true;
                }
            }
            CMD_N => {
                if is_compact {
                    is_compact = false;
                }
            }
            CMD_FINISH | CMD_RESET => {
                is_reset = true;
                pending_speed = SpeedCode::default();
                if is_compact {
                    is_compact = false;
                    is_harmonic = false;
                    let (x, y) = (plotter.x, plotter.y);
                    blocks.push(std::mem::replace(&mut plotter, EgvPlotter::new(x, y))
                        .into_block(latched_speed));
                    latched_speed = None;
                }
            }
            CMD_CUT => pending_speed.cut_range = true,
            CMD_VELOCITY => pending_speed.value = number,
            CMD_G => pending_speed.raster_step = number as u16,
            CMD_E | CMD_POP | CMD_INTERRUPT => {}
            other => log::debug!("unknown egv command {:?} skipped", other as char),
        }
    }
    blocks.push(plotter.into_block(latched_speed));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_accumulates_distances() {
        let mut parser = EgvParser::new();
        // 'a' = 1, 'y' = 25, 'z' = 255, '|' = 26; digits build the number.
        let tokens = parser.tokenize(b"Baz|Ty12D");
        assert_eq!(
            tokens,
            vec![
                (b'B', 1 + 255 + 26, 0),
                (b'T', 25, 12),
                (b'D', 0, 0),
            ]
        );
    }

    #[test]
    fn header_skipping() {
        let data = b"header line\nmore\nlast\n%%%%%Bab";
        let body = skip_header(data);
        assert_eq!(body, b"Bab");
        // Without the pattern the stream starts at the beginning.
        assert_eq!(skip_header(b"Bab"), b"Bab");
    }

    #[test]
    fn vector_cut_builds_path() {
        // Laser on, right 10 ('j'), bottom 5 ('e'), laser off, right 3 ('c').
        let blocks = parse_egv(b"\n\n\n%%%%%DBjReUBcF");
        let last = blocks.last().unwrap();
        let segments = last.path.segments();
        // On at origin, two cuts, then a pen-up move.
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[1].end(), kerf_geom::point(10.0, 0.0));
        assert_eq!(segments[2].end(), kerf_geom::point(10.0, 5.0));
        assert!(segments[3].is_move());
        assert_eq!(segments[3].end(), kerf_geom::point(13.0, 5.0));
    }

    #[test]
    fn compact_mode_latches_speed_and_step() {
        // Speed code CV1234 G002, then S1 enters compact raster mode.
        let stream = b"\n\n\n%%%%%CV1234G002S1EDbBUF";
        let blocks = parse_egv(stream);
        // The compact run is finished by F, so it is the second block.
        let compact = &blocks[1];
        let code = compact.speed_code.expect("speed code latched");
        assert!(code.cut_range);
        assert_eq!(code.value, 1234);
        assert_eq!(code.raster_step, 2);
        assert_eq!(compact.raster_step, 2);
    }

    #[test]
    fn harmonic_raster_marks_pixels_and_steps() {
        // Enter raster mode with step 2: right 4 cutting, reverse left,
        // which adds a vertical step.
        let stream = b"\n\n\n%%%%%G002S1EDdBdTUF";
        let blocks = parse_egv(stream);
        let compact = &blocks[1];
        assert!(!compact.raster.is_empty());
        // The rightward run marked pixels on the first row.
        assert_eq!(compact.raster.get(0, 0), 1);
        assert_eq!(compact.raster.get(3, 0), 1);
    }

    #[test]
    fn speed_equation() {
        let code = SpeedCode {
            cut_range: true,
            value: 1000,
            raster_step: 0,
        };
        let speed = code.speed_for(784.0, 2000.0).unwrap();
        assert!((speed - 2000.0 / 216.0).abs() < 1e-9);
        assert!(code.speed_for(1200.0, 2000.0).is_none());
    }
}
