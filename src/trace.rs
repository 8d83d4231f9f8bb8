//! Testbench trace records.
//!
//! A VHDL/Verilog testbench dumps one line per timestep:
//!
//! ```text
//! 50 ns: 1 1 000 111 00
//! ```
//!
//! That is the simulation time and its unit, then HSYNC, VSYNC, and the red, green and blue
//! buses as bit-strings of any width.

use std::io::{BufRead, ErrorKind, Lines};

use crate::error::{Error, Result};
use crate::types::{Sample, SimTime};
use crate::units::{TimeUnit, UnknownUnit};

/// Separator printed between the timestamp and the signal values.
pub const SEPARATOR: char = ':';

/// std_logic states that mean the testbench hasn't settled yet.
pub const UNDEFINED_MARKERS: [char; 4] = ['U', 'X', 'Z', 'W'];

/// Widest color bus we can scale without overflowing.
const MAX_COLOR_BITS: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error(transparent)]
    UnknownUnit(#[from] UnknownUnit),

    #[error("malformed line: {0}")]
    MalformedLine(String),
}

/// A decoded trace line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TraceRecord {
    Sample(Sample),
    /// The line carries undefined logic values and has to be skipped entirely.
    Undefined,
}

/// Maps a binary number to 0-255 according to its bit width, so `"111"` and `"11"` are both
/// full intensity. This is why the testbench must pad the color buses to their full width.
pub fn bits_to_intensity(bits: &str) -> std::result::Result<u8, TraceError> {
    let is_binary = bits.bytes().all(|b| b == b'0' || b == b'1');
    if bits.is_empty() || bits.len() > MAX_COLOR_BITS || !is_binary {
        return Err(TraceError::MalformedLine(format!("invalid color value `{bits}`")));
    }

    let value = u64::from_str_radix(bits, 2)
        .map_err(|_| TraceError::MalformedLine(format!("invalid color value `{bits}`")))?;
    let max = (1u64 << bits.len()) - 1;

    Ok((value as f64 / max as f64 * 255.0).round() as u8)
}

fn parse_sync(field: &str) -> std::result::Result<bool, TraceError> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(TraceError::MalformedLine(format!("invalid sync value `{field}`"))),
    }
}

/// Decode a single trace line.
pub fn decode_line(line: &str) -> std::result::Result<TraceRecord, TraceError> {
    if line.chars().any(|c| UNDEFINED_MARKERS.contains(&c)) {
        return Ok(TraceRecord::Undefined);
    }

    let line = line.replace(SEPARATOR, "");
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [time, unit, hsync, vsync, red, green, blue] = fields.as_slice() else {
        return Err(TraceError::MalformedLine(format!(
            "expected 7 fields, found {}",
            fields.len()
        )));
    };

    let time: u64 = time
        .parse()
        .map_err(|_| TraceError::MalformedLine(format!("invalid time `{time}`")))?;
    let unit: TimeUnit = unit.parse()?;

    Ok(TraceRecord::Sample(Sample {
        time: time as SimTime * unit.femtoseconds(),
        hsync: parse_sync(hsync)?,
        vsync: parse_sync(vsync)?,
        red: bits_to_intensity(red)?,
        green: bits_to_intensity(green)?,
        blue: bits_to_intensity(blue)?,
    }))
}

/// Reads trace records from a text source, keeping track of line numbers. Blank lines are
/// skipped.
pub struct TraceReader<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    /// The 1-based line number and its record.
    type Item = Result<(usize, TraceRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line_number = self.line_number;

            let line = match line {
                Ok(line) => line,
                Err(err) if err.kind() == ErrorKind::InvalidData => {
                    return Some(Err(Error::Trace {
                        line: line_number,
                        source: TraceError::MalformedLine("line is not valid UTF-8".to_string()),
                    }));
                }
                Err(err) => return Some(Err(Error::Io(err))),
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some(
                decode_line(&line)
                    .map(|record| (line_number, record))
                    .map_err(|source| Error::Trace {
                        line: line_number,
                        source,
                    }),
            );
        }
    }
}
