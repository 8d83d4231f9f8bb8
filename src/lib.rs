//! View the VGA output of a VHDL/Verilog simulation.
//!
//! A testbench dumps the sync and color lines of its VGA controller to a text file, one record
//! per timestep. This crate decodes that trace back into frames the way a monitor would, from
//! the sync edges and the pixel clock alone:
//!
//! - [`trace`] turns lines into [`Sample`]s,
//! - [`vga::VgaDecoder`] recovers pixel positions and emits [`sink::FrameEvent`]s,
//! - [`sink`] draws the events onto images.
//!
//! [`vga::VgaEncoder`] goes the other way and produces a trace from an image, which is handy to
//! check a decoder configuration before pointing it at a real simulation.

pub mod display;
pub mod error;
pub mod render;
pub mod sink;
pub mod trace;
pub mod types;
pub mod units;
pub mod vga;

pub use error::{Error, Result};
pub use render::{decode_trace, TraceSummary};
pub use types::Sample;
