use std::io::{self, Cursor, Write};
use std::ops::RangeInclusive;

use image::{ImageError, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::SignalFloat;
use crate::units::TimeUnit;
use crate::vga::{ConfigError, VgaTiming};

/// Supported widths of a color bus.
pub const COLOR_BITS: RangeInclusive<usize> = 1..=16;

/// The VGA encoder, plays the part of an HDL testbench: it writes the trace a simulated VGA
/// controller would produce while scanning out an image.
///
/// Each line is laid out as back porch, visible pixels, front porch and then the HSYNC pulse, so
/// HSYNC rises on the first pixel of the line. Frames are laid out the same way in scanlines,
/// and the trace opens with a VSYNC pulse so the first frame starts on a rising edge.
pub struct VgaEncoder {
    timing: VgaTiming,
    image: RgbImage,
    unit: TimeUnit,
    color_bits: [usize; 3],
    jitter: u64,
    seed: Option<u64>,
    substeps: u32,
    undefined_preamble: u32,
}

impl VgaEncoder {
    /// Create a new VGA encoder for the given image. The image is scaled to the visible area.
    pub fn new(timing: VgaTiming, image: RgbImage) -> Self {
        Self {
            timing,
            image,
            unit: TimeUnit::Picoseconds,
            color_bits: [3, 3, 2],
            jitter: 0,
            seed: None,
            substeps: 0,
            undefined_preamble: 0,
        }
    }

    /// Initialize the VGA encoder from an encoded image file in a buffer.
    pub fn from_image_buf(timing: VgaTiming, buf: &[u8]) -> Result<Self, ImageError> {
        // Load image and convert to an rgb8 pixel buffer.
        let img = image::io::Reader::new(Cursor::new(buf))
            .with_guessed_format()?
            .decode()?
            .into_rgb8();

        Ok(Self::new(timing, img))
    }

    /// Unit the timestamps are written in.
    pub fn with_time_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Width of the red, green and blue buses.
    pub fn with_color_bits(
        mut self,
        red: usize,
        green: usize,
        blue: usize,
    ) -> Result<Self, ConfigError> {
        if let Some(&bits) = [red, green, blue]
            .iter()
            .find(|bits| !COLOR_BITS.contains(bits))
        {
            return Err(ConfigError::InvalidColorBits(bits));
        }
        self.color_bits = [red, green, blue];
        Ok(self)
    }

    /// Move every pixel clock edge by a random amount of up to `jitter` time units either way.
    /// The decoder copes as long as twice the jitter stays within its tolerance.
    pub fn with_jitter(mut self, jitter: u64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Seed the jitter, so the same trace comes out every time.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Write this many extra records between pixel clock edges, like a simulator printing on
    /// every delta cycle.
    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps;
        self
    }

    /// Open the trace with records full of `U`, like a design that hasn't come out of reset.
    pub fn with_undefined_preamble(mut self, records: u32) -> Self {
        self.undefined_preamble = records;
        self
    }

    /// Write a trace of `frames` frames.
    pub fn write_trace<W: Write>(&self, frames: u32, out: W) -> io::Result<()> {
        let period = self.timing.pixel_clock_period() / self.unit.seconds();
        let mut writer = TraceWriter {
            out,
            unit: self.unit,
            color_bits: self.color_bits,
            period,
            jitter: self.jitter as i64,
            substeps: self.substeps,
            index: 0,
            last_time: 0,
            rng: match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        };

        for _ in 0..self.undefined_preamble {
            writer.write_undefined()?;
        }

        for _ in 0..self.timing.v_sync {
            self.write_line(&mut writer, false, None)?;
        }

        for _ in 0..frames {
            let t = &self.timing;
            for _ in 0..t.v_bp {
                self.write_line(&mut writer, true, None)?;
            }
            for y in 0..t.v_active {
                self.write_line(&mut writer, true, Some(y))?;
            }
            for _ in 0..t.v_fp {
                self.write_line(&mut writer, true, None)?;
            }
            for _ in 0..t.v_sync {
                self.write_line(&mut writer, false, None)?;
            }
        }

        // Raise both syncs once more so the last frame is complete.
        writer.write_sample(true, true, Rgb([0, 0, 0]))?;
        writer.out.flush()
    }

    /// Write one scanline. `row` is the visible row, if this line has one.
    fn write_line<W: Write>(
        &self,
        writer: &mut TraceWriter<W>,
        vsync: bool,
        row: Option<u32>,
    ) -> io::Result<()> {
        let t = &self.timing;
        let visible = t.h_bp..t.h_bp + t.h_active;
        let hsync_start = t.h_bp + t.h_active + t.h_fp;

        for k in 0..t.htot() {
            let color = match row {
                Some(y) if visible.contains(&k) => self.sample_pixel(k - t.h_bp, y),
                _ => Rgb([0, 0, 0]),
            };
            writer.write_sample(k < hsync_start, vsync, color)?;
        }
        Ok(())
    }

    /// Sample the image at a visible pixel, scaling it to the visible area.
    fn sample_pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Rgb([0, 0, 0]);
        }

        // Convert to image coordinates and clamp.
        let x = (x as u64 * width as u64 / self.timing.h_active as u64) as u32;
        let y = (y as u64 * height as u64 / self.timing.v_active as u64) as u32;

        *self.image.get_pixel(x.min(width - 1), y.min(height - 1))
    }
}

/// Quantize an 8-bit intensity to a bus of the given width.
fn quantize(value: u8, bits: usize) -> u64 {
    let max = (1u64 << bits) - 1;
    (value as SignalFloat * max as SignalFloat / 255.0).round() as u64
}

/// Formats records and keeps track of the time.
struct TraceWriter<W> {
    out: W,
    unit: TimeUnit,
    color_bits: [usize; 3],
    /// Pixel clock period in `unit`.
    period: SignalFloat,
    jitter: i64,
    substeps: u32,
    /// Pixel clock edges written so far.
    index: u64,
    last_time: u64,
    rng: StdRng,
}

impl<W: Write> TraceWriter<W> {
    /// The time of the next pixel clock edge.
    fn next_time(&mut self) -> u64 {
        let mut time = (self.index as SignalFloat * self.period).round() as i64;
        if self.jitter > 0 {
            time += self.rng.gen_range(-self.jitter..=self.jitter);
        }
        self.index += 1;

        // Never step backwards in time.
        let time = (time.max(0) as u64).max(self.last_time);
        self.last_time = time;
        time
    }

    fn write_sample(&mut self, hsync: bool, vsync: bool, color: Rgb<u8>) -> io::Result<()> {
        let time = self.next_time();
        self.write_record(time, hsync, vsync, color)?;

        for step in 1..=self.substeps {
            let offset = self.period * step as SignalFloat / (self.substeps + 1) as SignalFloat;
            let time = time + offset.round() as u64;
            self.write_record(time, hsync, vsync, color)?;
            self.last_time = time;
        }
        Ok(())
    }

    fn write_record(
        &mut self,
        time: u64,
        hsync: bool,
        vsync: bool,
        color: Rgb<u8>,
    ) -> io::Result<()> {
        let [r_bits, g_bits, b_bits] = self.color_bits;
        writeln!(
            self.out,
            "{time} {}: {} {} {:0r_bits$b} {:0g_bits$b} {:0b_bits$b}",
            self.unit,
            hsync as u8,
            vsync as u8,
            quantize(color[0], r_bits),
            quantize(color[1], g_bits),
            quantize(color[2], b_bits),
        )
    }

    fn write_undefined(&mut self) -> io::Result<()> {
        let time = self.next_time();
        let [r_bits, g_bits, b_bits] = self.color_bits;
        writeln!(
            self.out,
            "{time} {}: U U {} {} {}",
            self.unit,
            "U".repeat(r_bits),
            "U".repeat(g_bits),
            "U".repeat(b_bits),
        )
    }
}
