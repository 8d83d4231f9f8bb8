mod decoder;
mod encoder;

pub use decoder::*;
pub use encoder::*;

use crate::types::{sim_time, SignalFloat, SimTime};

/// How far the time since the last pixel may stray from the pixel clock period and still count
/// as one pixel, in seconds.
pub const DEFAULT_TOLERANCE: SignalFloat = 5e-9;

/// The `--max-frames` value meaning "decode every frame in the trace".
pub const UNLIMITED_FRAMES: i64 = -1;

// Standard modes. From: http://tinyvga.com/vga-timing/

/// 640x480 @ 60Hz, 25.175 MHz pixel clock.
pub const VGA_640X480_60HZ: VgaTiming = VgaTiming {
    h_active: 640,
    h_fp: 16,
    h_sync: 96,
    h_bp: 48,
    v_active: 480,
    v_fp: 10,
    v_sync: 2,
    v_bp: 33,
    pixel_clock_mhz: 25.175,
};

/// 800x600 @ 60Hz, 40 MHz pixel clock.
pub const SVGA_800X600_60HZ: VgaTiming = VgaTiming {
    h_active: 800,
    h_fp: 40,
    h_sync: 128,
    h_bp: 88,
    v_active: 600,
    v_fp: 1,
    v_sync: 4,
    v_bp: 23,
    pixel_clock_mhz: 40.0,
};

/// 1024x768 @ 60Hz, 65 MHz pixel clock.
pub const XGA_1024X768_60HZ: VgaTiming = VgaTiming {
    h_active: 1024,
    h_fp: 24,
    h_sync: 136,
    h_bp: 160,
    v_active: 768,
    v_fp: 3,
    v_sync: 6,
    v_bp: 29,
    pixel_clock_mhz: 65.0,
};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("canvas must be at least 1x1, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },

    #[error("pixel clock must be a positive frequency, got {0} MHz")]
    InvalidPixelClock(SignalFloat),

    #[error("tolerance must be a non-negative time, got {0} s")]
    InvalidTolerance(SignalFloat),

    #[error("frame limit must be -1 (unlimited) or a frame count, got {0}")]
    InvalidFrameLimit(i64),

    #[error("color buses must be 1-16 bits wide, got {0}")]
    InvalidColorBits(usize),
}

/// Map a frame limit given on the command line, where `-1` means unlimited.
pub fn frame_limit_from_sentinel(value: i64) -> Result<Option<u32>, ConfigError> {
    if value == UNLIMITED_FRAMES {
        return Ok(None);
    }
    u32::try_from(value)
        .map(Some)
        .map_err(|_| ConfigError::InvalidFrameLimit(value))
}

/// What the decoder needs to know about the video signal it is reconstructing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Seconds per pixel clock tick.
    pub pixel_clock_period: SignalFloat,
    /// Pixel clocks between the HSYNC rising edge and the first visible pixel.
    pub h_back_porch: u32,
    /// Scanlines between the VSYNC rising edge and the first visible scanline.
    pub v_back_porch: u32,
    /// Accepted deviation from `pixel_clock_period`, in seconds.
    pub tolerance: SignalFloat,
    /// Stop after this many frames. `None` decodes everything.
    pub max_frames: Option<u32>,
}

impl TimingConfig {
    pub fn new(
        width: u32,
        height: u32,
        pixel_clock_mhz: SignalFloat,
        h_back_porch: u32,
        v_back_porch: u32,
    ) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroDimension { width, height });
        }
        if !(pixel_clock_mhz > 0.0 && pixel_clock_mhz.is_finite()) {
            return Err(ConfigError::InvalidPixelClock(pixel_clock_mhz));
        }

        Ok(Self {
            width,
            height,
            pixel_clock_period: 1e-6 / pixel_clock_mhz,
            h_back_porch,
            v_back_porch,
            tolerance: DEFAULT_TOLERANCE,
            max_frames: None,
        })
    }

    pub fn with_tolerance(mut self, tolerance: SignalFloat) -> Result<Self, ConfigError> {
        if !(tolerance >= 0.0 && tolerance.is_finite()) {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    pub fn with_max_frames(mut self, max_frames: Option<u32>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Whether this much time since the last pixel amounts to exactly one pixel clock tick.
    /// Both ends of the tolerance window are inclusive. The window is rounded to whole
    /// femtoseconds, the resolution of a trace.
    pub fn is_pixel_tick(&self, elapsed: SimTime) -> bool {
        let period = sim_time(self.pixel_clock_period);
        let tolerance = sim_time(self.tolerance);
        (period - tolerance..=period + tolerance).contains(&elapsed)
    }

    /// Whether another frame may be started after `frame_count` frames.
    pub fn allows_frame(&self, frame_count: u32) -> bool {
        self.max_frames.map_or(true, |max| frame_count < max)
    }
}

/// A complete video mode, counted in pixel clocks and scanlines.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VgaTiming {
    pub h_active: u32,
    pub h_fp: u32,
    pub h_sync: u32,
    pub h_bp: u32, // h_active + h_fp + h_sync + h_bp = htot

    pub v_active: u32,
    pub v_fp: u32,
    pub v_sync: u32,
    pub v_bp: u32, // v_active + v_fp + v_sync + v_bp = vtot

    pub pixel_clock_mhz: SignalFloat,
}

impl VgaTiming {
    pub fn htot(&self) -> u32 {
        self.h_active + self.h_fp + self.h_sync + self.h_bp
    }

    pub fn vtot(&self) -> u32 {
        self.v_active + self.v_fp + self.v_sync + self.v_bp
    }

    pub fn pixel_clock_period(&self) -> SignalFloat {
        1e-6 / self.pixel_clock_mhz
    }

    /// The decoder configuration matching this mode.
    pub fn decoder_config(&self) -> Result<TimingConfig, ConfigError> {
        TimingConfig::new(
            self.h_active,
            self.v_active,
            self.pixel_clock_mhz,
            self.h_bp,
            self.v_bp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_mode_totals() {
        assert_eq!(VGA_640X480_60HZ.htot(), 800);
        assert_eq!(VGA_640X480_60HZ.vtot(), 525);
        assert_eq!(SVGA_800X600_60HZ.htot(), 1056);
        assert_eq!(SVGA_800X600_60HZ.vtot(), 628);
        assert_eq!(XGA_1024X768_60HZ.htot(), 1344);
        assert_eq!(XGA_1024X768_60HZ.vtot(), 806);
    }

    #[test]
    fn test_vga_pixel_clock_period() {
        let config = VGA_640X480_60HZ.decoder_config().unwrap();
        assert!((config.pixel_clock_period - 39.7219464e-9).abs() < 1e-15);
        assert_eq!(config.h_back_porch, 48);
        assert_eq!(config.v_back_porch, 33);
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.max_frames, None);
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            TimingConfig::new(0, 480, 25.0, 0, 0),
            Err(ConfigError::ZeroDimension { width: 0, height: 480 })
        );
        assert!(matches!(
            TimingConfig::new(640, 480, 0.0, 0, 0),
            Err(ConfigError::InvalidPixelClock(_))
        ));
        assert!(matches!(
            TimingConfig::new(640, 480, SignalFloat::NAN, 0, 0),
            Err(ConfigError::InvalidPixelClock(_))
        ));
        let config = TimingConfig::new(640, 480, 25.0, 48, 33).unwrap();
        assert!(matches!(
            config.with_tolerance(-1e-9),
            Err(ConfigError::InvalidTolerance(_))
        ));
        assert_eq!(config.with_tolerance(0.0).unwrap().tolerance, 0.0);
    }

    #[test]
    fn test_frame_limit_sentinel() {
        assert_eq!(frame_limit_from_sentinel(-1), Ok(None));
        assert_eq!(frame_limit_from_sentinel(0), Ok(Some(0)));
        assert_eq!(frame_limit_from_sentinel(2), Ok(Some(2)));
        assert_eq!(
            frame_limit_from_sentinel(-2),
            Err(ConfigError::InvalidFrameLimit(-2))
        );
    }

    #[test]
    fn test_frame_budget() {
        let config = TimingConfig::new(4, 4, 25.0, 0, 0).unwrap();
        assert!(config.allows_frame(u32::MAX));

        let config = config.with_max_frames(Some(2));
        assert!(config.allows_frame(0));
        assert!(config.allows_frame(1));
        assert!(!config.allows_frame(2));
    }

    #[test]
    fn test_pixel_tick_window_is_inclusive() {
        let config = TimingConfig::new(4, 4, 25.0, 0, 0).unwrap();
        let period = sim_time(config.pixel_clock_period);
        let tolerance = sim_time(config.tolerance);
        assert_eq!((period, tolerance), (40_000_000, 5_000_000));

        assert!(config.is_pixel_tick(period));
        assert!(config.is_pixel_tick(period - tolerance));
        assert!(config.is_pixel_tick(period + tolerance));
        assert!(!config.is_pixel_tick(period - tolerance - 1));
        assert!(!config.is_pixel_tick(period + tolerance + 1));
        assert!(!config.is_pixel_tick(0));
        assert!(!config.is_pixel_tick(-period));
    }
}
