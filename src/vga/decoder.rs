use log::{info, trace};

use crate::sink::{FrameEvent, FrameSink};
use crate::trace::TraceRecord;
use crate::types::{Sample, SimTime};
use crate::vga::TimingConfig;

/// Whether the decoder wants more samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    Continue,
    /// The configured number of frames has been decoded. Everything after this is ignored.
    FrameLimitReached,
}

/// The decoder's working state. Only sync edges and pixel clock ticks move it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecoderState {
    /// Column of the next visible pixel.
    pub h_counter: u32,
    /// Row of the current visible scanline.
    pub v_counter: u32,
    /// Pixel clocks since the last HSYNC rising edge.
    pub h_back_porch_count: u32,
    /// HSYNC pulses since the last VSYNC rising edge.
    pub v_back_porch_count: u32,
    /// Sync levels of the previous sample. `None` before the first one, so it can't look like
    /// an edge.
    pub last_hsync: Option<bool>,
    pub last_vsync: Option<bool>,
    /// Time since the pixel clock phase was last reset, either by a pixel or a sync pulse.
    pub time_since_last_pixel: SimTime,
    pub previous_sample_time: Option<SimTime>,
    /// Frames started so far.
    pub frame_count: u32,
    /// Frames handed to the sink as complete.
    pub frames_completed: u32,
    /// Whether the sink has a canvas, i.e. a VSYNC pulse has been seen.
    pub frame_active: bool,
}

/// Recovers pixels from the sync and color lines of a VGA signal, the way a monitor does: it
/// only looks at the sync edges and the time elapsed between samples.
///
/// The signal is expected with the usual active-low sync pulses, so a rising edge marks the end
/// of the pulse and the start of the back porch. The simulator may write several records per
/// pixel clock (delta cycles) or jitter the timestamps a little; only a record arriving one pixel
/// clock period (give or take the tolerance) after the last pixel is taken as the next pixel.
pub struct VgaDecoder {
    config: TimingConfig,
    state: DecoderState,
    finished: bool,
}

impl VgaDecoder {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            state: DecoderState::default(),
            finished: false,
        }
    }

    pub fn state(&self) -> &DecoderState {
        &self.state
    }

    /// Whether the frame limit has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Push a trace record. Records with undefined values don't touch the decoder at all.
    pub fn push_record<S: FrameSink>(
        &mut self,
        record: &TraceRecord,
        sink: &mut S,
    ) -> Result<Progress, S::Error> {
        match record {
            TraceRecord::Sample(sample) => self.push_sample(sample, sink),
            TraceRecord::Undefined => Ok(self.progress()),
        }
    }

    /// Push the next sample, in trace order.
    pub fn push_sample<S: FrameSink>(
        &mut self,
        sample: &Sample,
        sink: &mut S,
    ) -> Result<Progress, S::Error> {
        if self.finished {
            return Ok(Progress::FrameLimitReached);
        }

        let elapsed = self
            .state
            .previous_sample_time
            .map_or(0, |previous| sample.time - previous);
        self.state.time_since_last_pixel += elapsed;

        if self.state.last_hsync == Some(false) && sample.hsync {
            self.start_line();
        }

        if self.state.last_vsync == Some(false) && sample.vsync {
            self.start_frame(sink)?;
            if self.finished {
                return Ok(Progress::FrameLimitReached);
            }
        }

        if self.state.frame_active && sample.vsync {
            self.sample_pixel(sample, sink)?;
        }

        self.state.last_hsync = Some(sample.hsync);
        self.state.last_vsync = Some(sample.vsync);
        self.state.previous_sample_time = Some(sample.time);

        Ok(Progress::Continue)
    }

    fn progress(&self) -> Progress {
        if self.finished {
            Progress::FrameLimitReached
        } else {
            Progress::Continue
        }
    }

    /// HSYNC rising edge.
    fn start_line(&mut self) {
        let state = &mut self.state;
        state.h_counter = 0;

        // Rows only advance once the vertical back porch is over. The line that ends it is row 0.
        if state.v_back_porch_count >= self.config.v_back_porch {
            state.v_counter = state.v_counter.saturating_add(1);
        }
        state.v_back_porch_count = state.v_back_porch_count.saturating_add(1);

        state.h_back_porch_count = 0;

        // Sync on the sync pulse.
        state.time_since_last_pixel = 0;
    }

    /// VSYNC rising edge.
    fn start_frame<S: FrameSink>(&mut self, sink: &mut S) -> Result<(), S::Error> {
        if self.state.frame_active {
            sink.accept(FrameEvent::Boundary)?;
            self.state.frames_completed += 1;
        } else {
            self.state.frame_active = true;
            sink.accept(FrameEvent::Create {
                width: self.config.width,
                height: self.config.height,
            })?;
        }

        if !self.config.allows_frame(self.state.frame_count) {
            info!("{} frames decoded", self.state.frame_count);
            self.finished = true;
            return Ok(());
        }

        info!("VSYNC: decoding frame {}", self.state.frame_count);
        let state = &mut self.state;
        state.frame_count += 1;
        state.h_counter = 0;
        state.v_counter = 0;
        state.v_back_porch_count = 0;
        state.time_since_last_pixel = 0;

        Ok(())
    }

    /// A sample during the vertically active part of the frame.
    fn sample_pixel<S: FrameSink>(
        &mut self,
        sample: &Sample,
        sink: &mut S,
    ) -> Result<(), S::Error> {
        if !self.config.is_pixel_tick(self.state.time_since_last_pixel) {
            // A simulator step between pixel clock edges.
            return Ok(());
        }

        let state = &mut self.state;
        state.h_back_porch_count = state.h_back_porch_count.saturating_add(1);

        let past_h_porch = state.h_back_porch_count >= self.config.h_back_porch;
        let past_v_porch = state.v_back_porch_count >= self.config.v_back_porch;

        if past_h_porch && past_v_porch {
            let (x, y) = (state.h_counter, state.v_counter);
            if x < self.config.width && y < self.config.height {
                sink.accept(FrameEvent::PixelWrite {
                    x,
                    y,
                    color: sample.color(),
                })?;
            } else {
                trace!("dropping pixel outside the canvas at ({x}, {y})");
            }
        }

        if past_h_porch {
            state.h_counter = state.h_counter.saturating_add(1);
        }

        state.time_since_last_pixel = 0;
        Ok(())
    }
}
