use image::Rgb;

/// The floating point type to use for signal timing. Traces are commonly written in picoseconds
/// over many frames, so absolute times reach well past the point where f32 can still resolve a
/// single pixel clock period.
pub type SignalFloat = f64;

/// An instant or duration in seconds.
pub type SampleTime = SignalFloat;

/// Simulation time in femtoseconds, the finest unit a trace can be written in. Trace timestamps
/// are integers, so the time between two records stays exact however deep into the trace they
/// are. Signed so that a trace stepping backwards gives a negative duration.
pub type SimTime = i128;

pub const FEMTOS_PER_SECOND: SignalFloat = 1e15;

/// A time in seconds, rounded to the nearest femtosecond.
pub fn sim_time(seconds: SampleTime) -> SimTime {
    (seconds * FEMTOS_PER_SECOND).round() as SimTime
}

/// One decoded timestep of the VGA output: sync line states and 8-bit channel intensities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time: SimTime,
    pub hsync: bool,
    pub vsync: bool,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Sample {
    /// The sample's color as an image pixel.
    pub fn color(&self) -> Rgb<u8> {
        Rgb([self.red, self.green, self.blue])
    }

    /// The sample's time in seconds.
    pub fn seconds(&self) -> SampleTime {
        self.time as SignalFloat / FEMTOS_PER_SECOND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_time_rounds_to_femtoseconds() {
        assert_eq!(sim_time(40e-9), 40_000_000);
        assert_eq!(sim_time(5e-9), 5_000_000);
        assert_eq!(sim_time(1e-6 / 25.175), 39_721_946);
        assert_eq!(sim_time(0.0), 0);
    }

    #[test]
    fn test_sample_seconds() {
        let sample = Sample {
            time: 50_000_000,
            hsync: true,
            vsync: true,
            red: 0,
            green: 255,
            blue: 0,
        };
        assert_eq!(sample.seconds(), 50e-9);
    }
}
