use std::io::BufRead;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::sink::FrameSink;
use crate::trace::{TraceReader, TraceRecord};
use crate::vga::{Progress, VgaDecoder};

/// What happened while decoding a trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraceSummary {
    /// Samples handed to the decoder.
    pub samples: u64,
    /// Records skipped for carrying undefined values.
    pub undefined: u64,
    /// Frames started.
    pub frames_started: u32,
    /// Frames handed to the sink as complete.
    pub frames_completed: u32,
    /// Whether decoding stopped early at the frame limit.
    pub frame_limit_reached: bool,
}

/// Feed a whole trace through the decoder into the sink. Stops at the end of the input or once
/// the decoder's frame limit is reached.
pub fn decode_trace<R, S>(input: R, decoder: &mut VgaDecoder, sink: &mut S) -> Result<TraceSummary>
where
    R: BufRead,
    S: FrameSink,
    Error: From<S::Error>,
{
    let mut summary = TraceSummary::default();

    for record in TraceReader::new(input) {
        let (line, record) = record?;
        match record {
            TraceRecord::Sample(_) => summary.samples += 1,
            TraceRecord::Undefined => {
                summary.undefined += 1;
                if summary.undefined == 1 {
                    warn!("Undefined values on line {line}, skipping");
                } else {
                    debug!("Undefined values on line {line}, skipping");
                }
            }
        }

        if decoder.push_record(&record, sink)? == Progress::FrameLimitReached {
            summary.frame_limit_reached = true;
            break;
        }
    }

    if summary.undefined > 1 {
        warn!("Skipped {} records with undefined values", summary.undefined);
    }

    let state = decoder.state();
    summary.frames_started = state.frame_count;
    summary.frames_completed = state.frames_completed;

    if !summary.frame_limit_reached && state.frame_active {
        info!(
            "Trace ended during frame {} at row {}",
            state.frame_count.saturating_sub(1),
            state.v_counter
        );
    }

    Ok(summary)
}
