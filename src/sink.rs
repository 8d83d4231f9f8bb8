use std::collections::VecDeque;
use std::convert::Infallible;
use std::path::PathBuf;

use image::{ImageError, Rgb, RgbImage};
use log::{info, trace};

/// What the decoder tells whoever is drawing the picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameEvent {
    /// The first VSYNC pulse was seen. Allocate a black canvas of this size.
    Create { width: u32, height: u32 },
    /// Draw one pixel onto the current canvas.
    PixelWrite { x: u32, y: u32, color: Rgb<u8> },
    /// The current frame is finished and ready to be shown or saved.
    Boundary,
}

/// Receives the decoder's output.
pub trait FrameSink {
    type Error;

    fn accept(&mut self, event: FrameEvent) -> Result<(), Self::Error>;
}

/// Records the raw events, mostly useful for inspecting the decoder.
impl FrameSink for Vec<FrameEvent> {
    type Error = Infallible;

    fn accept(&mut self, event: FrameEvent) -> Result<(), Self::Error> {
        self.push(event);
        Ok(())
    }
}

/// Draws the events onto an in-memory canvas.
///
/// The canvas lives for the whole trace, the way a monitor's phosphor does. A frame boundary
/// takes a snapshot of it, and the next frame draws over the previous one.
#[derive(Default)]
pub struct ImageSink {
    canvas: Option<RgbImage>,
    completed: VecDeque<RgbImage>,
    /// Whether anything was drawn since the last boundary.
    dirty: bool,
}

impl ImageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a single event to the canvas.
    pub fn apply(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::Create { width, height } => {
                self.canvas = Some(RgbImage::new(width, height));
                self.dirty = false;
            }
            FrameEvent::PixelWrite { x, y, color } => {
                match self.canvas.as_mut() {
                    Some(canvas) if x < canvas.width() && y < canvas.height() => {
                        canvas.put_pixel(x, y, color);
                        self.dirty = true;
                    }
                    _ => trace!("ignoring pixel write at ({x}, {y})"),
                }
            }
            FrameEvent::Boundary => {
                if let Some(canvas) = &self.canvas {
                    self.completed.push_back(canvas.clone());
                    self.dirty = false;
                }
            }
        }
    }

    /// The canvas as drawn so far, if a frame was ever started.
    pub fn canvas(&self) -> Option<&RgbImage> {
        self.canvas.as_ref()
    }

    /// Hand over the frames completed since the last call.
    pub fn take_completed(&mut self) -> impl Iterator<Item = RgbImage> + '_ {
        self.completed.drain(..)
    }

    /// The unfinished frame at the end of a trace, if anything was drawn on it after the last
    /// frame boundary.
    pub fn into_partial(self) -> Option<RgbImage> {
        if self.dirty {
            self.canvas
        } else {
            None
        }
    }
}

impl FrameSink for ImageSink {
    type Error = Infallible;

    fn accept(&mut self, event: FrameEvent) -> Result<(), Self::Error> {
        self.apply(event);
        Ok(())
    }
}

/// Saves every completed frame as a numbered PNG file.
pub struct PngSink {
    frames: ImageSink,
    directory: PathBuf,
    written: Vec<PathBuf>,
}

impl PngSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            frames: ImageSink::new(),
            directory: directory.into(),
            written: Vec::new(),
        }
    }

    /// Stop writing. If `keep_partial` is set, the unfinished last frame is saved as well.
    pub fn finish(mut self, keep_partial: bool) -> Result<Vec<PathBuf>, ImageError> {
        if keep_partial {
            let index = self.written.len();
            if let Some(partial) = self.frames.into_partial() {
                let path = self.directory.join(format!("frame_{index:04}_partial.png"));
                partial.save(&path)?;
                info!("Saved partial frame to {}", path.display());
                self.written.push(path);
            }
        }
        Ok(self.written)
    }

    fn save(&mut self, frame: &RgbImage) -> Result<(), ImageError> {
        let path = self
            .directory
            .join(format!("frame_{:04}.png", self.written.len()));
        frame.save(&path)?;
        info!("Saved frame to {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

impl FrameSink for PngSink {
    type Error = ImageError;

    fn accept(&mut self, event: FrameEvent) -> Result<(), Self::Error> {
        self.frames.apply(event);
        if event == FrameEvent::Boundary {
            let completed: Vec<RgbImage> = self.frames.take_completed().collect();
            for frame in &completed {
                self.save(frame)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    fn write(x: u32, y: u32, color: Rgb<u8>) -> FrameEvent {
        FrameEvent::PixelWrite { x, y, color }
    }

    #[test]
    fn test_canvas_starts_black() {
        let mut sink = ImageSink::new();
        assert!(sink.canvas().is_none());

        sink.apply(FrameEvent::Create { width: 3, height: 2 });
        let canvas = sink.canvas().unwrap();
        assert_eq!(canvas.dimensions(), (3, 2));
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_writes_before_create_are_ignored() {
        let mut sink = ImageSink::new();
        sink.apply(write(0, 0, RED));
        sink.apply(FrameEvent::Boundary);
        assert!(sink.take_completed().next().is_none());
        assert!(sink.into_partial().is_none());
    }

    #[test]
    fn test_boundary_snapshots_and_keeps_drawing() {
        let mut sink = ImageSink::new();
        sink.apply(FrameEvent::Create { width: 2, height: 2 });
        sink.apply(write(0, 0, RED));
        sink.apply(write(5, 5, RED));
        sink.apply(FrameEvent::Boundary);
        sink.apply(write(1, 1, BLUE));
        sink.apply(FrameEvent::Boundary);

        let frames: Vec<_> = sink.take_completed().collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(*frames[0].get_pixel(0, 0), RED);
        assert_eq!(*frames[0].get_pixel(1, 1), Rgb([0, 0, 0]));
        assert_eq!(*frames[1].get_pixel(0, 0), RED);
        assert_eq!(*frames[1].get_pixel(1, 1), BLUE);
        assert!(sink.take_completed().next().is_none());
    }

    #[test]
    fn test_partial_frame() {
        let mut sink = ImageSink::new();
        sink.apply(FrameEvent::Create { width: 2, height: 2 });
        sink.apply(write(0, 1, BLUE));
        let partial = sink.into_partial().unwrap();
        assert_eq!(*partial.get_pixel(0, 1), BLUE);
    }

    #[test]
    fn test_png_sink_writes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = PngSink::new(dir.path());

        sink.accept(FrameEvent::Create { width: 2, height: 2 }).unwrap();
        sink.accept(write(1, 0, RED)).unwrap();
        sink.accept(FrameEvent::Boundary).unwrap();
        sink.accept(write(0, 1, BLUE)).unwrap();

        let written = sink.finish(true).unwrap();
        assert_eq!(
            written,
            vec![
                dir.path().join("frame_0000.png"),
                dir.path().join("frame_0001_partial.png"),
            ]
        );

        let first = image::open(&written[0]).unwrap().into_rgb8();
        assert_eq!(*first.get_pixel(1, 0), RED);
        assert_eq!(*first.get_pixel(0, 1), Rgb([0, 0, 0]));
        let partial = image::open(&written[1]).unwrap().into_rgb8();
        assert_eq!(*partial.get_pixel(0, 1), BLUE);
    }
}
