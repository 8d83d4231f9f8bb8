use std::error::Error;

use image::RgbImage;
use log::{error, info};
use pixels::{Pixels, SurfaceTexture};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

/// Smallest window we open, small modes get scaled up to this.
const MIN_WINDOW_WIDTH: u32 = 640;
const MIN_WINDOW_HEIGHT: u32 = 480;

/// Copy an RGB image into an RGBA pixel buffer of the same size.
fn blit(image: &RgbImage, buf: &mut [u8]) {
    for (pixel, rgb) in buf.chunks_exact_mut(4).zip(image.pixels()) {
        pixel[..3].copy_from_slice(&rgb.0);
        pixel[3] = 0xFF;
    }
}

fn title(index: usize, count: usize) -> String {
    format!("VGA Output - frame {}/{}", index + 1, count)
}

/// Show the decoded frames in a window. Right arrow or space steps forward, left steps back and
/// escape closes the window. Never returns unless there is nothing to show or the window can't
/// be created.
pub fn show_frames(frames: Vec<RgbImage>) -> Result<(), Box<dyn Error>> {
    let Some(first) = frames.first() else {
        info!("No frames to display");
        return Ok(());
    };
    let (width, height) = first.dimensions();

    // Create event loop.
    let event_loop = EventLoop::new();

    // Create window.
    let window = {
        let size = PhysicalSize::new(
            width.max(MIN_WINDOW_WIDTH),
            height.max(MIN_WINDOW_HEIGHT),
        );

        WindowBuilder::new()
            .with_title(title(0, frames.len()))
            .with_inner_size(size)
            .with_min_inner_size(size)
            .build(&event_loop)?
    };
    window.set_resizable(false);

    // Create pixel buffer.
    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(width, height, surface_texture)?
    };

    let mut current = 0;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::RedrawRequested(_) => {
                blit(&frames[current], pixels.get_frame_mut());
                if let Err(err) = pixels.render() {
                    error!("Failed to render pixel buffer to screen: {err}");
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(key),
                            ..
                        },
                    ..
                } => {
                    let previous = current;
                    match key {
                        VirtualKeyCode::Escape | VirtualKeyCode::Q => {
                            *control_flow = ControlFlow::Exit
                        }
                        VirtualKeyCode::Right | VirtualKeyCode::Space => {
                            current = (current + 1) % frames.len();
                        }
                        VirtualKeyCode::Left => {
                            current = (current + frames.len() - 1) % frames.len();
                        }
                        _ => {}
                    }
                    if current != previous {
                        window.set_title(&title(current, frames.len()));
                        window.request_redraw();
                    }
                }
                _ => {}
            },
            _ => {}
        }
    });
}
