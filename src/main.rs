use clap::Parser;
use fractal_canvas::{
    config::ViewerConfig, ColourMap, FractalCanvas, Gradient, Mandelbrot, Point, PointWorker,
    Result,
};
use log::{debug, error, info};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{
        ElementState, Event, KeyboardInput, MouseButton, MouseScrollDelta, VirtualKeyCode,
        WindowEvent,
    },
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

mod window;

use window::WindowSurface;

/// Zoom factor per wheel notch.
const ZOOM_STEP: f64 = 1.25;

/// Pixels of touchpad scroll that count as one wheel notch.
const PIXELS_PER_NOTCH: f64 = 100.0;

const RESOLUTION_STEP: f64 = 0.05;

fn fail(message: impl std::fmt::Display) -> ! {
    error!("{}", message);
    std::process::exit(1)
}

/// Pins `centre` to the middle of a `size` window.
fn origin_for(centre: (f64, f64), scale: f64, size: PhysicalSize<u32>) -> Point {
    Point::new(
        size.width as f64 / 2.0 - centre.0 / scale,
        size.height as f64 / 2.0 + centre.1 / scale,
    )
}

fn report(result: Result<impl std::fmt::Debug>) {
    match result {
        Ok(outcome) => debug!("{:?}", outcome),
        Err(err) => error!("{}", err),
    }
}

fn main() {
    env_logger::init();

    let config = ViewerConfig::parse();
    let thresholds = config.validate().unwrap_or_else(|err| fail(err));

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("fractal-canvas")
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .build(&event_loop)
        .unwrap_or_else(|err| fail(err));

    let surface = WindowSurface::new(&window).unwrap_or_else(|err| fail(err));
    let origin = origin_for(
        (config.centre_real, config.centre_imaginary),
        config.scale,
        window.inner_size(),
    );
    let mut canvas =
        FractalCanvas::new(surface, origin, config.scale).unwrap_or_else(|err| fail(err));

    let mut gradient = Gradient::default();
    gradient.set_inversed(config.inversed);

    // One frame for the whole initial configuration.
    report(canvas.set_enabled(false));
    report(canvas.set_colour_map(Some(Box::new(gradient))));
    report(canvas.set_worker(Some(Box::new(Mandelbrot::new(thresholds)))));
    report(canvas.set_enabled(true));

    let mut cursor = PhysicalPosition::new(0.0, 0.0);
    let mut dragging = false;

    event_loop.run(move |event, _, control_flow| {
        control_flow.set_wait();

        match event {
            Event::MainEventsCleared => {
                if let Some(fps) = canvas.surface_mut().take_fps() {
                    window.set_title(&format!("fractal-canvas: {:.1} fps", fps));
                }
                if canvas.surface_mut().take_needs_redraw() {
                    window.request_redraw();
                }
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(size) => {
                    canvas.surface_mut().resize(size);
                    report(canvas.surface_resized());
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if dragging {
                        report(canvas.pan_by(position.x - cursor.x, position.y - cursor.y));
                    }
                    cursor = position;
                }
                WindowEvent::MouseInput { state, button, .. } => match button {
                    MouseButton::Left => dragging = state == ElementState::Pressed,
                    MouseButton::Right if state == ElementState::Pressed => {
                        match canvas.get_values(Point::new(cursor.x, cursor.y)) {
                            Some(values) => info!(
                                "{} {:+}i -> {}",
                                values.real, values.imaginary, values.value
                            ),
                            None => info!("nothing rendered under the cursor"),
                        }
                    }
                    _ => {}
                },
                WindowEvent::MouseWheel { delta, .. } => {
                    let notches = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y as f64,
                        MouseScrollDelta::PixelDelta(position) => position.y / PIXELS_PER_NOTCH,
                    };
                    if notches != 0.0 {
                        report(canvas.zoom_at(
                            Point::new(cursor.x, cursor.y),
                            ZOOM_STEP.powf(notches),
                        ));
                    }
                }
                WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(key),
                            ..
                        },
                    ..
                } => match key {
                    VirtualKeyCode::Escape => *control_flow = ControlFlow::Exit,
                    VirtualKeyCode::Equals | VirtualKeyCode::Plus | VirtualKeyCode::NumpadAdd => {
                        let resolution = current_resolution(&canvas) + RESOLUTION_STEP;
                        report(canvas.set_resolution(resolution.min(1.0)));
                    }
                    VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => {
                        let resolution = current_resolution(&canvas) - RESOLUTION_STEP;
                        report(canvas.set_resolution(resolution.max(0.0)));
                    }
                    VirtualKeyCode::I => {
                        let inversed = canvas
                            .pipeline()
                            .colour_map()
                            .map_or(false, |colour_map| colour_map.inversed());
                        report(canvas.set_inversed(!inversed));
                    }
                    VirtualKeyCode::S => match canvas.save_frame(&config.save_path) {
                        Ok(()) => info!("saved {}", config.save_path.display()),
                        Err(err) => error!("{}", err),
                    },
                    _ => {}
                },
                _ => {}
            },
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                canvas.surface_mut().render();
            }
            _ => {}
        }
    });
}

fn current_resolution(canvas: &FractalCanvas<WindowSurface>) -> f64 {
    canvas
        .pipeline()
        .worker()
        .map_or(0.0, |worker| worker.thresholds().resolution())
}
