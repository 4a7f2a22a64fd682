use std::marker::PhantomData;
use std::time::{Duration, Instant};

use democonfig::DemoConfig;
use gl::types::GLuint;
use soundtrack::{Mixer, Music, Playback, PlaybackOptions};
use tracing::{debug, info, trace, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowId;

use crate::context::GlContext;
use crate::lifecycle::{Lifecycle, Stage};
use crate::runtime::{FramePacer, SimulationClock, TimeSample};
use crate::shader::{ShaderProgram, ShaderSources};
use crate::types::{DemoError, InitError, RenderError, RunSummary};
use crate::uniforms::FrameUniforms;

/// Runs the demo from start-up to teardown.
pub(crate) fn run_demo(
    config: &DemoConfig,
    lifecycle: &mut Lifecycle,
) -> Result<RunSummary, DemoError> {
    let mut event_loop = EventLoop::new().map_err(InitError::from)?;
    debug!("windowing system initialised");

    let context = GlContext::create(&event_loop, &config.window)?;
    lifecycle.advance(Stage::WindowReady)?;

    context.load_functions()?;
    lifecycle.advance(Stage::GraphicsReady)?;

    let mixer = Mixer::open().map_err(InitError::from)?;
    lifecycle.advance(Stage::AudioReady)?;
    let music = load_music(&mixer, config);

    let assets = &config.assets;
    let sources = ShaderSources::load(
        &assets.geometry_path(),
        &assets.vertex_path(),
        &assets.fragment_path(),
    );
    let (program, report) = ShaderProgram::build(&context, &sources)?;
    debug!(
        attached = ?report.attached,
        rejected = ?report.rejected,
        validated = report.validate.passed(),
        "shader build finished"
    );
    lifecycle.advance(Stage::ProgramLinked)?;

    let playback = music.and_then(|music| start_music(&mixer, music, config));

    lifecycle.advance(Stage::Running)?;
    let summary = run_frames(&mut event_loop, &context, &program, config)?;

    if let Some(playback) = playback {
        if playback.is_finished() {
            debug!(path = %playback.path().display(), "music ended before the demo");
        }
        playback.stop();
    }
    mixer.close();
    drop(program);
    drop(context);
    drop(event_loop);
    info!("windowing system shut down");

    Ok(summary)
}

fn load_music(mixer: &Mixer, config: &DemoConfig) -> Option<Music> {
    let path = config.assets.music_path();
    match mixer.load(&path) {
        Ok(music) => Some(music),
        Err(err) => {
            warn!("{err}; continuing without music");
            None
        }
    }
}

fn start_music(mixer: &Mixer, music: Music, config: &DemoConfig) -> Option<Playback> {
    let options = PlaybackOptions {
        volume: config.audio.volume,
        looping: config.audio.looping,
    };
    match mixer.play(music, options) {
        Ok(playback) => Some(playback),
        Err(err) => {
            warn!("{err}; continuing without music");
            None
        }
    }
}

fn run_frames(
    event_loop: &mut EventLoop<()>,
    context: &GlContext,
    program: &ShaderProgram<'_>,
    config: &DemoConfig,
) -> Result<RunSummary, RenderError> {
    let timing = &config.timing;
    let mut clock = SimulationClock::new(timing.frame_delta());
    let mut pacer = FramePacer::new(timing.frame_budget(), timing.pacing);
    let mut input = InputState::new(context.window().id(), config.window.exit_on_escape);
    info!(
        target_fps = timing.target_fps,
        delta = clock.delta(),
        budget_us = pacer.target().as_micros() as u64,
        pacing = %pacer.mode(),
        max_frames = timing.max_frames,
        "entering render loop"
    );

    let started = Instant::now();
    let mut frames = 0u64;
    while !input.close_requested {
        if timing.frame_limit().is_some_and(|limit| frames >= limit) {
            info!(frames, "frame limit reached");
            break;
        }

        let frame_start = Instant::now();
        let sample = clock.sample();
        let size = context.framebuffer_size();
        let aspect = aspect_ratio(size);

        context.resize_viewport(size);
        unsafe {
            gl::ClearColor(0.0, 0.0, 0.0, 1.0);
            gl::Clear(gl::COLOR_BUFFER_BIT);
        }
        program.bind();
        FrameUniforms::new(size.width, size.height, sample.seconds).upload(program);
        draw_point(context);

        let measured = frame_start.elapsed();
        let slept = pacer.pace(measured);
        clock.advance();

        context
            .swap_buffers()
            .map_err(|source| RenderError::Swap {
                frame: sample.frame_index,
                source,
            })?;
        frames += 1;

        pump_events(event_loop, &mut input);
        log_frame(timing.log_frames, sample, measured, slept, aspect);
    }

    Ok(RunSummary {
        frames,
        simulated_seconds: clock.sample().seconds,
        wall_clock: started.elapsed(),
    })
}

/// Issues the single point the geometry stage expands to a full-screen quad.
fn draw_point(context: &GlContext) {
    let vertex_array = VertexArray::new(context);
    vertex_array.bind();
    unsafe { gl::DrawArrays(gl::POINTS, 0, 1) };
}

fn pump_events(event_loop: &mut EventLoop<()>, input: &mut InputState) {
    let status = event_loop.pump_events(Some(Duration::ZERO), |event, target| {
        if let Event::WindowEvent { window_id, event } = event {
            if input.handle_window_event(window_id, &event) {
                target.exit();
            }
        }
    });
    if let PumpStatus::Exit(code) = status {
        debug!(code, "event loop exited");
        input.close_requested = true;
    }
}

fn log_frame(
    info_level: bool,
    sample: TimeSample,
    measured: Duration,
    slept: Duration,
    aspect: f32,
) {
    if info_level {
        info!("{:.5}", sample.seconds);
    } else {
        trace!(
            frame = sample.frame_index,
            work_us = measured.as_micros() as u64,
            sleep_ms = slept.as_millis() as u64,
            aspect,
            "{:.5}",
            sample.seconds
        );
    }
}

fn aspect_ratio(size: PhysicalSize<u32>) -> f32 {
    size.width as f32 / size.height.max(1) as f32
}

/// Window events the loop reacts to.
#[derive(Debug)]
struct InputState {
    window: WindowId,
    exit_on_escape: bool,
    close_requested: bool,
}

impl InputState {
    fn new(window: WindowId, exit_on_escape: bool) -> Self {
        Self {
            window,
            exit_on_escape,
            close_requested: false,
        }
    }

    /// Returns true when the event asks the demo to close.
    fn handle_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> bool {
        if window_id != self.window {
            return false;
        }
        let close = match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => true,
            WindowEvent::KeyboardInput { event, .. } => {
                self.exit_on_escape
                    && event.state == ElementState::Pressed
                    && matches!(event.logical_key, Key::Named(NamedKey::Escape))
            }
            WindowEvent::Resized(size) => {
                debug!(width = size.width, height = size.height, "window resized");
                false
            }
            _ => false,
        };
        if close {
            info!("close requested");
            self.close_requested = true;
        }
        close
    }
}

/// A vertex array object that lives for one draw.
struct VertexArray<'gl> {
    id: GLuint,
    _gl: PhantomData<&'gl GlContext>,
}

impl<'gl> VertexArray<'gl> {
    fn new(_context: &'gl GlContext) -> Self {
        let mut id = 0;
        unsafe { gl::GenVertexArrays(1, &mut id) };
        Self {
            id,
            _gl: PhantomData,
        }
    }

    fn bind(&self) {
        unsafe { gl::BindVertexArray(self.id) };
    }
}

impl Drop for VertexArray<'_> {
    fn drop(&mut self) {
        unsafe {
            gl::BindVertexArray(0);
            gl::DeleteVertexArrays(1, &self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_survives_zero_height() {
        assert_eq!(aspect_ratio(PhysicalSize::new(512, 512)), 1.0);
        assert_eq!(aspect_ratio(PhysicalSize::new(1024, 512)), 2.0);
        assert_eq!(aspect_ratio(PhysicalSize::new(300, 0)), 300.0);
    }

    #[test]
    fn close_request_on_own_window_stops_the_loop() {
        let window = unsafe { WindowId::dummy() };
        let mut input = InputState::new(window, true);
        assert!(!input.handle_window_event(window, &WindowEvent::Focused(true)));
        assert!(!input.close_requested);
        assert!(input.handle_window_event(window, &WindowEvent::CloseRequested));
        assert!(input.close_requested);
    }

    #[test]
    fn resize_does_not_close() {
        let window = unsafe { WindowId::dummy() };
        let mut input = InputState::new(window, true);
        let resized = WindowEvent::Resized(PhysicalSize::new(640, 480));
        assert!(!input.handle_window_event(window, &resized));
        assert!(!input.close_requested);
    }
}
