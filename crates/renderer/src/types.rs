use std::time::Duration;

use soundtrack::AudioError;

use crate::lifecycle::TransitionError;

/// Start-up failures. Every variant ends the process before the loop runs.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("failed to initialise the windowing system: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(String),
    #[error("failed to create OpenGL {major}.{minor} core context: {source}")]
    Context {
        major: u8,
        minor: u8,
        #[source]
        source: glutin::error::Error,
    },
    #[error("no framebuffer config matched the requested format")]
    NoFramebufferConfig,
    #[error("failed to create window surface: {0}")]
    Surface(#[source] glutin::error::Error),
    #[error("failed to load OpenGL entry points: `{symbol}` did not resolve")]
    Loader { symbol: &'static str },
    #[error("failed to create shader program object")]
    Program,
    #[error("failed to initialise audio: {0}")]
    Audio(#[from] AudioError),
}

/// Failures raised while the loop is running.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to present frame {frame}: {source}")]
    Swap {
        frame: u64,
        #[source]
        source: glutin::error::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Lifecycle(#[from] TransitionError),
}

/// Totals reported once the loop has exited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub simulated_seconds: f32,
    pub wall_clock: Duration,
}

impl RunSummary {
    /// Average presented frames per wall-clock second.
    pub fn average_fps(&self) -> f32 {
        let secs = self.wall_clock.as_secs_f32();
        if secs <= f32::EPSILON {
            0.0
        } else {
            self.frames as f32 / secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_fps_handles_zero_wall_clock() {
        let summary = RunSummary {
            frames: 10,
            simulated_seconds: 10.0 / 60.0,
            wall_clock: Duration::ZERO,
        };
        assert_eq!(summary.average_fps(), 0.0);
    }

    #[test]
    fn average_fps_divides_frames_by_seconds() {
        let summary = RunSummary {
            frames: 120,
            simulated_seconds: 2.0,
            wall_clock: Duration::from_secs(4),
        };
        assert!((summary.average_fps() - 30.0).abs() < 1e-4);
    }

    #[test]
    fn loader_error_names_missing_symbol() {
        let err = InitError::Loader {
            symbol: "glProgramUniform1f",
        };
        assert!(err.to_string().contains("glProgramUniform1f"));
    }
}
