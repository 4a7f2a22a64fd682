//! OpenGL demo runtime for DemoStuff.
//!
//! The crate opens one window with an OpenGL 4.x core context, builds a
//! geometry + vertex + fragment program from files on disk, starts the music
//! and then draws a single point per frame that the geometry stage expands to
//! a full-screen quad. The overall flow is:
//!
//! ```text
//!   CLI / demostuff
//!          │ DemoConfig
//!          ▼
//!   Renderer::run ──▶ GlContext ──▶ ShaderProgram ──▶ frame loop
//!          │                                             │
//!          └─▶ Mixer / Playback                          ├─▶ FrameUniforms (iResolution, iTime)
//!                                                        └─▶ FramePacer + SimulationClock
//! ```
//!
//! Simulated time advances by exactly `1 / target_fps` per presented frame, so
//! shader animation is deterministic in frame count rather than wall clock.

mod context;
mod lifecycle;
mod runtime;
mod shader;
mod types;
mod uniforms;
mod window;

use democonfig::DemoConfig;
use tracing::warn;

pub use context::{GlContext, GlInfo};
pub use lifecycle::{Lifecycle, Stage, TransitionError};
pub use runtime::{FramePacer, SimulationClock, Sleeper, ThreadSleeper, TimeSample};
pub use shader::{
    load_source, AttachOutcome, BuildReport, CheckOutcome, ShaderProgram, ShaderSources, StageKind,
};
pub use types::{DemoError, InitError, RenderError, RunSummary};
pub use uniforms::{
    locate, set_float, set_vec2, FrameUniforms, UniformLocation, RESOLUTION_UNIFORM, TIME_UNIFORM,
};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: DemoConfig,
    lifecycle: Lifecycle,
}

impl Renderer {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            config,
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.lifecycle.stage()
    }

    /// Runs the demo until the window closes or the frame limit is reached.
    ///
    /// Every resource acquired before a failure is released before this returns,
    /// and the lifecycle always ends in [`Stage::Terminated`].
    pub fn run(&mut self) -> Result<RunSummary, DemoError> {
        let result = window::run_demo(&self.config, &mut self.lifecycle);
        if self.lifecycle.stage() != Stage::Terminated {
            if let Err(err) = self.lifecycle.advance(Stage::Terminated) {
                warn!("{err}");
            }
        }
        result
    }
}

/// Convenience wrapper around [`Renderer::run`].
pub fn run(config: DemoConfig) -> Result<RunSummary, DemoError> {
    Renderer::new(config).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_renderer_has_not_started() {
        let renderer = Renderer::new(DemoConfig::default());
        assert_eq!(renderer.stage(), Stage::Uninitialized);
        assert_eq!(renderer.config().window.width, 512);
    }
}
