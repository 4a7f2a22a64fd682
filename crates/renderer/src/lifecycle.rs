use std::fmt;

use tracing::{debug, info};

/// Start-up and run phases of the demo, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Uninitialized,
    WindowReady,
    GraphicsReady,
    AudioReady,
    ProgramLinked,
    Running,
    Terminated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Uninitialized => "uninitialized",
            Stage::WindowReady => "window-ready",
            Stage::GraphicsReady => "graphics-ready",
            Stage::AudioReady => "audio-ready",
            Stage::ProgramLinked => "program-linked",
            Stage::Running => "running",
            Stage::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal lifecycle transition {from} -> {to}")]
pub struct TransitionError {
    pub from: Stage,
    pub to: Stage,
}

/// Forward-only tracker for [`Stage`].
#[derive(Debug)]
pub struct Lifecycle {
    stage: Stage,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            stage: Stage::Uninitialized,
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Moves to `next`. Stages may be skipped only when jumping straight to
    /// `Terminated`; everything else must be the immediate successor.
    pub fn advance(&mut self, next: Stage) -> Result<(), TransitionError> {
        let allowed = match next {
            Stage::Terminated => self.stage != Stage::Terminated,
            _ => successor(self.stage) == Some(next),
        };
        if !allowed {
            return Err(TransitionError {
                from: self.stage,
                to: next,
            });
        }
        debug!(from = %self.stage, to = %next, "lifecycle transition");
        if next == Stage::Running || next == Stage::Terminated {
            info!(stage = %next, "demo {next}");
        }
        self.stage = next;
        Ok(())
    }
}

fn successor(stage: Stage) -> Option<Stage> {
    match stage {
        Stage::Uninitialized => Some(Stage::WindowReady),
        Stage::WindowReady => Some(Stage::GraphicsReady),
        Stage::GraphicsReady => Some(Stage::AudioReady),
        Stage::AudioReady => Some(Stage::ProgramLinked),
        Stage::ProgramLinked => Some(Stage::Running),
        Stage::Running => Some(Stage::Terminated),
        Stage::Terminated => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_every_stage_in_order() {
        let mut lifecycle = Lifecycle::new();
        for next in [
            Stage::WindowReady,
            Stage::GraphicsReady,
            Stage::AudioReady,
            Stage::ProgramLinked,
            Stage::Running,
            Stage::Terminated,
        ] {
            lifecycle.advance(next).expect("forward transition");
            assert_eq!(lifecycle.stage(), next);
        }
    }

    #[test]
    fn rejects_backward_and_skipping_moves() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Stage::WindowReady).unwrap();
        let err = lifecycle.advance(Stage::AudioReady).unwrap_err();
        assert_eq!(err.from, Stage::WindowReady);
        assert_eq!(err.to, Stage::AudioReady);
        assert!(lifecycle.advance(Stage::Uninitialized).is_err());
        assert_eq!(lifecycle.stage(), Stage::WindowReady);
    }

    #[test]
    fn failed_start_up_terminates_without_running() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(Stage::WindowReady).unwrap();
        lifecycle.advance(Stage::Terminated).unwrap();
        assert!(lifecycle.advance(Stage::Terminated).is_err());
        assert!(lifecycle.advance(Stage::Running).is_err());
    }
}
