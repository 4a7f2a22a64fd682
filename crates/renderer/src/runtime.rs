use std::time::Duration;

use democonfig::PacingMode;

/// Upper bound on the overrun the catch-up pacer will try to repay.
const MAX_PACING_DEBT: Duration = Duration::from_secs(1);

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Fixed-timestep clock feeding `iTime`.
///
/// Every call to [`SimulationClock::advance`] adds exactly one `delta`,
/// independent of how long the frame actually took. The clock is never reset.
#[derive(Debug, Clone, Copy)]
pub struct SimulationClock {
    seconds: f32,
    delta: f32,
    frame: u64,
}

impl SimulationClock {
    pub fn new(delta: f32) -> Self {
        Self {
            seconds: 0.0,
            delta,
            frame: 0,
        }
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// The time value for the frame about to be rendered.
    pub fn sample(&self) -> TimeSample {
        TimeSample::new(self.seconds, self.frame)
    }

    /// Moves to the next frame and returns its sample.
    pub fn advance(&mut self) -> TimeSample {
        self.seconds += self.delta;
        self.frame = self.frame.saturating_add(1);
        self.sample()
    }
}

/// Blocking primitive used by the pacer.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Best-effort fixed-rate pacer.
///
/// After each frame the caller reports how long the frame's work took; the
/// pacer sleeps for whatever is left of the frame budget, truncated to whole
/// milliseconds. In [`PacingMode::Fixed`] an overrun is simply forgotten. In
/// [`PacingMode::CatchUp`] the overrun is carried as debt and paid back out of
/// the slack of later frames.
#[derive(Debug)]
pub struct FramePacer<S = ThreadSleeper> {
    target: Duration,
    mode: PacingMode,
    debt: Duration,
    sleeper: S,
}

impl FramePacer<ThreadSleeper> {
    pub fn new(target: Duration, mode: PacingMode) -> Self {
        Self::with_sleeper(target, mode, ThreadSleeper)
    }
}

impl<S: Sleeper> FramePacer<S> {
    pub fn with_sleeper(target: Duration, mode: PacingMode, sleeper: S) -> Self {
        Self {
            target,
            mode,
            debt: Duration::ZERO,
            sleeper,
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Outstanding overrun the catch-up mode still has to repay.
    pub fn debt(&self) -> Duration {
        self.debt
    }

    /// Computes the sleep owed after a frame whose work took `measured`.
    pub fn sleep_for(&mut self, measured: Duration) -> Duration {
        match self.mode {
            PacingMode::Fixed => self.target.saturating_sub(measured),
            PacingMode::CatchUp => {
                if measured >= self.target {
                    self.debt = (self.debt + (measured - self.target)).min(MAX_PACING_DEBT);
                    return Duration::ZERO;
                }
                let slack = self.target - measured;
                let repaid = slack.min(self.debt);
                self.debt -= repaid;
                slack - repaid
            }
        }
    }

    /// Sleeps for the remainder of the frame budget; returns the time slept.
    pub fn pace(&mut self, measured: Duration) -> Duration {
        let requested = truncate_to_millis(self.sleep_for(measured));
        if !requested.is_zero() {
            self.sleeper.sleep(requested);
        }
        requested
    }
}

fn truncate_to_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
