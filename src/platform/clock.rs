//! Frame pacing

use std::time::{Duration, Instant};

use crate::consts::FRAMES_PER_SECOND;

/// Frames averaged for the FPS readout
const FPS_WINDOW: usize = 50;

/// Sleeps out the rest of each frame's budget. An overrun frame is simply
/// late: there is no sleep and no catch-up.
pub struct FramePacer {
    budget: Duration,
    frame_start: Instant,
    /// Skip sleeping entirely (headless fast runs, tests)
    unthrottled: bool,
    frame_times: [Option<Instant>; FPS_WINDOW],
    frame_index: usize,
    overruns: u64,
}

impl FramePacer {
    pub fn new() -> Self {
        Self::with_rate(FRAMES_PER_SECOND)
    }

    pub fn with_rate(fps: u32) -> Self {
        Self {
            budget: Duration::from_secs(1) / fps.max(1),
            frame_start: Instant::now(),
            unthrottled: false,
            frame_times: [None; FPS_WINDOW],
            frame_index: 0,
            overruns: 0,
        }
    }

    /// Never sleep
    pub fn unthrottled() -> Self {
        Self {
            unthrottled: true,
            ..Self::new()
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Mark the start of a frame
    pub fn begin_frame(&mut self) {
        self.frame_start = Instant::now();
        self.frame_times[self.frame_index] = Some(self.frame_start);
        self.frame_index = (self.frame_index + 1) % FPS_WINDOW;
    }

    /// Time left in this frame's budget, zero once it is used up
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.frame_start.elapsed())
    }

    /// Sleep until the frame budget is used up
    pub fn end_frame(&mut self) {
        let remaining = self.remaining();
        if remaining.is_zero() {
            self.overruns += 1;
            log::trace!("Frame overran its {:?} budget", self.budget);
            return;
        }
        if !self.unthrottled {
            std::thread::sleep(remaining);
        }
    }

    /// Frames that took longer than the budget
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Measured frame rate over the last few frames
    pub fn fps(&self) -> Option<f64> {
        // The slot about to be overwritten holds the oldest start time
        let oldest = self.frame_times[self.frame_index]?;
        let newest_index = (self.frame_index + FPS_WINDOW - 1) % FPS_WINDOW;
        let newest = self.frame_times[newest_index]?;
        let elapsed = newest.duration_since(oldest).as_secs_f64();
        (elapsed > 0.0).then(|| (FPS_WINDOW - 1) as f64 / elapsed)
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_matches_rate() {
        assert_eq!(FramePacer::new().budget(), Duration::from_millis(20));
        assert_eq!(FramePacer::with_rate(0).budget(), Duration::from_secs(1));
    }

    #[test]
    fn test_sleeps_out_the_budget() {
        let mut pacer = FramePacer::with_rate(100);
        let start = Instant::now();
        pacer.begin_frame();
        pacer.end_frame();
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert_eq!(pacer.overruns(), 0);
    }

    #[test]
    fn test_overrun_does_not_sleep() {
        let mut pacer = FramePacer::with_rate(1000);
        pacer.begin_frame();
        std::thread::sleep(Duration::from_millis(3));
        assert!(pacer.remaining().is_zero());
        let start = Instant::now();
        pacer.end_frame();
        assert!(start.elapsed() < Duration::from_millis(1));
        assert_eq!(pacer.overruns(), 1);
    }

    #[test]
    fn test_fps_needs_a_full_window() {
        let mut pacer = FramePacer::unthrottled();
        pacer.begin_frame();
        assert_eq!(pacer.fps(), None);
    }
}
