//! Frame timer producing delta and elapsed time

use std::time::{Duration, Instant};

/// Longest delta reported by [`Timer::lap`]. Prevents camera jumps after the
/// host stalls (debugger, minimised window).
const MAX_LAP: Duration = Duration::from_millis(250);

/// Wall-clock timer.
///
/// `start` sets the baseline; every `lap` returns the time since the previous
/// lap and advances the elapsed total.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    last: Instant,
    lap: Duration,
    running: bool,
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            lap: Duration::ZERO,
            running: false,
        }
    }

    /// Resets the baseline to now.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last = now;
        self.lap = Duration::ZERO;
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ends the current lap and returns its length in seconds.
    pub fn lap(&mut self) -> f32 {
        if !self.running {
            self.start();
        }
        let now = Instant::now();
        self.lap = now.saturating_duration_since(self.last).min(MAX_LAP);
        self.last = now;
        self.lap.as_secs_f32()
    }

    /// Length of the last lap in seconds.
    pub fn lap_time(&self) -> f32 {
        self.lap.as_secs_f32()
    }

    /// Seconds since `start`, measured at the last lap.
    pub fn time(&self) -> f32 {
        self.last.saturating_duration_since(self.start).as_secs_f32()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lap_starts_a_stopped_timer() {
        let mut timer = Timer::new();
        assert!(!timer.is_running());
        let dt = timer.lap();
        assert!(timer.is_running());
        assert!(dt >= 0.0);
    }

    #[test]
    fn test_elapsed_time_never_decreases() {
        let mut timer = Timer::new();
        timer.start();
        let mut previous = timer.time();
        for _ in 0..10 {
            std::thread::sleep(Duration::from_millis(1));
            timer.lap();
            assert!(timer.time() >= previous);
            previous = timer.time();
        }
        assert!(previous > 0.0);
    }

    #[test]
    fn test_lap_is_clamped() {
        let mut timer = Timer::new();
        timer.start();
        timer.last -= Duration::from_secs(5);
        let dt = timer.lap();
        assert!((dt - MAX_LAP.as_secs_f32()).abs() < 1e-6);
    }
}
