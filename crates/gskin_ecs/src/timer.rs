//! Countdown timers driven by tick deltas

/// How often a [`Timer`] restarts after completing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Repeat {
    /// Complete once and stay finished
    #[default]
    Once,
    /// Restart this many more times
    Times(u32),
    /// Restart forever
    Forever,
}

/// A timer counting up to `duration` seconds
///
/// Usable as a component value, and used by the schedule to gate
/// interval systems.
#[derive(Clone, Debug, PartialEq)]
pub struct Timer {
    duration: f32,
    elapsed: f32,
    paused: bool,
    repeat: Repeat,
    done: bool,
}

impl Timer {
    /// A one-shot timer
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            elapsed: 0.0,
            paused: false,
            repeat: Repeat::Once,
            done: false,
        }
    }

    /// A timer that restarts every time it completes
    pub fn repeating(duration: f32) -> Self {
        Self::new(duration).with_repeat(Repeat::Forever)
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Advance by `delta` seconds. Returns `true` if the timer completed
    /// during this call.
    ///
    /// A restarting timer keeps the overshoot past `duration` for its next
    /// run, less any whole periods, so it fires at most once per call.
    pub fn tick(&mut self, delta: f32) -> bool {
        if self.paused || self.done {
            return false;
        }

        self.elapsed += delta;
        if self.elapsed < self.duration {
            return false;
        }

        match self.repeat {
            Repeat::Times(0) | Repeat::Once => {
                self.elapsed = self.duration;
                self.done = true;
            }
            Repeat::Forever => self.restart(),
            Repeat::Times(n) => {
                self.repeat = Repeat::Times(n - 1);
                self.restart();
            }
        }
        true
    }

    fn restart(&mut self) {
        self.elapsed = if self.duration > 0.0 {
            (self.elapsed - self.duration) % self.duration
        } else {
            0.0
        };
    }

    /// Whether a non-repeating timer has completed
    pub fn finished(&self) -> bool {
        self.done
    }

    /// Progress through the current run, from 0 to 1
    pub fn quotient(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            self.elapsed / self.duration
        }
    }

    /// Seconds left in the current run
    pub fn remaining(&self) -> f32 {
        self.duration - self.elapsed
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Start over from zero
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.done = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot() {
        let mut timer = Timer::new(1.0);
        assert!(!timer.tick(0.5));
        assert_eq!(timer.quotient(), 0.5);
        assert!(timer.tick(0.75));
        assert!(timer.finished());
        assert!(!timer.tick(1.0));
    }

    #[test]
    fn test_repeating() {
        let mut timer = Timer::repeating(0.5);
        let fired: Vec<bool> = (0..4).map(|_| timer.tick(0.25)).collect();
        assert_eq!(fired, vec![false, true, false, true]);
        assert!(!timer.finished());
    }

    #[test]
    fn test_repeating_carries_overshoot() {
        let mut timer = Timer::repeating(0.5);
        assert!(timer.tick(0.75));
        assert_eq!(timer.elapsed(), 0.25);
        assert!(timer.tick(0.25));
        assert_eq!(timer.elapsed(), 0.0);

        // whole extra periods are dropped, not replayed
        assert!(timer.tick(1.75));
        assert_eq!(timer.elapsed(), 0.25);
        assert!(!timer.tick(0.125));
    }

    #[test]
    fn test_repeat_times() {
        let mut timer = Timer::new(1.0).with_repeat(Repeat::Times(1));
        assert!(timer.tick(1.0));
        assert!(timer.tick(1.0));
        assert!(!timer.tick(1.0));
        assert!(timer.finished());
    }

    #[test]
    fn test_pause_and_reset() {
        let mut timer = Timer::new(1.0);
        timer.pause();
        assert!(!timer.tick(5.0));
        timer.resume();
        assert!(timer.tick(5.0));

        timer.reset();
        assert!(!timer.finished());
        assert_eq!(timer.remaining(), 1.0);
    }

    #[test]
    fn test_zero_duration_fires_immediately() {
        let mut timer = Timer::repeating(0.0);
        assert!(timer.tick(0.0));
        assert!(timer.tick(0.016));
        assert_eq!(timer.quotient(), 1.0);
    }
}
