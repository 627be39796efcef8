//! Simulation clock
//!
//! Every timed behavior compares `now` against a stored timestamp, so nothing
//! depends on how many ticks ran.

/// Elapsed simulated time in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    now: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Move time forward (negative deltas are ignored)
    pub fn advance(&mut self, dt: f32) -> f64 {
        self.now += f64::from(dt.max(0.0));
        self.now
    }

    /// Seconds since `timestamp`
    #[inline]
    pub fn since(&self, timestamp: f64) -> f64 {
        self.now - timestamp
    }
}
