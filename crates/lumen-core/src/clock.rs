//! Frame clock with a fixed-timestep accumulator

use std::time::Instant;

/// Tracks wall time between frames and hands out fixed-size simulation steps
pub struct GameClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Fixed timestep interval in seconds
    pub fixed_timestep: f64,
    accumulator: f64,
    last_instant: Instant,
    first_tick: bool,
}

/// Longest frame fed into the accumulator, in seconds.
const MAX_FRAME_TIME: f64 = 0.25;

impl Default for GameClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            fixed_timestep: 0.016,
            accumulator: 0.0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl GameClock {
    /// Create a clock with the default 16 ms fixed step
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock with a custom fixed step length in seconds
    pub fn with_fixed_timestep_secs(step: f64) -> Self {
        Self {
            fixed_timestep: step,
            ..Self::default()
        }
    }

    /// Advance the clock from the wall clock. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.delta_time = 0.0;
            return;
        }
        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Advance the clock by an explicit amount of time.
    pub fn advance(&mut self, elapsed: f64) {
        self.delta_time = elapsed.clamp(0.0, MAX_FRAME_TIME);
        self.total_time += self.delta_time;
        self.accumulator += self.delta_time;
    }

    /// Drain every whole fixed step accumulated so far and return how many there were
    pub fn take_fixed_steps(&mut self) -> u32 {
        let mut steps = 0;
        while self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            steps += 1;
        }
        steps
    }

    /// Fraction of a fixed step left in the accumulator
    pub fn interpolation_alpha(&self) -> f64 {
        self.accumulator / self.fixed_timestep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_defaults() {
        let clock = GameClock::new();
        assert!((clock.fixed_timestep - 0.016).abs() < 1e-12);
        assert_eq!(clock.total_time, 0.0);
        assert_eq!(clock.delta_time, 0.0);
    }

    #[test]
    fn test_first_tick_zero_delta() {
        let mut clock = GameClock::new();
        clock.tick();
        assert_eq!(clock.delta_time, 0.0);
    }

    #[test]
    fn test_fixed_steps_drain_accumulator() {
        let mut clock = GameClock::with_fixed_timestep_secs(0.01);
        clock.advance(0.035);
        assert_eq!(clock.take_fixed_steps(), 3);
        assert_eq!(clock.take_fixed_steps(), 0);
        assert!((clock.interpolation_alpha() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut clock = GameClock::new();
        clock.advance(5.0);
        assert!((clock.delta_time - MAX_FRAME_TIME).abs() < 1e-12);
        assert!((clock.total_time - MAX_FRAME_TIME).abs() < 1e-12);
    }
}
