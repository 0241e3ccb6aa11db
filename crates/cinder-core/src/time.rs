//! Stepping-policy clock.
//!
//! [`StepClock`] owns the accumulator state behind the physics world's
//! two automatic stepping modes and turns each frame's delta time into
//! a [`StepPlan`]. Keeping the policy here, away from the engine,
//! makes step counts and residuals testable in isolation.

use crate::config::PhysicsConfig;

// ---------------------------------------------------------------------------
// StepPlan
// ---------------------------------------------------------------------------

/// How the engine should be advanced for one `update` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepPlan {
    /// Not enough time accumulated; do not step.
    Idle,
    /// Fixed-rate mode: advance `count` times by `dt` each.
    Fixed { dt: f32, count: u32 },
    /// Substep mode: advance `count` times by `dt` each, running the
    /// per-body post-step hook after every sub-step.
    Substep { dt: f32, count: u32 },
}

impl StepPlan {
    /// Total number of engine steps this plan performs.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::Fixed { count, .. } | Self::Substep { count, .. } => *count,
        }
    }
}

// ---------------------------------------------------------------------------
// StepClock
// ---------------------------------------------------------------------------

/// Accumulator and mode state for automatic stepping.
///
/// `fixed_rate > 0`: every whole `1 / fixed_rate` interval in the
/// accumulator becomes one engine step of `speed / fixed_rate`
/// seconds. The comparison is `>=`, so a frame carrying exactly N
/// fixed steps consumes all N and leaves a zero residual.
///
/// `fixed_rate == 0`: calls are counted; once the count exceeds
/// `update_rate`, the whole accumulator (scaled by `speed`) is split
/// into `substeps` equal steps and both counter and accumulator reset.
#[derive(Debug, Clone)]
pub struct StepClock {
    accumulator: f32,
    update_rate_count: u32,
    /// Fixed steps per second; 0 selects substep mode.
    pub fixed_rate: u32,
    /// Substeps per advance in substep mode (>= 1).
    pub substeps: u32,
    /// Simulation speed multiplier.
    pub speed: f32,
    /// Calls to skip between advances in substep mode.
    pub update_rate: u32,
}

impl StepClock {
    /// Create a clock from a validated [`PhysicsConfig`].
    #[must_use]
    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self {
            accumulator: 0.0,
            update_rate_count: 0,
            fixed_rate: config.fixed_rate,
            substeps: config.substeps.max(1),
            speed: config.speed,
            update_rate: config.update_rate,
        }
    }

    /// Residual accumulated time not yet consumed by steps.
    #[must_use]
    pub const fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Absorb one frame's delta time and decide how to step.
    pub fn plan(&mut self, dt: f32) -> StepPlan {
        self.accumulator += dt;

        if self.fixed_rate > 0 {
            let step = 1.0 / self.fixed_rate as f32;
            let mut count = 0;
            while self.accumulator >= step {
                self.accumulator -= step;
                count += 1;
            }
            if count == 0 {
                return StepPlan::Idle;
            }
            StepPlan::Fixed {
                dt: step * self.speed,
                count,
            }
        } else {
            self.update_rate_count += 1;
            if self.update_rate_count <= self.update_rate {
                return StepPlan::Idle;
            }
            let dt = self.accumulator * self.speed / self.substeps as f32;
            self.update_rate_count = 0;
            self.accumulator = 0.0;
            StepPlan::Substep {
                dt,
                count: self.substeps,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock(rate: u32) -> StepClock {
        StepClock::from_config(&PhysicsConfig {
            fixed_rate: rate,
            ..PhysicsConfig::default()
        })
    }

    #[test]
    fn fixed_rate_two_half_frames_yield_four_steps() {
        // 1/30 s carries exactly two 1/60 s steps, twice over.
        let mut clock = fixed_clock(60);
        let mut total = 0;
        for _ in 0..2 {
            total += clock.plan(1.0 / 30.0).steps();
        }
        assert_eq!(total, 4);
        assert!(clock.accumulator().abs() < 1e-6);
    }

    #[test]
    fn fixed_rate_short_frame_accumulates_without_stepping() {
        let mut clock = fixed_clock(60);
        assert_eq!(clock.plan(0.01), StepPlan::Idle);
        assert!((clock.accumulator() - 0.01).abs() < 1e-6);
        // Second short frame crosses the threshold once.
        assert_eq!(clock.plan(0.01).steps(), 1);
    }

    #[test]
    fn fixed_rate_step_dt_is_scaled_by_speed() {
        let mut clock = fixed_clock(60);
        clock.speed = 2.0;
        match clock.plan(1.0 / 60.0) {
            StepPlan::Fixed { dt, count } => {
                assert_eq!(count, 1);
                // Engine advances by step * speed while the accumulator
                // loses only one unscaled step.
                assert!((dt - 2.0 / 60.0).abs() < 1e-6);
            }
            other => panic!("expected fixed plan, got {other:?}"),
        }
    }

    #[test]
    fn substep_mode_splits_accumulated_time_evenly() {
        let mut clock = StepClock::from_config(&PhysicsConfig {
            fixed_rate: 0,
            substeps: 4,
            ..PhysicsConfig::default()
        });
        match clock.plan(0.02) {
            StepPlan::Substep { dt, count } => {
                assert_eq!(count, 4);
                assert!((dt - 0.005).abs() < 1e-6);
            }
            other => panic!("expected substep plan, got {other:?}"),
        }
        assert_eq!(clock.accumulator(), 0.0);
    }

    #[test]
    fn substep_mode_update_rate_skips_calls() {
        let mut clock = StepClock::from_config(&PhysicsConfig {
            fixed_rate: 0,
            update_rate: 1,
            ..PhysicsConfig::default()
        });
        // First call only accumulates; second advances with both deltas.
        assert_eq!(clock.plan(0.01), StepPlan::Idle);
        match clock.plan(0.01) {
            StepPlan::Substep { dt, count } => {
                assert_eq!(count, 1);
                assert!((dt - 0.02).abs() < 1e-6);
            }
            other => panic!("expected substep plan, got {other:?}"),
        }
        // Counter reset: the pattern repeats.
        assert_eq!(clock.plan(0.01), StepPlan::Idle);
        assert_eq!(clock.plan(0.01).steps(), 1);
    }

    #[test]
    fn substep_counter_and_accumulator_reset_after_advance() {
        let mut clock = StepClock::from_config(&PhysicsConfig::default());
        assert_eq!(clock.plan(0.016).steps(), 1);
        assert_eq!(clock.accumulator(), 0.0);
        assert_eq!(clock.update_rate_count, 0);
    }
}
