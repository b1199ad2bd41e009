use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::density::DensityFieldParams;

/// Seconds of wall time per unit of animation clock, inverted.
pub const TIME_SCALE: f32 = 0.01;

/// Drift speeds in texture tiles per clock cycle.
///
/// The clock wraps from 1 back to 0, so only whole-number speeds make the wrap
/// seamless; fractional speeds jump once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationParams {
    pub shape_speed: Vec2,
    pub detail_speed: Vec2,
    pub paused: bool,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self { shape_speed: Vec2::new(1.0, 0.0), detail_speed: Vec2::new(2.0, 1.0), paused: false }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationDriver {
    clock: f32,
    shape_offset: Vec2,
    detail_offset: Vec2,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Running clock, always in [0, 1).
    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn shape_offset(&self) -> Vec2 {
        self.shape_offset
    }

    pub fn detail_offset(&self) -> Vec2 {
        self.detail_offset
    }

    /// Advances by `dt` seconds. Negative or non-finite deltas are ignored.
    pub fn update(&mut self, dt: f32, params: &AnimationParams) {
        if !params.paused && dt.is_finite() && dt > 0.0 {
            let clock = (self.clock + dt * TIME_SCALE).rem_euclid(1.0);
            self.clock = if clock < 1.0 { clock } else { 0.0 };
        }
        self.shape_offset = params.shape_speed * self.clock;
        self.detail_offset = params.detail_speed * self.clock;
    }

    /// Writes the current offsets into the density parameters.
    pub fn apply(&self, density: &mut DensityFieldParams) {
        density.shape_offset = self.shape_offset;
        density.detail_offset = self.detail_offset;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn clock_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = AnimationParams::default();
        let mut driver = AnimationDriver::new();
        for _ in 0..100_000 {
            let dt = match rng.gen_range(0..10) {
                0 => rng.gen_range(0.0..1.0e6),
                1 => 99.999_99,
                _ => rng.gen_range(0.0..0.1),
            };
            driver.update(dt, &params);
            assert!((0.0..1.0).contains(&driver.clock()), "clock {}", driver.clock());
        }
    }

    #[test]
    fn offsets_follow_speeds() {
        let params = AnimationParams { shape_speed: Vec2::new(2.0, -1.0), detail_speed: Vec2::new(0.0, 3.0), paused: false };
        let mut driver = AnimationDriver::new();
        driver.update(25.0, &params);
        assert!((driver.clock() - 0.25).abs() < 1e-6);
        assert!((driver.shape_offset() - Vec2::new(0.5, -0.25)).abs().max_element() < 1e-6);
        assert!((driver.detail_offset() - Vec2::new(0.0, 0.75)).abs().max_element() < 1e-6);

        let mut density = DensityFieldParams::default();
        driver.apply(&mut density);
        assert_eq!(density.shape_offset, driver.shape_offset());
        assert_eq!(density.detail_offset, driver.detail_offset());
    }

    #[test]
    fn bad_deltas_and_pause_hold_the_clock() {
        let mut driver = AnimationDriver::new();
        let params = AnimationParams::default();
        driver.update(10.0, &params);
        let held = driver.clock();
        for dt in [-1.0, f32::NAN, f32::INFINITY, 0.0] {
            driver.update(dt, &params);
            assert_eq!(driver.clock(), held);
        }
        driver.update(10.0, &AnimationParams { paused: true, ..params });
        assert_eq!(driver.clock(), held);
    }
}
