//! Smoothing filters for head input and the resolution hint

use glam::Vec2;

/// Linear interpolation, `t` in [0, 1].
#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// Exponential smoothing applied independently per axis:
/// `smooth += (raw - smooth) * factor` on every sample.
#[derive(Debug, Clone, Copy)]
pub struct ExpSmoother2 {
    factor: f32,
    value: Vec2,
}

impl ExpSmoother2 {
    pub fn new(factor: f32) -> Self {
        Self {
            factor,
            value: Vec2::ZERO,
        }
    }

    pub fn update(&mut self, raw: Vec2) -> Vec2 {
        self.value += (raw - self.value) * self.factor;
        self.value
    }
}

/// Critically damped spring that eases a scalar toward a target over
/// roughly `smooth_time` seconds. Time-step aware and never overshoots.
#[derive(Debug, Clone, Copy)]
pub struct SmoothDamp {
    value: f32,
    velocity: f32,
    smooth_time: f32,
}

impl SmoothDamp {
    /// Distance to the target below which the value snaps.
    const EPSILON: f32 = 0.001;

    pub fn new(value: f32, smooth_time: f32) -> Self {
        Self {
            value,
            velocity: 0.0,
            smooth_time: smooth_time.max(0.0001),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Advances by `dt` seconds. Returns `false` once settled on the target.
    pub fn update(&mut self, target: f32, dt: f32) -> bool {
        if (self.value - target).abs() <= Self::EPSILON {
            self.value = target;
            return false;
        }
        if dt <= 0.0 {
            return true;
        }

        let omega = 2.0 / self.smooth_time;
        let x = omega * dt;
        // Pade-style approximation of exp(-x)
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

        let change = self.value - target;
        let temp = (self.velocity + omega * change) * dt;
        self.velocity = (self.velocity - omega * temp) * decay;
        let mut output = target + (change + temp) * decay;

        if (target - self.value > 0.0) == (output > target) {
            output = target;
            self.velocity = 0.0;
        }
        self.value = output;
        true
    }
}
