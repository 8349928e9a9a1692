//! Tunable parameters for the projector and trackers.
//!
//! Every struct carries the reference scene's values in its `Default`.
//! Only `ProjectionConfig` and `ScreenConfig` can be rejected; the tracker
//! configs are plain constants.

use crate::error::ConfigError;

/// Which clip-space depth convention the projection matrix targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthRange {
    /// z in [-1, 1] (OpenGL / WebGL).
    #[default]
    NegativeOneToOne,
    /// z in [0, 1] (wgpu / Vulkan / Metal).
    ZeroToOne,
}

/// Virtual window and eye parameters, in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    pub eye_to_screen_distance: f32,
    pub eye_sensitivity_x: f32,
    pub eye_sensitivity_y: f32,
    pub eye_base_height: f32,
    pub near: f32,
    pub far: f32,
    /// Per-frame lerp factor, not scaled by frame time.
    pub eye_smoothing: f32,
    /// Below this on both axes the tracker input counts as "no signal".
    pub deadzone: f32,
    pub depth_range: DepthRange,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            screen_width: 7.0,
            screen_height: 4.0,
            eye_to_screen_distance: 7.5,
            eye_sensitivity_x: 5.0,
            eye_sensitivity_y: 1.5,
            eye_base_height: 0.6,
            near: 0.1,
            far: 100.0,
            eye_smoothing: 0.3,
            deadzone: 0.01,
            depth_range: DepthRange::NegativeOneToOne,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.eye_to_screen_distance.is_finite() && self.eye_to_screen_distance > 0.0) {
            return Err(ConfigError::EyeDistance(self.eye_to_screen_distance));
        }
        if !(self.screen_width > 0.0 && self.screen_height > 0.0)
            || !self.screen_width.is_finite()
            || !self.screen_height.is_finite()
        {
            return Err(ConfigError::ScreenSize {
                width: self.screen_width,
                height: self.screen_height,
            });
        }
        if !(self.near > 0.0 && self.far > self.near && self.far.is_finite()) {
            return Err(ConfigError::ClipPlanes {
                near: self.near,
                far: self.far,
            });
        }
        check_factor("eye_smoothing", self.eye_smoothing)?;
        check_non_negative("deadzone", self.deadzone)?;
        check_finite("eye_sensitivity_x", self.eye_sensitivity_x)?;
        check_finite("eye_sensitivity_y", self.eye_sensitivity_y)?;
        check_finite("eye_base_height", self.eye_base_height)?;
        Ok(())
    }
}

/// Physical display size and viewing distance, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenConfig {
    pub width: f32,
    pub height: f32,
    pub distance: f32,
}

/// Scene units per centimetre (10 cm = 1 unit).
pub const CM_TO_SCENE: f32 = 0.1;

impl Default for ScreenConfig {
    // 14" laptop panel at arm's length
    fn default() -> Self {
        Self {
            width: 30.41,
            height: 21.24,
            distance: 50.0,
        }
    }
}

/// Partial update for [`ScreenConfig`]; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenConfigUpdate {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub distance: Option<f32>,
}

impl ScreenConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) && ok(self.distance) {
            Ok(())
        } else {
            Err(ConfigError::PhysicalScreen {
                width: self.width,
                height: self.height,
                distance: self.distance,
            })
        }
    }

    /// Applies the given fields and re-validates. On error `self` is unchanged.
    pub fn merge(&mut self, update: ScreenConfigUpdate) -> Result<(), ConfigError> {
        let merged = ScreenConfig {
            width: update.width.unwrap_or(self.width),
            height: update.height.unwrap_or(self.height),
            distance: update.distance.unwrap_or(self.distance),
        };
        merged.validate()?;
        *self = merged;
        Ok(())
    }

    /// Size of the screen-fixed window bezel in scene units.
    pub fn window_extent(&self, cm_to_scene: f32) -> (f32, f32) {
        (self.width * cm_to_scene, self.height * cm_to_scene)
    }
}

/// Orientation tracker constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroConfig {
    /// Degrees of tilt mapped to a full [-1, 1] swing.
    pub tilt_range: f32,
    pub smoothing: f32,
    /// Reference used until the first reading arrives (natural holding angle).
    pub default_beta: f32,
    pub default_gamma: f32,
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            tilt_range: 30.0,
            smoothing: 0.15,
            default_beta: 45.0,
            default_gamma: 0.0,
        }
    }
}

/// Face tracker constants (landmark indices follow the 468-point face mesh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceConfig {
    pub nose_tip: usize,
    pub left_eye_outer: usize,
    pub right_eye_outer: usize,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            nose_tip: 1,
            left_eye_outer: 159,
            right_eye_outer: 386,
            min_scale: 0.7,
            max_scale: 1.5,
        }
    }
}

/// Velocity-driven render-resolution hint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionConfig {
    /// Input speed (units/sec) above which the low ratio is requested.
    pub speed_threshold: f32,
    pub low_ratio: f32,
    pub high_ratio: f32,
    pub smooth_time: f32,
    pub initial_ratio: f32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            speed_threshold: 0.5,
            low_ratio: 0.75,
            high_ratio: 1.5,
            smooth_time: 0.3,
            initial_ratio: 1.0,
        }
    }
}

fn check_factor(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::SmoothingFactor { name, value })
    }
}

fn check_non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Parameter { name, value })
    }
}

fn check_finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Parameter { name, value })
    }
}
