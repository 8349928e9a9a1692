//! Off-axis projection
//!
//! The virtual window is a fixed rectangle on the z = 0 plane. Each frame the
//! eye moves with the viewer's head and the frustum is sheared so the window
//! edges stay put on screen. The camera never rotates.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};
use log::debug;

use crate::config::{DepthRange, ProjectionConfig, ResolutionConfig};
use crate::error::ConfigError;
use crate::smoothing::{lerp, SmoothDamp};
use crate::types::{CalibrationOffset, NormalizedInput};

/// Receives the camera pose and projection every frame.
pub trait CameraSink {
    fn apply_camera(&mut self, frame: &CameraFrame);
}

/// Receives the render-resolution multiplier.
pub trait ResolutionSink {
    fn set_pixel_ratio(&mut self, ratio: f32);
}

/// Smoothed eye position in scene units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl EyeState {
    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// The virtual window's edges on the z = 0 plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl WindowRect {
    pub fn from_config(config: &ProjectionConfig) -> Self {
        let half_w = config.screen_width / 2.0;
        let half_h = config.screen_height / 2.0;
        Self {
            left: -half_w,
            right: half_w,
            top: half_h + config.eye_base_height,
            bottom: -half_h + config.eye_base_height,
        }
    }
}

/// Near-plane extents of an asymmetric viewing volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// Projects the window corners onto the near plane as seen from `eye`.
    /// `eye.z` must be positive.
    pub fn for_eye(eye: Vec3, config: &ProjectionConfig) -> Self {
        let window = WindowRect::from_config(config);
        let k = config.near / eye.z;
        Self {
            left: (window.left - eye.x) * k,
            right: (window.right - eye.x) * k,
            top: (window.top - eye.y) * k,
            bottom: (window.bottom - eye.y) * k,
            near: config.near,
            far: config.far,
        }
    }

    /// False once the eye has moved past a window edge.
    pub fn is_ordered(&self) -> bool {
        self.left < self.right && self.bottom < self.top
    }

    /// Off-axis perspective matrix, right-handed, looking down -z.
    pub fn projection_matrix(&self, depth: DepthRange) -> Mat4 {
        let (l, r, t, b, n, f) = (
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.near,
            self.far,
        );

        let x_scale = 2.0 * n / (r - l);
        let y_scale = 2.0 * n / (t - b);
        let x_offset = (r + l) / (r - l);
        let y_offset = (t + b) / (t - b);
        let (z_scale, z_offset) = match depth {
            DepthRange::NegativeOneToOne => (-(f + n) / (f - n), -2.0 * f * n / (f - n)),
            DepthRange::ZeroToOne => (f / (n - f), n * f / (n - f)),
        };

        Mat4::from_cols(
            Vec4::new(x_scale, 0.0, 0.0, 0.0),
            Vec4::new(0.0, y_scale, 0.0, 0.0),
            Vec4::new(x_offset, y_offset, z_scale, -1.0),
            Vec4::new(0.0, 0.0, z_offset, 0.0),
        )
    }
}

/// Uniform block for a renderer: view-projection plus eye position.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub eye_position: [f32; 4], // w = 1
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    /// Input that drove the eye: calibrated tracker input or the pointer.
    pub input: Vec2,
    pub position: Vec3,
    pub frustum: Frustum,
    pub projection: Mat4,
    pub projection_inverse: Mat4,
}

impl CameraFrame {
    /// Translation only; the camera looks straight down -z.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn to_uniforms(&self) -> CameraUniforms {
        CameraUniforms {
            view_proj: self.view_projection().to_cols_array_2d(),
            eye_position: self.position.extend(1.0).to_array(),
        }
    }
}

/// Tracker input minus calibration, or the raw pointer when the tracker is
/// inside the deadzone on both axes.
pub fn effective_input(
    input: NormalizedInput,
    calibration: CalibrationOffset,
    pointer: Vec2,
    deadzone: f32,
) -> Vec2 {
    if input.exceeds(deadzone) {
        input.as_vec2() - calibration.as_vec2()
    } else {
        pointer
    }
}

pub struct OffAxisProjector {
    config: ProjectionConfig,
    eye: EyeState,
}

impl OffAxisProjector {
    pub fn new(config: ProjectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            eye: EyeState {
                x: 0.0,
                y: 0.0,
                z: config.eye_to_screen_distance,
            },
            config,
        })
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn eye(&self) -> EyeState {
        self.eye
    }

    /// One rendered frame. Eye smoothing uses a fixed per-frame factor.
    pub fn frame(
        &mut self,
        input: NormalizedInput,
        calibration: CalibrationOffset,
        pointer: Vec2,
    ) -> CameraFrame {
        let c = &self.config;
        let effective = effective_input(input, calibration, pointer, c.deadzone);

        let target_x = effective.x * c.eye_sensitivity_x;
        let target_y = effective.y * c.eye_sensitivity_y + c.eye_base_height;
        self.eye.x = lerp(self.eye.x, target_x, c.eye_smoothing);
        self.eye.y = lerp(self.eye.y, target_y, c.eye_smoothing);
        self.eye.z = c.eye_to_screen_distance;

        let position = self.eye.as_vec3();
        let frustum = Frustum::for_eye(position, c);
        let projection = frustum.projection_matrix(c.depth_range);

        CameraFrame {
            input: effective,
            position,
            frustum,
            projection,
            projection_inverse: projection.inverse(),
        }
    }
}

/// Drops the render resolution while the head moves fast and raises it
/// again once it settles, easing between the two.
pub struct ResolutionGovernor {
    config: ResolutionConfig,
    last_input: Vec2,
    ratio: SmoothDamp,
}

impl ResolutionGovernor {
    pub fn new(config: ResolutionConfig) -> Self {
        Self {
            ratio: SmoothDamp::new(config.initial_ratio, config.smooth_time),
            last_input: Vec2::ZERO,
            config,
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio.value()
    }

    pub fn target_for_speed(&self, speed: f32) -> f32 {
        if speed > self.config.speed_threshold {
            self.config.low_ratio
        } else {
            self.config.high_ratio
        }
    }

    pub fn update(&mut self, input: Vec2, dt: f32) -> f32 {
        let speed = input.distance(self.last_input) / dt.max(0.001);
        self.last_input = input;

        let target = self.target_for_speed(speed);
        if self.ratio.update(target, dt) {
            debug!(
                "Pixel ratio {:.2} -> {:.2} (speed {:.2})",
                self.ratio.value(),
                target,
                speed
            );
        }
        self.ratio.value()
    }
}
