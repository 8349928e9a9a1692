//! Shared tracking state
//!
//! Trackers produce values, the driver publishes them here, and the
//! projector reads them every frame. Only [`crate::MagicWindow`] holds a
//! mutable reference, so each field has exactly one writer.

use std::fmt;

use glam::Vec2;
use log::{info, warn};

/// How long `is_calibrated()` stays true after a calibration, in seconds.
pub const CALIBRATION_FEEDBACK_SECS: f32 = 1.5;

/// Head position in [-1, 1] on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedInput {
    pub x: f32,
    pub y: f32,
}

impl NormalizedInput {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Builds an input, clamping each axis into [-1, 1].
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(-1.0, 1.0),
        }
    }

    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// True when either axis is outside the deadzone.
    pub fn exceeds(self, deadzone: f32) -> bool {
        self.x.abs() > deadzone || self.y.abs() > deadzone
    }
}

impl From<Vec2> for NormalizedInput {
    fn from(v: Vec2) -> Self {
        Self::new(v.x, v.y)
    }
}

/// Baseline subtracted from the input to define "center".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationOffset {
    pub x: f32,
    pub y: f32,
}

impl CalibrationOffset {
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<NormalizedInput> for CalibrationOffset {
    fn from(input: NormalizedInput) -> Self {
        Self { x: input.x, y: input.y }
    }
}

/// Progress reports from the active tracker. Not a strict state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingStatus {
    #[default]
    Disconnected,
    Initializing,
    Active,
    Tracking,
    Error,
    PermissionDenied,
    Unsupported,
    Unavailable,
}

impl TrackingStatus {
    /// Whether a tracker is delivering (or about to deliver) head positions.
    pub fn is_live(self) -> bool {
        matches!(self, TrackingStatus::Active | TrackingStatus::Tracking)
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrackingStatus::Disconnected => "DISCONNECTED",
            TrackingStatus::Initializing => "INITIALIZING",
            TrackingStatus::Active => "ACTIVE",
            TrackingStatus::Tracking => "TRACKING",
            TrackingStatus::Error => "ERROR",
            TrackingStatus::PermissionDenied => "PERMISSION_DENIED",
            TrackingStatus::Unsupported => "UNSUPPORTED",
            TrackingStatus::Unavailable => "UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// Which source feeds the shared input this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    Face,
    Gyro,
    #[default]
    Mouse,
}

/// Per-session state shared between the trackers and the projector.
#[derive(Debug, Clone)]
pub struct TrackingContext {
    input: NormalizedInput,
    face_scale: f32,
    status: TrackingStatus,
    calibration: CalibrationOffset,
    mode: InputMode,
    calibration_generation: u64,
    calibration_feedback: f32,
}

impl Default for TrackingContext {
    fn default() -> Self {
        Self::new(InputMode::default())
    }
}

impl TrackingContext {
    pub fn new(mode: InputMode) -> Self {
        Self {
            input: NormalizedInput::ZERO,
            face_scale: 1.0,
            status: TrackingStatus::Disconnected,
            calibration: CalibrationOffset::default(),
            mode,
            calibration_generation: 0,
            calibration_feedback: 0.0,
        }
    }

    pub fn input(&self) -> NormalizedInput {
        self.input
    }

    pub fn face_scale(&self) -> f32 {
        self.face_scale
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn calibration(&self) -> CalibrationOffset {
        self.calibration
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Bumped on every `calibrate()`; trackers re-arm when it changes.
    pub fn calibration_generation(&self) -> u64 {
        self.calibration_generation
    }

    /// True for a short while after `calibrate()`, for UI feedback.
    pub fn is_calibrated(&self) -> bool {
        self.calibration_feedback > 0.0
    }

    /// Treat the current head position as the new center.
    pub fn calibrate(&mut self) {
        self.calibration = self.input.into();
        self.calibration_generation += 1;
        self.calibration_feedback = CALIBRATION_FEEDBACK_SECS;
        info!(
            "Calibrated center at x={:.3} y={:.3}",
            self.calibration.x, self.calibration.y
        );
    }

    pub fn publish(&mut self, input: NormalizedInput, status: TrackingStatus) {
        if status != self.status {
            if self.status.is_live() && !status.is_live() {
                warn!("Tracking lost: {} -> {}, pointer takes over", self.status, status);
            } else {
                info!("Tracking status: {} -> {}", self.status, status);
            }
        }
        self.input = input;
        self.status = status;
    }

    pub fn publish_scale(&mut self, scale: f32) {
        self.face_scale = scale;
    }

    /// Counts down the calibration feedback window.
    pub fn advance(&mut self, dt: f32) {
        if self.calibration_feedback > 0.0 {
            self.calibration_feedback = (self.calibration_feedback - dt).max(0.0);
        }
    }

    /// End of session. Calibration survives until the next `calibrate()`.
    pub fn reset(&mut self) {
        self.input = NormalizedInput::ZERO;
        self.face_scale = 1.0;
        self.status = TrackingStatus::Disconnected;
        self.calibration_feedback = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_input_is_clamped() {
        let input = NormalizedInput::new(1.7, -3.0);
        assert_eq!(input, NormalizedInput { x: 1.0, y: -1.0 });
        assert_eq!(NormalizedInput::from(Vec2::new(0.25, 0.5)).as_vec2(), Vec2::new(0.25, 0.5));
    }

    #[test]
    fn deadzone_checks_either_axis() {
        assert!(!NormalizedInput::new(0.01, -0.01).exceeds(0.01));
        assert!(NormalizedInput::new(0.0, 0.02).exceeds(0.01));
        assert!(NormalizedInput::new(-0.5, 0.0).exceeds(0.01));
    }

    #[test]
    fn calibrate_captures_current_input() {
        let mut ctx = TrackingContext::new(InputMode::Face);
        ctx.publish(NormalizedInput::new(0.3, -0.2), TrackingStatus::Tracking);
        ctx.calibrate();

        assert_eq!(ctx.calibration(), CalibrationOffset { x: 0.3, y: -0.2 });
        assert_eq!(ctx.calibration_generation(), 1);
        let centered = ctx.input().as_vec2() - ctx.calibration().as_vec2();
        assert!(centered.length() < 1e-6);
    }

    #[test]
    fn calibration_feedback_expires() {
        let mut ctx = TrackingContext::new(InputMode::Gyro);
        ctx.calibrate();
        assert!(ctx.is_calibrated());
        ctx.advance(1.0);
        assert!(ctx.is_calibrated());
        ctx.advance(0.6);
        assert!(!ctx.is_calibrated());
    }

    #[test]
    fn reset_keeps_calibration() {
        let mut ctx = TrackingContext::new(InputMode::Face);
        ctx.publish(NormalizedInput::new(0.5, 0.5), TrackingStatus::Tracking);
        ctx.publish_scale(1.2);
        ctx.calibrate();
        ctx.reset();

        assert_eq!(ctx.input(), NormalizedInput::ZERO);
        assert_eq!(ctx.face_scale(), 1.0);
        assert_eq!(ctx.status(), TrackingStatus::Disconnected);
        assert_eq!(ctx.calibration(), CalibrationOffset { x: 0.5, y: 0.5 });
    }

    #[test]
    fn status_names_match_reported_strings() {
        assert_eq!(TrackingStatus::PermissionDenied.to_string(), "PERMISSION_DENIED");
        assert_eq!(TrackingStatus::default(), TrackingStatus::Disconnected);
        assert!(TrackingStatus::Tracking.is_live());
        assert!(!TrackingStatus::Error.is_live());
    }
}
