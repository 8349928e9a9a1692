//! Error types for configuration and tracking.
//!
//! Configuration errors are fatal and only surface at setup. Tracking
//! errors never reach the render loop directly: trackers turn them into a
//! [`TrackingStatus`] and keep the projector running on the pointer path.

use thiserror::Error;

use crate::types::TrackingStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("eye-to-screen distance must be a positive finite number, got {0}")]
    EyeDistance(f32),
    #[error("virtual screen size must be positive, got {width} x {height}")]
    ScreenSize { width: f32, height: f32 },
    #[error("clip planes must satisfy 0 < near < far, got near={near} far={far}")]
    ClipPlanes { near: f32, far: f32 },
    #[error("{name} must be in (0, 1], got {value}")]
    SmoothingFactor { name: &'static str, value: f32 },
    #[error("physical screen config must be positive, got {width} x {height} cm at {distance} cm")]
    PhysicalScreen { width: f32, height: f32, distance: f32 },
    #[error("{name} must be non-negative and finite, got {value}")]
    Parameter { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("permission to read the sensor was denied")]
    PermissionDenied,
    #[error("device orientation is not supported on this device")]
    DeviceUnsupported,
    #[error("sensor stopped delivering readings")]
    SensorUnavailable,
    #[error("landmark detector failed to initialise: {0}")]
    DetectorInit(String),
    #[error("camera capture failed: {0}")]
    Camera(String),
    #[error("landmark detection failed: {0}")]
    Detection(String),
}

impl TrackingError {
    /// Status reported to consumers when this error ends or interrupts tracking.
    pub fn status(&self) -> TrackingStatus {
        match self {
            TrackingError::PermissionDenied => TrackingStatus::PermissionDenied,
            TrackingError::DeviceUnsupported => TrackingStatus::Unsupported,
            TrackingError::SensorUnavailable => TrackingStatus::Unavailable,
            TrackingError::DetectorInit(_)
            | TrackingError::Camera(_)
            | TrackingError::Detection(_) => TrackingStatus::Error,
        }
    }

    /// Whether the session can keep going after this error.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TrackingError::DetectorInit(_) | TrackingError::Camera(_)
        )
    }
}
