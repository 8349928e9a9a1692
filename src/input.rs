//! Input selection and pointer fallback
//!
//! Picks the head-tracking source for a session from the device's
//! capabilities, and keeps a normalized pointer position that the
//! projector uses whenever the tracker has nothing to say.

use glam::Vec2;
use log::info;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{TouchPhase, WindowEvent};

use crate::face::FaceTracker;
use crate::gyro::GyroTracker;
use crate::types::{InputMode, NormalizedInput, TrackingStatus};

/// Viewports narrower than this count as phone/tablet sized.
pub const SMALL_SCREEN_WIDTH: u32 = 1024;

/// What the host device offers, as far as input selection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    pub has_touch: bool,
    pub viewport_width: u32,
    pub has_orientation: bool,
}

impl DeviceCapabilities {
    /// Touch + small screen + orientation sensor means tilt input, anything
    /// else gets the webcam.
    pub fn preferred_mode(&self) -> InputMode {
        let mobile =
            self.has_touch && self.viewport_width < SMALL_SCREEN_WIDTH && self.has_orientation;
        if mobile {
            InputMode::Gyro
        } else {
            InputMode::Face
        }
    }
}

/// The one tracker feeding the shared input this session.
pub enum Tracker {
    Face(FaceTracker),
    Gyro(GyroTracker),
    /// No tracker; the projector always falls back to the pointer.
    Pointer,
}

impl Tracker {
    /// Builds only the tracker the capabilities call for.
    pub fn for_capabilities(
        caps: DeviceCapabilities,
        face: impl FnOnce() -> FaceTracker,
        gyro: impl FnOnce() -> GyroTracker,
    ) -> Self {
        let mode = caps.preferred_mode();
        info!(
            "Device detection: mode={:?}, touch={}, width={}, orientation={}",
            mode, caps.has_touch, caps.viewport_width, caps.has_orientation
        );
        match mode {
            InputMode::Gyro => Tracker::Gyro(gyro()),
            InputMode::Face => Tracker::Face(face()),
            InputMode::Mouse => Tracker::Pointer,
        }
    }

    pub fn mode(&self) -> InputMode {
        match self {
            Tracker::Face(_) => InputMode::Face,
            Tracker::Gyro(_) => InputMode::Gyro,
            Tracker::Pointer => InputMode::Mouse,
        }
    }

    pub fn produce(&mut self) -> (NormalizedInput, TrackingStatus) {
        match self {
            Tracker::Face(t) => t.produce(),
            Tracker::Gyro(t) => t.produce(),
            Tracker::Pointer => (NormalizedInput::ZERO, TrackingStatus::Disconnected),
        }
    }

    /// Proximity scale, only the face tracker measures one.
    pub fn face_scale(&self) -> Option<f32> {
        match self {
            Tracker::Face(t) => Some(t.scale()),
            _ => None,
        }
    }

    pub fn rearm_calibration(&mut self) {
        if let Tracker::Gyro(t) = self {
            t.rearm_calibration();
        }
    }

    pub fn shutdown(&mut self) {
        match self {
            Tracker::Face(t) => t.shutdown(),
            Tracker::Gyro(t) => t.shutdown(),
            Tracker::Pointer => {}
        }
    }
}

/// Pointer position in [-1, 1], y up. Raw: no smoothing or calibration.
#[derive(Debug, Clone, Copy)]
pub struct PointerInput {
    position: Vec2,
    window_size: PhysicalSize<u32>,
}

impl PointerInput {
    pub fn new(window_size: PhysicalSize<u32>) -> Self {
        Self {
            position: Vec2::ZERO,
            window_size,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.window_size = size;
    }

    pub fn set_cursor(&mut self, pos: PhysicalPosition<f64>) {
        let (w, h) = (self.window_size.width, self.window_size.height);
        if w == 0 || h == 0 {
            return;
        }
        self.position = Vec2::new(
            ((pos.x / w as f64 - 0.5) * 2.0) as f32,
            (-(pos.y / h as f64 - 0.5) * 2.0) as f32,
        );
    }

    /// Returns true if the event was a touch, for capability detection.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Resized(size) => {
                self.resize(*size);
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.set_cursor(*position);
                false
            }
            WindowEvent::Touch(touch) => {
                if matches!(touch.phase, TouchPhase::Started | TouchPhase::Moved) {
                    self.set_cursor(touch.location);
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::tests::{FakeCamera, FakeDetector, Journal};
    use crate::gyro::tests::{FakeSensor, SensorState};
    use std::cell::RefCell;
    use std::rc::Rc;

    const EPSILON: f32 = 1e-5;

    fn face_tracker() -> FaceTracker {
        let journal = Rc::new(RefCell::new(Journal::default()));
        FaceTracker::new(
            Box::new(FakeCamera::new(journal.clone())),
            Box::new(FakeDetector::new(journal)),
        )
    }

    fn gyro_tracker() -> GyroTracker {
        GyroTracker::new(Box::new(FakeSensor(Rc::new(RefCell::new(SensorState::default())))))
    }

    #[test]
    fn phone_gets_gyro() {
        let caps = DeviceCapabilities {
            has_touch: true,
            viewport_width: 390,
            has_orientation: true,
        };
        assert_eq!(caps.preferred_mode(), InputMode::Gyro);
        let tracker = Tracker::for_capabilities(caps, || panic!("face not wanted"), gyro_tracker);
        assert_eq!(tracker.mode(), InputMode::Gyro);
    }

    #[test]
    fn desktop_and_touch_laptop_get_face() {
        for caps in [
            DeviceCapabilities {
                has_touch: false,
                viewport_width: 1440,
                has_orientation: false,
            },
            DeviceCapabilities {
                has_touch: true,
                viewport_width: 1440,
                has_orientation: true,
            },
            DeviceCapabilities {
                has_touch: true,
                viewport_width: 800,
                has_orientation: false,
            },
        ] {
            assert_eq!(caps.preferred_mode(), InputMode::Face);
        }
        let tracker = Tracker::for_capabilities(
            DeviceCapabilities::default(),
            face_tracker,
            || panic!("gyro not wanted"),
        );
        assert_eq!(tracker.mode(), InputMode::Face);
        assert_eq!(tracker.face_scale(), Some(1.0));
    }

    #[test]
    fn pointer_tracker_reports_nothing() {
        let mut tracker = Tracker::Pointer;
        assert_eq!(
            tracker.produce(),
            (NormalizedInput::ZERO, TrackingStatus::Disconnected)
        );
        tracker.rearm_calibration();
        tracker.shutdown();
        assert_eq!(tracker.face_scale(), None);
    }

    #[test]
    fn pointer_maps_window_pixels() {
        let mut pointer = PointerInput::new(PhysicalSize::new(800, 600));
        assert_eq!(pointer.position(), Vec2::ZERO);

        pointer.set_cursor(PhysicalPosition::new(800.0, 0.0));
        assert!((pointer.position() - Vec2::new(1.0, 1.0)).length() < EPSILON);

        pointer.set_cursor(PhysicalPosition::new(200.0, 450.0));
        assert!((pointer.position() - Vec2::new(-0.5, -0.5)).length() < EPSILON);
    }

    #[test]
    fn pointer_ignores_events_without_window_size() {
        let mut pointer = PointerInput::new(PhysicalSize::new(0, 0));
        pointer.set_cursor(PhysicalPosition::new(10.0, 10.0));
        assert_eq!(pointer.position(), Vec2::ZERO);

        assert!(!pointer.handle_window_event(&WindowEvent::Resized(PhysicalSize::new(100, 100))));
        pointer.set_cursor(PhysicalPosition::new(75.0, 25.0));
        assert!((pointer.position() - Vec2::new(0.5, 0.5)).length() < EPSILON);
    }
}
