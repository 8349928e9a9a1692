//! Device-orientation tracking for phones and tablets
//!
//! Tilting the device plays the role of moving the head: gamma (left/right
//! tilt) drives x and beta (front/back tilt) drives y, both relative to a
//! reference reading that recalibration can move.

use glam::{EulerRot, Quat, Vec2};
use log::{error, info, warn};

use crate::config::GyroConfig;
use crate::error::TrackingError;
use crate::smoothing::ExpSmoother2;
use crate::types::{NormalizedInput, TrackingStatus};

/// Tilt angles in degrees. Either may be missing when the sensor drops out.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationEvent {
    /// Front/back tilt, -180..180.
    pub beta: Option<f32>,
    /// Left/right tilt, -90..90.
    pub gamma: Option<f32>,
}

impl OrientationEvent {
    pub fn new(beta: f32, gamma: f32) -> Self {
        Self {
            beta: Some(beta),
            gamma: Some(gamma),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Pending,
    Granted,
    Denied,
}

/// Push-style orientation sensor, drained once per tick.
pub trait OrientationSource {
    /// Whether the platform has an orientation sensor at all.
    fn is_supported(&self) -> bool;
    /// State of the one-time permission request. The first call issues the
    /// request; platforms without a gate answer `Granted`.
    fn request_permission(&mut self) -> Permission;
    fn subscribe(&mut self) -> Result<(), TrackingError>;
    /// Oldest queued event, if any.
    fn next_event(&mut self) -> Option<OrientationEvent>;
    fn unsubscribe(&mut self);
}

/// Reference angles treated as the neutral pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltReference {
    pub beta: f32,
    pub gamma: f32,
}

/// Maps calibrated tilt onto [-1, 1]: gamma to x, beta to y.
pub fn map_tilt(beta: f32, gamma: f32, reference: TiltReference, tilt_range: f32) -> Vec2 {
    let calibrated_beta = beta - reference.beta;
    let calibrated_gamma = gamma - reference.gamma;
    Vec2::new(
        (calibrated_gamma / tilt_range).clamp(-1.0, 1.0),
        (calibrated_beta / tilt_range).clamp(-1.0, 1.0),
    )
}

/// Converts a device rotation into (beta, gamma) in degrees, using the
/// intrinsic Z-X'-Y'' convention of the web DeviceOrientation API.
pub fn tilt_from_rotation(rotation: Quat) -> (f32, f32) {
    let (_alpha, beta, gamma) = rotation.to_euler(EulerRot::ZXY);
    (beta.to_degrees(), gamma.to_degrees())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitingPermission,
    Listening,
    Halted,
    Stopped,
}

pub struct GyroTracker {
    source: Box<dyn OrientationSource>,
    config: GyroConfig,
    phase: Phase,
    status: TrackingStatus,
    reference: TiltReference,
    needs_calibration: bool,
    smoother: ExpSmoother2,
    raw: Vec2,
    position: NormalizedInput,
    subscribed: bool,
}

impl GyroTracker {
    pub fn new(source: Box<dyn OrientationSource>) -> Self {
        Self::with_config(source, GyroConfig::default())
    }

    pub fn with_config(source: Box<dyn OrientationSource>, config: GyroConfig) -> Self {
        Self {
            source,
            phase: Phase::Idle,
            status: TrackingStatus::Disconnected,
            reference: TiltReference {
                beta: config.default_beta,
                gamma: config.default_gamma,
            },
            needs_calibration: true,
            smoother: ExpSmoother2::new(config.smoothing),
            raw: Vec2::ZERO,
            position: NormalizedInput::ZERO,
            subscribed: false,
            config,
        }
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn position(&self) -> NormalizedInput {
        self.position
    }

    /// Last mapped reading before smoothing.
    pub fn raw(&self) -> Vec2 {
        self.raw
    }

    pub fn reference(&self) -> TiltReference {
        self.reference
    }

    /// The next valid reading becomes the new neutral pose.
    pub fn rearm_calibration(&mut self) {
        self.needs_calibration = true;
        info!("GyroTracker: calibration reset - next reading will be new center");
    }

    pub fn produce(&mut self) -> (NormalizedInput, TrackingStatus) {
        if self.phase == Phase::Idle {
            self.status = TrackingStatus::Initializing;
            self.phase = Phase::AwaitingPermission;
        }
        if self.phase == Phase::AwaitingPermission {
            self.start();
        }
        if self.phase == Phase::Listening {
            while let Some(event) = self.source.next_event() {
                self.handle_event(event);
            }
        }
        (self.position, self.status)
    }

    fn start(&mut self) {
        match self.source.request_permission() {
            Permission::Pending => return,
            Permission::Denied => {
                warn!("GyroTracker: permission denied");
                self.halt(TrackingError::PermissionDenied.status());
                return;
            }
            Permission::Granted => info!("GyroTracker: permission granted"),
        }

        if !self.source.is_supported() {
            warn!("GyroTracker: device orientation not supported");
            self.halt(TrackingError::DeviceUnsupported.status());
            return;
        }

        if let Err(e) = self.source.subscribe() {
            error!("GyroTracker: failed to subscribe: {}", e);
            self.halt(TrackingStatus::Error);
            return;
        }
        self.subscribed = true;
        self.phase = Phase::Listening;
        self.status = TrackingStatus::Active;
        info!("GyroTracker: listening for device orientation");
    }

    fn halt(&mut self, status: TrackingStatus) {
        self.phase = Phase::Halted;
        self.status = status;
    }

    fn handle_event(&mut self, event: OrientationEvent) {
        let (Some(beta), Some(gamma)) = (event.beta, event.gamma) else {
            self.status = TrackingStatus::Unavailable;
            return;
        };

        if self.needs_calibration {
            self.reference = TiltReference { beta, gamma };
            self.needs_calibration = false;
            info!("GyroTracker: calibrated at beta={:.1} gamma={:.1}", beta, gamma);
        }
        self.status = TrackingStatus::Tracking;

        self.raw = map_tilt(beta, gamma, self.reference, self.config.tilt_range);
        self.position = self.smoother.update(self.raw).into();
    }

    /// Unsubscribes from the sensor. Idempotent.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        if self.subscribed {
            self.source.unsubscribe();
            self.subscribed = false;
        }
        self.phase = Phase::Stopped;
        self.status = TrackingStatus::Disconnected;
        info!("GyroTracker: stopped");
    }
}

impl Drop for GyroTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const EPSILON: f32 = 1e-5;

    /// Shared handle so a test can push events after the tracker owns the source.
    #[derive(Debug)]
    pub struct SensorState {
        pub supported: bool,
        pub permission: Permission,
        pub fail_subscribe: bool,
        pub queue: VecDeque<OrientationEvent>,
        pub subscribes: u32,
        pub unsubscribes: u32,
    }

    impl Default for SensorState {
        fn default() -> Self {
            Self {
                supported: true,
                permission: Permission::Granted,
                fail_subscribe: false,
                queue: VecDeque::new(),
                subscribes: 0,
                unsubscribes: 0,
            }
        }
    }

    pub struct FakeSensor(pub Rc<RefCell<SensorState>>);

    impl OrientationSource for FakeSensor {
        fn is_supported(&self) -> bool {
            self.0.borrow().supported
        }

        fn request_permission(&mut self) -> Permission {
            self.0.borrow().permission
        }

        fn subscribe(&mut self) -> Result<(), TrackingError> {
            let mut state = self.0.borrow_mut();
            state.subscribes += 1;
            if state.fail_subscribe {
                Err(TrackingError::SensorUnavailable)
            } else {
                Ok(())
            }
        }

        fn next_event(&mut self) -> Option<OrientationEvent> {
            self.0.borrow_mut().queue.pop_front()
        }

        fn unsubscribe(&mut self) {
            self.0.borrow_mut().unsubscribes += 1;
        }
    }

    fn tracker(state: SensorState) -> (Rc<RefCell<SensorState>>, GyroTracker) {
        let state = Rc::new(RefCell::new(state));
        let tracker = GyroTracker::new(Box::new(FakeSensor(state.clone())));
        (state, tracker)
    }

    fn push(state: &Rc<RefCell<SensorState>>, beta: f32, gamma: f32) {
        state
            .borrow_mut()
            .queue
            .push_back(OrientationEvent::new(beta, gamma));
    }

    #[test]
    fn map_tilt_divides_by_range_and_clamps() {
        let reference = TiltReference { beta: 45.0, gamma: 0.0 };
        let v = map_tilt(60.0, 15.0, reference, 30.0);
        assert!((v.x - 0.5).abs() < EPSILON);
        assert!((v.y - 0.5).abs() < EPSILON);

        let v = map_tilt(0.0, 90.0, reference, 30.0);
        assert_eq!(v, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn rotation_converts_to_tilt_angles() {
        let (beta, gamma) = tilt_from_rotation(Quat::IDENTITY);
        assert!(beta.abs() < 1e-3 && gamma.abs() < 1e-3);

        let (beta, gamma) = tilt_from_rotation(Quat::from_rotation_x(45f32.to_radians()));
        assert!((beta - 45.0).abs() < 1e-3);
        assert!(gamma.abs() < 1e-3);

        let (beta, gamma) = tilt_from_rotation(Quat::from_rotation_y(-20f32.to_radians()));
        assert!(beta.abs() < 1e-3);
        assert!((gamma + 20.0).abs() < 1e-3);
    }

    #[test]
    fn first_reading_becomes_center() {
        let (state, mut tracker) = tracker(SensorState::default());
        assert_eq!(tracker.produce().1, TrackingStatus::Active);

        push(&state, 45.0, 0.0);
        push(&state, 60.0, 15.0);
        let (input, status) = tracker.produce();

        assert_eq!(status, TrackingStatus::Tracking);
        assert_eq!(tracker.reference(), TiltReference { beta: 45.0, gamma: 0.0 });
        assert!((tracker.raw().x - 0.5).abs() < EPSILON);
        assert!((tracker.raw().y - 0.5).abs() < EPSILON);
        // one smoothing step from zero
        assert!((input.x - 0.075).abs() < EPSILON);
        assert!((input.y - 0.075).abs() < EPSILON);
    }

    #[test]
    fn first_reading_overrides_default_reference() {
        let (state, mut tracker) = tracker(SensorState::default());
        assert_eq!(tracker.reference(), TiltReference { beta: 45.0, gamma: 0.0 });
        tracker.produce();
        push(&state, 30.0, -10.0);
        tracker.produce();
        assert_eq!(tracker.reference(), TiltReference { beta: 30.0, gamma: -10.0 });
        assert_eq!(tracker.raw(), Vec2::ZERO);
    }

    #[test]
    fn recalibration_works_repeatedly() {
        let (state, mut tracker) = tracker(SensorState::default());
        tracker.produce();

        for (beta, gamma) in [(40.0, 5.0), (70.0, -20.0), (10.0, 30.0)] {
            tracker.rearm_calibration();
            push(&state, beta, gamma);
            push(&state, beta + 15.0, gamma);
            tracker.produce();
            assert_eq!(tracker.reference(), TiltReference { beta, gamma });
            assert!((tracker.raw().y - 0.5).abs() < EPSILON);
            assert!(tracker.raw().x.abs() < EPSILON);
        }
    }

    #[test]
    fn smoothing_converges_to_raw() {
        let (state, mut tracker) = tracker(SensorState::default());
        tracker.produce();
        push(&state, 45.0, 0.0);
        tracker.produce();

        let mut err = Vec2::new(-1.0, 1.0).length();
        for _ in 0..40 {
            push(&state, 75.0, -30.0);
            let (input, _) = tracker.produce();
            let next = (input.as_vec2() - Vec2::new(-1.0, 1.0)).length();
            assert!(next < err);
            err = next;
        }
        // 2^0.5 * 0.85^40
        assert!(err < 0.0025);
    }

    #[test]
    fn missing_angle_reports_unavailable_without_update() {
        let (state, mut tracker) = tracker(SensorState::default());
        tracker.produce();
        push(&state, 45.0, 0.0);
        push(&state, 60.0, 15.0);
        let (before, _) = tracker.produce();

        state.borrow_mut().queue.push_back(OrientationEvent {
            beta: None,
            gamma: Some(3.0),
        });
        let (after, status) = tracker.produce();
        assert_eq!(status, TrackingStatus::Unavailable);
        assert_eq!(after, before);

        push(&state, 60.0, 15.0);
        assert_eq!(tracker.produce().1, TrackingStatus::Tracking);
    }

    #[test]
    fn denied_permission_stops_processing() {
        let (state, mut tracker) = tracker(SensorState {
            permission: Permission::Denied,
            ..Default::default()
        });
        assert_eq!(tracker.produce().1, TrackingStatus::PermissionDenied);
        push(&state, 10.0, 10.0);
        let (input, status) = tracker.produce();
        assert_eq!(status, TrackingStatus::PermissionDenied);
        assert_eq!(input, NormalizedInput::ZERO);
        assert_eq!(state.borrow().subscribes, 0);
    }

    #[test]
    fn pending_permission_keeps_initializing() {
        let (state, mut tracker) = tracker(SensorState {
            permission: Permission::Pending,
            ..Default::default()
        });
        assert_eq!(tracker.produce().1, TrackingStatus::Initializing);
        assert_eq!(tracker.produce().1, TrackingStatus::Initializing);
        state.borrow_mut().permission = Permission::Granted;
        assert_eq!(tracker.produce().1, TrackingStatus::Active);
    }

    #[test]
    fn missing_sensor_is_unsupported() {
        let (_, mut tracker) = tracker(SensorState {
            supported: false,
            ..Default::default()
        });
        assert_eq!(tracker.produce().1, TrackingStatus::Unsupported);
    }

    #[test]
    fn subscribe_failure_is_error() {
        let (_, mut tracker) = tracker(SensorState {
            fail_subscribe: true,
            ..Default::default()
        });
        assert_eq!(tracker.produce().1, TrackingStatus::Error);
    }

    #[test]
    fn shutdown_unsubscribes_once() {
        let (state, mut tracker) = tracker(SensorState::default());
        tracker.produce();
        tracker.shutdown();
        tracker.shutdown();
        drop(tracker);
        assert_eq!(state.borrow().unsubscribes, 1);
    }

    #[test]
    fn shutdown_before_permission_is_safe() {
        let (state, tracker) = tracker(SensorState::default());
        drop(tracker);
        assert_eq!(state.borrow().unsubscribes, 0);
    }
}
