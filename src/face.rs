//! Webcam face tracking
//!
//! Turns face-mesh landmarks into a head position in [-1, 1] plus a
//! proximity scale from the inter-ocular distance. The landmark model
//! and the camera are collaborators behind [`LandmarkDetector`] and
//! [`VideoSource`]; this module only decides when to run detection and
//! what to do with the result.

use glam::Vec2;
use log::{debug, error, info, warn};

use crate::config::FaceConfig;
use crate::error::TrackingError;
use crate::types::{NormalizedInput, TrackingStatus};

/// One captured camera frame.
#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    /// Presentation time in seconds; a new value means a new frame.
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Outcome of a non-blocking acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Still waiting on the user or the device; ask again next poll.
    Pending,
    Ready,
}

/// Camera capture device.
pub trait VideoSource {
    /// Starts capture. May be called repeatedly while it returns `Pending`.
    fn open(&mut self) -> Result<Readiness, TrackingError>;
    /// Most recent frame, or `None` while no frame is ready yet.
    fn latest_frame(&mut self) -> Option<&VideoFrame>;
    /// Stops capture and gives the device back. Only called after `open`
    /// returned `Ready`.
    fn release(&mut self);
}

/// Face landmark model.
pub trait LandmarkDetector {
    fn init(&mut self) -> Result<(), TrackingError>;
    /// `Ok(None)` when no face is present in the frame.
    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<FaceLandmarks>, TrackingError>;
    fn close(&mut self);
}

/// Landmark positions of one face in image space, [0, 1] on both axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Vec2>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    pub fn get(&self, index: usize) -> Option<Vec2> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Maps an image-space coordinate to [-1, 1], mirrored so that moving the
/// head right moves the view left.
#[inline]
pub fn mirror_normalize(coord: f32) -> f32 {
    -(coord - 0.5) * 2.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Initializing,
    Running,
    Failed,
    Stopped,
}

pub struct FaceTracker {
    camera: Box<dyn VideoSource>,
    detector: Box<dyn LandmarkDetector>,
    config: FaceConfig,
    phase: Phase,
    status: TrackingStatus,
    position: NormalizedInput,
    scale: f32,
    baseline_eye_distance: Option<f32>,
    last_timestamp: Option<f64>,
    frame_count: u64,
    camera_open: bool,
    detector_ready: bool,
}

impl FaceTracker {
    pub fn new(camera: Box<dyn VideoSource>, detector: Box<dyn LandmarkDetector>) -> Self {
        Self::with_config(camera, detector, FaceConfig::default())
    }

    pub fn with_config(
        camera: Box<dyn VideoSource>,
        detector: Box<dyn LandmarkDetector>,
        config: FaceConfig,
    ) -> Self {
        Self {
            camera,
            detector,
            config,
            phase: Phase::Idle,
            status: TrackingStatus::Disconnected,
            position: NormalizedInput::ZERO,
            scale: 1.0,
            baseline_eye_distance: None,
            last_timestamp: None,
            frame_count: 0,
            camera_open: false,
            detector_ready: false,
        }
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn position(&self) -> NormalizedInput {
        self.position
    }

    /// Proximity relative to the first detection; larger when closer.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Advances the session one step and reports the latest values.
    /// Positions are held when nothing new was detected.
    pub fn produce(&mut self) -> (NormalizedInput, TrackingStatus) {
        match self.phase {
            Phase::Idle => self.start(),
            Phase::Initializing => self.try_open_camera(),
            Phase::Running => self.poll(),
            Phase::Failed | Phase::Stopped => {}
        }
        (self.position, self.status)
    }

    fn start(&mut self) {
        info!("FaceTracker: initializing landmark detector");
        self.phase = Phase::Initializing;
        self.status = TrackingStatus::Initializing;

        if let Err(e) = self.detector.init() {
            self.fail(e);
            return;
        }
        self.detector_ready = true;
        self.try_open_camera();
    }

    fn try_open_camera(&mut self) {
        match self.camera.open() {
            Ok(Readiness::Ready) => {
                self.camera_open = true;
                self.phase = Phase::Running;
                self.status = TrackingStatus::Active;
                info!("FaceTracker: camera open, starting detection loop");
            }
            Ok(Readiness::Pending) => {}
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, e: TrackingError) {
        error!("FaceTracker: stopping: {}", e);
        self.release_resources();
        self.phase = Phase::Failed;
        self.status = TrackingStatus::Error;
    }

    /// Runs detection once per new video frame. Safe to call from a loop
    /// driven by frame availability rather than by the render loop.
    pub fn poll(&mut self) {
        if self.phase != Phase::Running {
            return;
        }

        let Some(frame) = self.camera.latest_frame() else {
            return;
        };
        if self.last_timestamp == Some(frame.timestamp) {
            return;
        }
        self.last_timestamp = Some(frame.timestamp);
        self.frame_count += 1;

        match self.detector.detect(frame) {
            Ok(Some(landmarks)) => self.apply_landmarks(&landmarks),
            Ok(None) => {
                if self.frame_count % 120 == 0 {
                    debug!("FaceTracker: no face detected in frame");
                }
            }
            Err(e) if e.is_terminal() => self.fail(e),
            Err(e) => warn!("FaceTracker: detection error: {}", e),
        }
    }

    fn apply_landmarks(&mut self, landmarks: &FaceLandmarks) {
        let (Some(nose), Some(left_eye), Some(right_eye)) = (
            landmarks.get(self.config.nose_tip),
            landmarks.get(self.config.left_eye_outer),
            landmarks.get(self.config.right_eye_outer),
        ) else {
            warn!(
                "FaceTracker: incomplete landmark set ({} points), skipping frame",
                landmarks.len()
            );
            return;
        };

        self.status = TrackingStatus::Tracking;
        self.position = NormalizedInput::new(mirror_normalize(nose.x), mirror_normalize(nose.y));

        if self.frame_count % 60 == 0 {
            debug!(
                "FaceTracker: position x={:.3} y={:.3}",
                self.position.x, self.position.y
            );
        }

        let eye_distance = left_eye.distance(right_eye);
        let baseline = match self.baseline_eye_distance {
            Some(b) => b,
            None if eye_distance > f32::EPSILON => {
                info!("FaceTracker: baseline eye distance set: {:.4}", eye_distance);
                self.baseline_eye_distance = Some(eye_distance);
                eye_distance
            }
            None => return,
        };
        self.scale = proximity_scale(eye_distance, baseline, &self.config);
    }

    /// Stops the loop and releases the camera and detector. Idempotent, and
    /// safe before initialization finished.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::Stopped {
            return;
        }
        self.release_resources();
        self.phase = Phase::Stopped;
        self.status = TrackingStatus::Disconnected;
        info!("FaceTracker: stopped");
    }

    fn release_resources(&mut self) {
        if self.camera_open {
            self.camera.release();
            self.camera_open = false;
        }
        if self.detector_ready {
            self.detector.close();
            self.detector_ready = false;
        }
    }
}

impl Drop for FaceTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// `current / baseline`, clamped to the configured range.
pub fn proximity_scale(current: f32, baseline: f32, config: &FaceConfig) -> f32 {
    (current / baseline).clamp(config.min_scale, config.max_scale)
}
