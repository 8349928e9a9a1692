//! Parallax Core - head-tracked "magic window" camera
//!
//! Turns face-landmark or device-tilt input into a smoothed eye position and
//! an off-axis projection, so a 3D scene looks like it sits behind a fixed
//! window on the display. Rendering, asset loading and UI live elsewhere;
//! this crate hands them a `CameraFrame` and a pixel-ratio hint each frame.

use log::info;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::WindowEvent;

pub mod config;
pub mod error;
pub mod face;
pub mod gyro;
pub mod input;
pub mod projection;
#[cfg(target_os = "android")]
pub mod sensors;
pub mod smoothing;
pub mod types;

pub use config::{
    DepthRange, FaceConfig, GyroConfig, ProjectionConfig, ResolutionConfig, ScreenConfig,
    ScreenConfigUpdate, CM_TO_SCENE,
};
pub use error::{ConfigError, TrackingError};
pub use input::{DeviceCapabilities, PointerInput, Tracker};
pub use projection::{
    CameraFrame, CameraSink, CameraUniforms, EyeState, Frustum, OffAxisProjector,
    ResolutionGovernor, ResolutionSink,
};
#[cfg(target_os = "android")]
pub use sensors::NdkOrientationSource;
pub use types::{CalibrationOffset, InputMode, NormalizedInput, TrackingContext, TrackingStatus};

/// Installs the platform logger. Later calls are no-ops.
pub fn init_logging() {
    #[cfg(target_os = "android")]
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("ParallaxCore"),
    );

    #[cfg(not(target_os = "android"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        // Err only means a logger is already installed
        let _ = env_logger::Builder::from_env(env).try_init();
    }
}

/// Render-loop driver: owns the session's context, tracker and projector
/// and runs them once per frame.
pub struct MagicWindow {
    context: TrackingContext,
    tracker: Tracker,
    projector: OffAxisProjector,
    pointer: PointerInput,
    governor: ResolutionGovernor,
    screen: ScreenConfig,
    last_generation: u64,
    touch_seen: bool,
    running: bool,
}

impl MagicWindow {
    pub fn new(config: ProjectionConfig, tracker: Tracker) -> Result<Self, ConfigError> {
        let projector = OffAxisProjector::new(config)?;
        let context = TrackingContext::new(tracker.mode());
        info!("MagicWindow: session started in {:?} mode", tracker.mode());
        Ok(Self {
            last_generation: context.calibration_generation(),
            context,
            tracker,
            projector,
            pointer: PointerInput::new(PhysicalSize::new(0, 0)),
            governor: ResolutionGovernor::new(ResolutionConfig::default()),
            screen: ScreenConfig::default(),
            touch_seen: false,
            running: true,
        })
    }

    pub fn with_resolution(mut self, config: ResolutionConfig) -> Self {
        self.governor = ResolutionGovernor::new(config);
        self
    }

    pub fn context(&self) -> &TrackingContext {
        &self.context
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn projector(&self) -> &OffAxisProjector {
        &self.projector
    }

    pub fn pointer(&self) -> &PointerInput {
        &self.pointer
    }

    pub fn screen(&self) -> &ScreenConfig {
        &self.screen
    }

    /// Applies a partial physical-screen update; rejected updates change nothing.
    pub fn update_screen(&mut self, update: ScreenConfigUpdate) -> Result<(), ConfigError> {
        self.screen.merge(update)?;
        info!(
            "MagicWindow: screen {:.2} x {:.2} cm at {:.1} cm",
            self.screen.width, self.screen.height, self.screen.distance
        );
        Ok(())
    }

    /// Scene-space size of the screen-fixed window frame.
    pub fn window_extent(&self) -> (f32, f32) {
        self.screen.window_extent(CM_TO_SCENE)
    }

    /// Whether any touch input has been seen on this window.
    pub fn touch_seen(&self) -> bool {
        self.touch_seen
    }

    pub fn calibrate(&mut self) {
        self.context.calibrate();
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.pointer.resize(size);
    }

    pub fn set_cursor(&mut self, position: PhysicalPosition<f64>) {
        self.pointer.set_cursor(position);
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        if self.pointer.handle_window_event(event) && !self.touch_seen {
            info!("MagicWindow: touch input detected");
            self.touch_seen = true;
        }
    }

    /// One rendered frame. `dt` is the time since the previous call in seconds.
    pub fn tick(
        &mut self,
        dt: f32,
        camera: &mut dyn CameraSink,
        resolution: &mut dyn ResolutionSink,
    ) -> CameraFrame {
        if self.running {
            let generation = self.context.calibration_generation();
            if generation != self.last_generation {
                self.last_generation = generation;
                self.tracker.rearm_calibration();
            }

            let (input, status) = self.tracker.produce();
            self.context.publish(input, status);
            if let Some(scale) = self.tracker.face_scale() {
                self.context.publish_scale(scale);
            }
        }
        self.context.advance(dt);

        let frame = self.projector.frame(
            self.context.input(),
            self.context.calibration(),
            self.pointer.position(),
        );
        camera.apply_camera(&frame);

        let ratio = self.governor.update(frame.input, dt);
        resolution.set_pixel_ratio(ratio);

        frame
    }

    /// Ends the tracking session. Idempotent; the projector keeps running
    /// on pointer input afterwards.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.tracker.shutdown();
        self.context.reset();
        self.running = false;
        info!("MagicWindow: session ended");
    }
}

impl Drop for MagicWindow {
    fn drop(&mut self) {
        self.shutdown();
    }
}
