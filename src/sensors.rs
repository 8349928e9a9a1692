//! Android orientation sensor via NDK
//!
//! Uses ndk-sys FFI bindings to read the Game Rotation Vector sensor (no
//! magnetic interference) and reports it as device-orientation tilt angles.
//! Falls back to integrating the raw gyroscope when the fused sensor is
//! missing.

use std::collections::VecDeque;
use std::ptr;

use glam::Quat;
use log::info;

use crate::error::TrackingError;
use crate::gyro::{tilt_from_rotation, OrientationEvent, OrientationSource, Permission};

// Sensor type constants
const ASENSOR_TYPE_GAME_ROTATION_VECTOR: i32 = 15;
const ASENSOR_TYPE_GYROSCOPE: i32 = 4;

/// ~60Hz
const EVENT_RATE_US: i32 = 16_000;

/// Orientation source backed by the NDK sensor queue.
pub struct NdkOrientationSource {
    sensor_manager: *mut ndk_sys::ASensorManager,
    sensor: *const ndk_sys::ASensor,
    sensor_type: i32,
    event_queue: *mut ndk_sys::ASensorEventQueue,
    looper: *mut ndk_sys::ALooper,

    // Accumulated rotation when integrating the raw gyroscope
    pitch: f32,
    roll: f32,
    last_timestamp_ns: Option<i64>,

    pending: VecDeque<OrientationEvent>,
}

impl NdkOrientationSource {
    pub fn new() -> Self {
        let mut source = Self {
            sensor_manager: ptr::null_mut(),
            sensor: ptr::null(),
            sensor_type: 0,
            event_queue: ptr::null_mut(),
            looper: ptr::null_mut(),
            pitch: 0.0,
            roll: 0.0,
            last_timestamp_ns: None,
            pending: VecDeque::new(),
        };
        source.find_sensor();
        source
    }

    fn find_sensor(&mut self) {
        unsafe {
            let package = b"com.parallax.core\0";
            self.sensor_manager =
                ndk_sys::ASensorManager_getInstanceForPackage(package.as_ptr().cast());

            if self.sensor_manager.is_null() {
                info!("Failed to get ASensorManager, trying fallback");
                self.sensor_manager = ndk_sys::ASensorManager_getInstance();
            }

            if self.sensor_manager.is_null() {
                info!("ASensorManager not available");
                return;
            }

            // Try Game Rotation Vector first
            self.sensor = ndk_sys::ASensorManager_getDefaultSensor(
                self.sensor_manager,
                ASENSOR_TYPE_GAME_ROTATION_VECTOR,
            );
            self.sensor_type = ASENSOR_TYPE_GAME_ROTATION_VECTOR;

            if self.sensor.is_null() {
                info!("Game Rotation Vector not available, trying gyroscope");
                self.sensor = ndk_sys::ASensorManager_getDefaultSensor(
                    self.sensor_manager,
                    ASENSOR_TYPE_GYROSCOPE,
                );
                self.sensor_type = ASENSOR_TYPE_GYROSCOPE;
            }

            if self.sensor.is_null() {
                info!("No rotation sensors available");
            }
        }
    }

    /// Poll sensor events into the pending queue
    fn pump(&mut self) {
        if self.event_queue.is_null() {
            return;
        }

        unsafe {
            let mut event: ndk_sys::ASensorEvent = std::mem::zeroed();

            while ndk_sys::ASensorEventQueue_getEvents(self.event_queue, &mut event, 1) > 0 {
                let data = event.__bindgen_anon_1.__bindgen_anon_1.data;
                match event.type_ {
                    ASENSOR_TYPE_GAME_ROTATION_VECTOR => {
                        // data = x, y, z of a unit quaternion; w is implied
                        let (x, y, z) = (data[0], data[1], data[2]);
                        let w = (1.0 - x * x - y * y - z * z).max(0.0).sqrt();
                        let (beta, gamma) =
                            tilt_from_rotation(Quat::from_xyzw(x, y, z, w).normalize());
                        self.pending.push_back(OrientationEvent::new(beta, gamma));
                    }
                    ASENSOR_TYPE_GYROSCOPE => {
                        // Rate of rotation in rad/s around the device axes
                        let dt = match self.last_timestamp_ns {
                            Some(last) => (event.timestamp - last) as f32 * 1e-9,
                            None => 0.0,
                        };
                        self.last_timestamp_ns = Some(event.timestamp);
                        self.pitch += data[0] * dt;
                        self.roll += data[1] * dt;
                        self.pending.push_back(OrientationEvent::new(
                            self.pitch.to_degrees(),
                            self.roll.to_degrees(),
                        ));
                    }
                    _ => {}
                }
            }
        }
    }
}

impl Default for NdkOrientationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl OrientationSource for NdkOrientationSource {
    fn is_supported(&self) -> bool {
        !self.sensor.is_null()
    }

    // No runtime permission gate for motion sensors on Android
    fn request_permission(&mut self) -> Permission {
        Permission::Granted
    }

    fn subscribe(&mut self) -> Result<(), TrackingError> {
        if self.sensor.is_null() {
            return Err(TrackingError::DeviceUnsupported);
        }

        unsafe {
            self.looper = ndk_sys::ALooper_forThread();
            if self.looper.is_null() {
                self.looper = ndk_sys::ALooper_prepare(0);
            }
            if self.looper.is_null() {
                info!("Failed to get ALooper");
                return Err(TrackingError::SensorUnavailable);
            }

            self.event_queue = ndk_sys::ASensorManager_createEventQueue(
                self.sensor_manager,
                self.looper,
                0,    // ident
                None, // no callback, polled
                ptr::null_mut(),
            );
            if self.event_queue.is_null() {
                info!("Failed to create sensor event queue");
                return Err(TrackingError::SensorUnavailable);
            }

            let result = ndk_sys::ASensorEventQueue_enableSensor(self.event_queue, self.sensor);
            if result < 0 {
                info!("Failed to enable sensor: {}", result);
                self.unsubscribe();
                return Err(TrackingError::SensorUnavailable);
            }

            ndk_sys::ASensorEventQueue_setEventRate(self.event_queue, self.sensor, EVENT_RATE_US);
        }

        self.pitch = 0.0;
        self.roll = 0.0;
        self.last_timestamp_ns = None;
        info!("Orientation sensor enabled (type {})", self.sensor_type);
        Ok(())
    }

    fn next_event(&mut self) -> Option<OrientationEvent> {
        if self.pending.is_empty() {
            self.pump();
        }
        self.pending.pop_front()
    }

    fn unsubscribe(&mut self) {
        unsafe {
            if !self.event_queue.is_null() && !self.sensor_manager.is_null() {
                ndk_sys::ASensorEventQueue_disableSensor(self.event_queue, self.sensor);
                ndk_sys::ASensorManager_destroyEventQueue(self.sensor_manager, self.event_queue);
            }
        }
        self.event_queue = ptr::null_mut();
        self.pending.clear();
    }
}

impl Drop for NdkOrientationSource {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
