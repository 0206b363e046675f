//! `esp32-camera` driver for the AI-Thinker ESP32-CAM board.

use std::ptr::NonNull;

use camstream_core::{CameraConfig, CameraDriver, CameraError, Resolution};
use esp_idf_svc::sys::{self, camera, esp};
use log::info;

// AI-Thinker ESP32-CAM pin map.
const PIN_PWDN: i32 = 32;
const PIN_RESET: i32 = -1;
const PIN_XCLK: i32 = 0;
const PIN_SIOD: i32 = 26;
const PIN_SIOC: i32 = 27;
const PIN_Y9: i32 = 35;
const PIN_Y8: i32 = 34;
const PIN_Y7: i32 = 39;
const PIN_Y6: i32 = 36;
const PIN_Y5: i32 = 21;
const PIN_Y4: i32 = 19;
const PIN_Y3: i32 = 18;
const PIN_Y2: i32 = 5;
const PIN_VSYNC: i32 = 25;
const PIN_HREF: i32 = 23;
const PIN_PCLK: i32 = 22;

const XCLK_FREQ_HZ: i32 = 20_000_000;

fn framesize(resolution: Resolution) -> camera::framesize_t {
    match resolution {
        Resolution::Low => camera::framesize_t_FRAMESIZE_QVGA,
        Resolution::Mid => camera::framesize_t_FRAMESIZE_VGA,
        Resolution::High => camera::framesize_t_FRAMESIZE_SVGA,
    }
}

/// Frame buffer borrowed from the driver.
///
/// Dropping it hands the buffer back with `esp_camera_fb_return`.
pub struct EspFrame {
    fb: NonNull<camera::camera_fb_t>,
}

impl AsRef<[u8]> for EspFrame {
    fn as_ref(&self) -> &[u8] {
        // SAFETY: the driver keeps `buf`/`len` valid until the buffer is returned.
        unsafe {
            let fb = self.fb.as_ref();
            std::slice::from_raw_parts(fb.buf, fb.len)
        }
    }
}

impl Drop for EspFrame {
    fn drop(&mut self) {
        // SAFETY: `fb` came from `esp_camera_fb_get` and is returned exactly once.
        unsafe { camera::esp_camera_fb_return(self.fb.as_ptr()) }
    }
}

/// The on-board OV2640 in JPEG mode.
pub struct EspCamera {
    resolution: Resolution,
}

impl EspCamera {
    /// Initialise the sensor. Failure is fatal for the firmware.
    pub fn begin(config: &CameraConfig) -> Result<Self, CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::Init(e.to_string()))?;

        let camera_config = camera::camera_config_t {
            pin_pwdn: PIN_PWDN,
            pin_reset: PIN_RESET,
            pin_xclk: PIN_XCLK,
            __bindgen_anon_1: camera::camera_config_t__bindgen_ty_1 {
                pin_sccb_sda: PIN_SIOD,
            },
            __bindgen_anon_2: camera::camera_config_t__bindgen_ty_2 {
                pin_sccb_scl: PIN_SIOC,
            },
            pin_d7: PIN_Y9,
            pin_d6: PIN_Y8,
            pin_d5: PIN_Y7,
            pin_d4: PIN_Y6,
            pin_d3: PIN_Y5,
            pin_d2: PIN_Y4,
            pin_d1: PIN_Y3,
            pin_d0: PIN_Y2,
            pin_vsync: PIN_VSYNC,
            pin_href: PIN_HREF,
            pin_pclk: PIN_PCLK,
            xclk_freq_hz: XCLK_FREQ_HZ,
            ledc_timer: sys::ledc_timer_t_LEDC_TIMER_0,
            ledc_channel: sys::ledc_channel_t_LEDC_CHANNEL_0,
            pixel_format: camera::pixformat_t_PIXFORMAT_JPEG,
            frame_size: framesize(config.initial_resolution),
            jpeg_quality: i32::from(config.jpeg_quality),
            fb_count: usize::from(config.frame_buffers),
            fb_location: camera::camera_fb_location_t_CAMERA_FB_IN_PSRAM,
            grab_mode: camera::camera_grab_mode_t_CAMERA_GRAB_LATEST,
            ..Default::default()
        };

        // SAFETY: the config is fully initialised and outlives the call.
        esp!(unsafe { camera::esp_camera_init(&camera_config) })
            .map_err(|e| CameraError::Init(e.to_string()))?;

        info!(
            "Camera ready at {} (quality {}, {} buffers)",
            config.initial_resolution, config.jpeg_quality, config.frame_buffers
        );
        Ok(Self {
            resolution: config.initial_resolution,
        })
    }
}

impl CameraDriver for EspCamera {
    type Frame = EspFrame;

    fn change_resolution(&mut self, resolution: Resolution) -> Result<(), CameraError> {
        let rejected = |reason: &str| CameraError::ResolutionChange {
            resolution,
            reason: reason.to_string(),
        };

        // SAFETY: the sensor handle is owned by the driver and valid after init.
        let sensor = unsafe { camera::esp_camera_sensor_get() };
        if sensor.is_null() {
            return Err(rejected("sensor handle unavailable"));
        }
        let set_framesize = unsafe { (*sensor).set_framesize }
            .ok_or_else(|| rejected("sensor has no set_framesize"))?;

        // SAFETY: `sensor` is non-null and `set_framesize` belongs to it.
        let status = unsafe { set_framesize(sensor, framesize(resolution)) };
        if status != 0 {
            return Err(rejected(&format!("set_framesize returned {status}")));
        }

        self.resolution = resolution;
        Ok(())
    }

    fn capture(&mut self) -> Result<EspFrame, CameraError> {
        // SAFETY: plain driver call; a null result means no frame.
        let fb = unsafe { camera::esp_camera_fb_get() };
        NonNull::new(fb)
            .map(|fb| EspFrame { fb })
            .ok_or_else(|| CameraError::CaptureFailed("esp_camera_fb_get returned null".into()))
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }
}
