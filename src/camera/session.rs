use crate::errors::AppError;
use log::{debug, info, warn};
use opencv::core as opencv_core;
use opencv::prelude::*;
use opencv::videoio;
use std::time::Instant;

pub const FALLBACK_WIDTH: i32 = 1280;
pub const FALLBACK_HEIGHT: i32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Off,
    Starting,
    On,
}

/// Owns the capture device handle. The renderer and the sampler both work
/// from `latest_frame`, so one device read per render tick feeds everything.
pub struct CameraSession {
    state: SessionState,
    capture: Option<videoio::VideoCapture>,
    latest: opencv_core::Mat,
    native_width: i32,
    native_height: i32,
    camera_index: i32,
    preferred_width: i32,
    preferred_height: i32,
}

impl CameraSession {
    pub fn new(camera_index: i32, preferred_width: i32, preferred_height: i32) -> Self {
        CameraSession {
            state: SessionState::Off,
            capture: None,
            latest: opencv_core::Mat::default(),
            native_width: 0,
            native_height: 0,
            camera_index,
            preferred_width,
            preferred_height,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == SessionState::On
    }

    /// Native dimensions of the live stream, falling back to 1280x720 until
    /// the device has reported them.
    pub fn native_dims(&self) -> (i32, i32) {
        if self.native_width > 0 && self.native_height > 0 {
            (self.native_width, self.native_height)
        } else {
            (FALLBACK_WIDTH, FALLBACK_HEIGHT)
        }
    }

    pub fn latest_frame(&self) -> &opencv_core::Mat {
        &self.latest
    }

    /// Opens the device, requesting (not mandating) the preferred resolution,
    /// then blocks until the first decoded frame arrives. That first frame is
    /// the "metadata ready" signal: the native dimensions recorded here are
    /// what the device actually delivers. A failed start leaves the session
    /// Off; there is no retry.
    pub fn start(&mut self) -> Result<(), AppError> {
        if self.is_on() {
            debug!("Camera session already on, ignoring start.");
            return Ok(());
        }
        let start_time = Instant::now();
        info!("📷 Opening camera device {}...", self.camera_index);
        self.state = SessionState::Starting;

        let mut cap = videoio::VideoCapture::new(self.camera_index, videoio::CAP_ANY)
            .map_err(|e| self.fail_start(format!("OpenCV refused to create capture: {}", e)))?;
        let opened = videoio::VideoCapture::is_opened(&cap)
            .map_err(|e| self.fail_start(format!("OpenCV open check failed: {}", e)))?;
        if !opened {
            return Err(self.fail_start(format!(
                "Could not open camera device {} (no device or permission denied).",
                self.camera_index
            )));
        }

        // Preference only; devices that cannot honor it keep their own mode.
        if cap.set(videoio::CAP_PROP_FRAME_WIDTH, self.preferred_width as f64).is_err()
            || cap.set(videoio::CAP_PROP_FRAME_HEIGHT, self.preferred_height as f64).is_err()
        {
            warn!("⚠️ Camera {} rejected the preferred {}x{} resolution hint.",
                self.camera_index, self.preferred_width, self.preferred_height);
        }

        let mut first = opencv_core::Mat::default();
        let got_frame = cap
            .read(&mut first)
            .map_err(|e| self.fail_start(format!("First frame read failed: {}", e)))?;
        if !got_frame || first.empty() {
            return Err(self.fail_start(format!(
                "Camera device {} opened but delivered no frame.",
                self.camera_index
            )));
        }

        self.native_width = first.cols();
        self.native_height = first.rows();
        self.latest = first;
        self.capture = Some(cap);
        self.state = SessionState::On;
        info!("✅ Camera on: device {} at native {}x{} in {:?}.",
            self.camera_index, self.native_width, self.native_height, start_time.elapsed());
        Ok(())
    }

    fn fail_start(&mut self, msg: String) -> AppError {
        self.state = SessionState::Off;
        self.capture = None;
        AppError::Device(msg)
    }

    /// Reads the next frame into the shared live surface. Updates the native
    /// dimensions when the device changes resolution mid-stream.
    pub fn grab(&mut self) -> Result<bool, AppError> {
        let Some(cap) = self.capture.as_mut() else {
            return Ok(false);
        };
        let got_frame = cap.read(&mut self.latest)?;
        if !got_frame || self.latest.empty() {
            return Ok(false);
        }
        let (w, h) = (self.latest.cols(), self.latest.rows());
        if w != self.native_width || h != self.native_height {
            info!("📐 Camera native resolution changed: {}x{} -> {}x{}.",
                self.native_width, self.native_height, w, h);
            self.native_width = w;
            self.native_height = h;
        }
        Ok(true)
    }

    /// Releases the device. Continuous modes must never survive a stop; the
    /// coordinator forces itself Idle before calling this.
    pub fn stop(&mut self) {
        if let Some(mut cap) = self.capture.take() {
            if let Err(e) = cap.release() {
                warn!("⚠️ Failed to release camera device {}: {}", self.camera_index, e);
            }
        }
        self.latest = opencv_core::Mat::default();
        self.state = SessionState::Off;
        info!("📷 Camera off.");
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.capture.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_fall_back_until_known() {
        let session = CameraSession::new(0, 1280, 720);
        assert_eq!(session.native_dims(), (1280, 720));
        assert_eq!(session.state(), SessionState::Off);
    }

    #[test]
    fn grab_and_stop_are_safe_while_off() {
        let mut session = CameraSession::new(0, 1280, 720);
        assert!(!session.grab().unwrap());
        session.stop();
        assert_eq!(session.state(), SessionState::Off);
    }
}
