use crate::camera::overlay::Reticle;
use crate::camera::session::CameraSession;
use crate::errors::AppError;
use log::debug;
use opencv::core::{self as opencv_core, Scalar, Size, Vector};
use opencv::prelude::*;
use opencv::{imgcodecs, imgproc};

/// Result of a surface resync: the reticle recomputed for the current native
/// dimensions, and whether the surface actually had to be reallocated.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSync {
    pub reticle: Reticle,
    pub resized: bool,
}

/// A captured still, encoded and ready to submit.
pub struct SampledFrame {
    pub jpeg: Vec<u8>,
}

/// Produces single JPEG-encoded stills from a camera session. Keeps an
/// off-screen raster surface that is resynchronized to the live stream's
/// native resolution before every capture.
pub struct FrameSampler {
    surface: opencv_core::Mat,
    jpeg_quality: i32,
}

impl FrameSampler {
    pub fn new(jpeg_quality: u8) -> Self {
        FrameSampler {
            surface: opencv_core::Mat::default(),
            jpeg_quality: i32::from(jpeg_quality.min(100)),
        }
    }

    /// Resizes the surface only when the native dimensions changed, and
    /// recomputes the reticle from them. Idempotent for unchanged dimensions.
    pub fn sync_surface(&mut self, native_width: i32, native_height: i32) -> Result<SurfaceSync, AppError> {
        let reticle = Reticle::centered(native_width, native_height);
        if self.surface.cols() == native_width && self.surface.rows() == native_height {
            return Ok(SurfaceSync { reticle, resized: false });
        }
        debug!("🖼️ Resizing capture surface {}x{} -> {}x{}.",
            self.surface.cols(), self.surface.rows(), native_width, native_height);
        self.surface = opencv_core::Mat::new_rows_cols_with_default(
            native_height,
            native_width,
            opencv_core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        Ok(SurfaceSync { reticle, resized: true })
    }

    /// Syncs the surface, draws the current live frame into it at full
    /// surface size and encodes it as lossy JPEG. `None` when no camera is
    /// attached or no frame has been grabbed yet.
    pub fn capture(&mut self, session: &CameraSession) -> Result<Option<SampledFrame>, AppError> {
        if !session.is_on() || session.latest_frame().empty() {
            return Ok(None);
        }
        let (w, h) = session.native_dims();
        self.sync_surface(w, h)?;

        imgproc::resize(
            session.latest_frame(),
            &mut self.surface,
            Size::new(w, h),
            0.0,
            0.0,
            imgproc::INTER_LINEAR,
        )?;

        let mut buf = Vector::<u8>::new();
        let mut params = Vector::<i32>::new();
        params.push(imgcodecs::IMWRITE_JPEG_QUALITY);
        params.push(self.jpeg_quality);
        imgcodecs::imencode(".jpg", &self.surface, &mut buf, &params)?;
        debug!("📸 Encoded frame: {}x{}, {} bytes, quality {}.", w, h, buf.len(), self.jpeg_quality);

        Ok(Some(SampledFrame { jpeg: buf.to_vec() }))
    }

    #[cfg(test)]
    pub fn surface_dims(&self) -> (i32, i32) {
        (self.surface.cols(), self.surface.rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_is_idempotent_for_unchanged_dimensions() {
        let mut sampler = FrameSampler::new(90);
        let first = sampler.sync_surface(1280, 720).unwrap();
        assert!(first.resized);
        assert_eq!(sampler.surface_dims(), (1280, 720));

        let second = sampler.sync_surface(1280, 720).unwrap();
        assert!(!second.resized);
        assert_eq!(second.reticle, first.reticle);
        assert_eq!(sampler.surface_dims(), (1280, 720));
    }

    #[test]
    fn sync_follows_dimension_changes() {
        let mut sampler = FrameSampler::new(90);
        sampler.sync_surface(1280, 720).unwrap();
        let sync = sampler.sync_surface(640, 480).unwrap();
        assert!(sync.resized);
        assert_eq!(sampler.surface_dims(), (640, 480));
        assert_eq!(sync.reticle, Reticle::centered(640, 480));
    }

    #[test]
    fn capture_without_camera_yields_none() {
        let mut sampler = FrameSampler::new(90);
        let session = CameraSession::new(0, 1280, 720);
        assert!(sampler.capture(&session).unwrap().is_none());
    }
}
