use crate::camera::sampler::{FrameSampler, SampledFrame};
use crate::camera::session::CameraSession;
use crate::errors::AppError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where the capture pipeline gets its stills. The live implementation wraps
/// the camera session and sampler; tests substitute a scripted source.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// `Ok(None)` means there is nothing to sample (camera off), which the
    /// coordinator treats as a policy rejection, not a transport failure.
    async fn sample(&self) -> Result<Option<SampledFrame>, AppError>;
}

pub struct LiveFrameSource {
    session: Arc<Mutex<CameraSession>>,
    sampler: Arc<Mutex<FrameSampler>>,
}

impl LiveFrameSource {
    pub fn new(session: Arc<Mutex<CameraSession>>, sampler: Arc<Mutex<FrameSampler>>) -> Self {
        LiveFrameSource { session, sampler }
    }
}

#[async_trait]
impl FrameSource for LiveFrameSource {
    async fn sample(&self) -> Result<Option<SampledFrame>, AppError> {
        let session = self.session.lock().await;
        let mut sampler = self.sampler.lock().await;
        sampler.capture(&session)
    }
}
