use crate::camera::overlay::OverlayRenderer;
use crate::camera::sampler::FrameSampler;
use crate::camera::session::CameraSession;
use crate::config_loader::MasterConfig;
use crate::core::coordinator::CaptureCoordinator;
use crate::core::frame_source::LiveFrameSource;
use crate::core::poller::DashboardPoller;
use crate::core::view_state::ViewState;
use crate::errors::AppError;
use crate::remote::client::{RemoteVisionClient, VisionApi};
use anyhow::{Context, Result};
use clap::ArgMatches;
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything a camera-driven operation needs, wired together.
pub struct ConsoleStack {
    pub session: Arc<Mutex<CameraSession>>,
    pub sampler: Arc<Mutex<FrameSampler>>,
    pub view: Arc<Mutex<ViewState>>,
    pub poller: Arc<DashboardPoller>,
    pub coordinator: Arc<CaptureCoordinator>,
    pub renderer: OverlayRenderer,
}

pub fn build_service(master_config: &MasterConfig) -> Arc<RemoteVisionClient> {
    Arc::new(RemoteVisionClient::new(&master_config.service.base_url))
}

/// CLI `--cooldown` wins over the config value; both fall through to the
/// coordinator's own default when absent. Not every subcommand defines the
/// argument, hence the fallible lookup.
pub fn effective_cooldown_ms(master_config: &MasterConfig, args: &ArgMatches) -> u64 {
    if let Ok(Some(ms)) = args.try_get_one::<u64>("cooldown") {
        return *ms;
    }
    master_config.app_settings.cooldown_ms.unwrap_or(0)
}

pub fn preview_enabled(master_config: &MasterConfig, args: &ArgMatches) -> bool {
    let from_cli = matches!(args.try_get_one::<bool>("preview"), Ok(Some(true)));
    from_cli || master_config.app_settings.preview_window.unwrap_or(false)
}

pub fn build_console_stack(
    master_config: &MasterConfig,
    cooldown_ms: u64,
    preview: bool,
) -> ConsoleStack {
    let app = &master_config.app_settings;
    let session = Arc::new(Mutex::new(CameraSession::new(
        app.camera_index.unwrap_or(0),
        app.preferred_width.unwrap_or(1280),
        app.preferred_height.unwrap_or(720),
    )));
    let sampler = Arc::new(Mutex::new(FrameSampler::new(app.jpeg_quality.unwrap_or(90))));
    let frames = Arc::new(LiveFrameSource::new(Arc::clone(&session), Arc::clone(&sampler)));

    let service: Arc<dyn VisionApi> = build_service(master_config);
    let view = Arc::new(Mutex::new(ViewState::new()));
    let poller = Arc::new(DashboardPoller::new(Arc::clone(&service), Arc::clone(&view)));
    let coordinator = Arc::new(CaptureCoordinator::new(
        frames,
        service,
        Arc::clone(&poller),
        Arc::clone(&view),
        cooldown_ms,
        app.ignore_person.unwrap_or(true),
    ));

    debug!("Console stack assembled (cooldown {} ms, preview {}).", cooldown_ms, preview);
    ConsoleStack {
        session,
        sampler,
        view,
        poller,
        coordinator,
        renderer: OverlayRenderer::new(preview),
    }
}

pub async fn start_camera(stack: &ConsoleStack) -> Result<()> {
    stack
        .session
        .lock()
        .await
        .start()
        .context("Could not bring the camera up")
}

/// One render pass: pull the next live frame and composite the overlay from
/// the current view state. A no-op while the camera is off.
pub async fn render_once(stack: &ConsoleStack) -> Result<(), AppError> {
    let mut session = stack.session.lock().await;
    if !session.is_on() {
        return Ok(());
    }
    session.grab()?;
    let (w, h) = session.native_dims();
    let sync = stack.sampler.lock().await.sync_surface(w, h)?;
    if sync.resized {
        debug!("🖼️ Render surface resynchronized to {}x{}.", w, h);
    }
    let view = stack.view.lock().await;
    let canvas = stack.renderer.render(
        session.latest_frame(),
        Some(&sync.reticle),
        view.detection_box.as_ref(),
        view.annotation.as_ref(),
    )?;
    stack.renderer.present(&canvas)
}
