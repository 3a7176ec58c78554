use crate::config_loader::MasterConfig;
use crate::core::view_state::StatusKind;
use crate::errors::AppError;
use crate::operations::op_helper;
use anyhow::{anyhow, Result};
use clap::ArgMatches;
use log::{debug, info};
use std::time::{Duration, Instant};

/// Which single-shot capture the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    Recognize,
    Register,
    LearnOnce,
}

/// How long the annotated result stays on screen in preview mode.
const PREVIEW_HOLD_MS: u64 = 2500;

pub async fn handle_frame_cli(
    master_config: &MasterConfig,
    args: &ArgMatches,
    action: FrameAction,
) -> Result<()> {
    let op_start_time = Instant::now();
    let cooldown_ms = op_helper::effective_cooldown_ms(master_config, args);
    let preview = op_helper::preview_enabled(master_config, args);
    let stack = op_helper::build_console_stack(master_config, cooldown_ms, preview);

    if action == FrameAction::LearnOnce {
        let label = args.get_one::<String>("label").cloned().unwrap_or_default();
        if label.trim().is_empty() {
            return Err(AppError::Policy("A non-empty label is required to learn.".to_string()).into());
        }
        stack.coordinator.set_learn_label(Some(label)).await;
    }

    op_helper::start_camera(&stack).await?;

    debug!("📸 Submitting a single {:?} capture.", action);
    match action {
        FrameAction::Recognize => stack.coordinator.recognize_once(false).await,
        FrameAction::Register => stack.coordinator.recognize_once(true).await,
        FrameAction::LearnOnce => stack.coordinator.learn_once().await,
    }

    if preview {
        op_helper::render_once(&stack).await?;
        tokio::time::sleep(Duration::from_millis(PREVIEW_HOLD_MS)).await;
    }

    let outcome = {
        let view = stack.view.lock().await;
        if let Some(annotation) = &view.annotation {
            println!("{}", annotation.title);
            println!("{}", annotation.subtitle);
            if let Some(badge) = &annotation.badge {
                println!("[{}]", badge);
            }
        }
        view.status.clone()
    };

    stack.session.lock().await.stop();
    stack.renderer.close();

    match outcome.kind {
        StatusKind::Err => Err(anyhow!("{}", outcome.msg)),
        _ => {
            info!("✅ {:?} finished in {:?}: {}", action, op_start_time.elapsed(), outcome.msg);
            Ok(())
        }
    }
}
