use crate::config_loader::MasterConfig;
use crate::core::coordinator::ScanMode;
use crate::core::poller::DASHBOARD_POLL_MS;
use crate::errors::AppError;
use crate::operations::op_helper;
use anyhow::{bail, Result};
use clap::ArgMatches;
use log::{info, warn};
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};

const RENDER_PERIOD_MS: u64 = 33;

pub async fn handle_learn_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let label = args
        .get_one::<String>("label")
        .cloned()
        .unwrap_or_default();
    run_continuous(master_config, args, ScanMode::Learning, Some(label)).await
}

pub async fn handle_autoscan_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    run_continuous(master_config, args, ScanMode::Autoscanning, None).await
}

/// Shared loop for both continuous modes. Three timers drive it: the capture
/// timer (cooldown-clamped), the render timer and the dashboard poll. All of
/// them skip missed ticks rather than bursting to catch up. Ctrl-C disarms
/// the mode and releases the camera.
async fn run_continuous(
    master_config: &MasterConfig,
    args: &ArgMatches,
    mode: ScanMode,
    label: Option<String>,
) -> Result<()> {
    let op_start_time = Instant::now();
    let cooldown_ms = op_helper::effective_cooldown_ms(master_config, args);
    let preview = op_helper::preview_enabled(master_config, args);
    let stack = op_helper::build_console_stack(master_config, cooldown_ms, preview);

    stack.coordinator.set_learn_label(label).await;
    match mode {
        ScanMode::Learning => {
            if !stack.coordinator.enter_learning().await {
                return Err(AppError::Policy(
                    "A non-empty label is required to start learning.".to_string(),
                )
                .into());
            }
        }
        ScanMode::Autoscanning => stack.coordinator.enter_autoscan().await,
        ScanMode::Idle => bail!("Continuous operation needs a scan mode."),
    }

    op_helper::start_camera(&stack).await?;
    stack.poller.tick().await;

    let mut capture_timer = interval(stack.coordinator.tick_period());
    capture_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut render_timer = interval(Duration::from_millis(RENDER_PERIOD_MS));
    render_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut dashboard_timer = interval(Duration::from_millis(DASHBOARD_POLL_MS));
    dashboard_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        "🔁 Continuous {:?} running (capture every {:?}). Press Ctrl-C to stop.",
        mode,
        stack.coordinator.tick_period()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = capture_timer.tick() => {
                match mode {
                    ScanMode::Learning => stack.coordinator.learn_tick().await,
                    ScanMode::Autoscanning => stack.coordinator.autoscan_tick().await,
                    ScanMode::Idle => {}
                }
            }
            _ = render_timer.tick() => {
                if let Err(e) = op_helper::render_once(&stack).await {
                    warn!("⚠️ Render pass failed: {}", e);
                }
            }
            _ = dashboard_timer.tick() => {
                stack.poller.tick().await;
            }
            _ = &mut shutdown => {
                info!("🛑 Ctrl-C received, shutting the scan loop down.");
                break;
            }
        }
    }

    stack.coordinator.force_idle().await;
    stack.session.lock().await.stop();
    stack.renderer.close();

    let view = stack.view.lock().await;
    if mode == ScanMode::Learning {
        info!("🎓 Learned {} sample(s) in {:?}.", view.learn_count, op_start_time.elapsed());
    } else {
        info!(
            "📦 AutoScan finished after {:?} ({} detection(s) on the ledger).",
            op_start_time.elapsed(),
            view.detections_total
        );
    }
    Ok(())
}
