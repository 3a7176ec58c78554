use crate::common::timestamp_utils::fmt_ts;
use crate::config_loader::MasterConfig;
use crate::core::poller::{DashboardPoller, DASHBOARD_POLL_MS};
use crate::core::view_state::ViewState;
use crate::operations::op_helper;
use crate::remote::client::{RemoteVisionClient, VisionApi};
use anyhow::Result;
use clap::ArgMatches;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};

pub async fn handle_dashboard_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let client = op_helper::build_service(master_config);
    let service: Arc<dyn VisionApi> = client.clone();
    let view = Arc::new(Mutex::new(ViewState::new()));
    let poller = Arc::new(DashboardPoller::new(service, Arc::clone(&view)));

    let label = args.get_one::<String>("label").cloned();
    let last_minutes = args.get_one::<u32>("last-minutes").copied().unwrap_or(0);
    let page = args.get_one::<u32>("page").copied().unwrap_or(1);
    poller
        .update_filter(|filter| {
            filter.set_label(label);
            filter.set_last_minutes(last_minutes);
            filter.cursor.page = page.max(1);
        })
        .await;

    poller.tick().await;
    print_snapshot(client.as_ref(), &view, &poller).await;

    if args.get_flag("watch") {
        info!("👀 Watching, refresh every {} ms. Press Ctrl-C to stop.", DASHBOARD_POLL_MS);
        let mut poll_timer = interval(Duration::from_millis(DASHBOARD_POLL_MS));
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = poll_timer.tick() => {
                    poller.tick().await;
                    print_snapshot(client.as_ref(), &view, &poller).await;
                }
                _ = &mut shutdown => break,
            }
        }
    }
    Ok(())
}

async fn print_snapshot(
    client: &RemoteVisionClient,
    view: &Arc<Mutex<ViewState>>,
    poller: &Arc<DashboardPoller>,
) {
    let view = view.lock().await;
    let cursor = poller.filter().await.cursor;

    println!();
    println!("=== Inventory service ===");
    println!("events: {}   labels: {}", view.stats.total_events, view.stats.total_labels);

    if !view.counts.is_empty() {
        println!();
        println!("--- Top labels ---");
        for row in &view.counts {
            println!("{:>6}  {}", row.count, row.label);
        }
    }

    if !view.learned_top.is_empty() || !view.learned_last.is_empty() {
        println!();
        println!("--- Learned objects ---");
        for row in &view.learned_top {
            println!("{:>6}  {}", row.count, row.label);
        }
        for (label, ts) in &view.learned_last {
            println!("        {}  (last: {})", label, fmt_ts(Some(ts)));
        }
    }

    println!();
    println!(
        "--- Detections (page {}/{}, {} total) ---",
        cursor.page,
        cursor.total_pages(view.detections_total),
        view.detections_total
    );
    for row in &view.detections {
        let conf = row
            .confidence
            .map(|c| format!("{:.2}", c))
            .unwrap_or_else(|| "-".to_string());
        let image = row
            .image_path
            .as_deref()
            .map(|p| client.resolve_image_url(p))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<6} {:<20} conf {:<5} {}  cam {:<8} {}",
            row.id,
            row.label,
            conf,
            fmt_ts(row.ts.as_deref()),
            row.camera_id.as_deref().unwrap_or("-"),
            image
        );
    }
    println!("status: {}", view.status.msg);
}
