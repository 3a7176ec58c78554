use crate::common::file_utils;
use crate::config_loader::MasterConfig;
use crate::operations::op_helper;
use crate::remote::client::VisionApi;
use crate::remote::types::DetectionFilter;
use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use log::{info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Wipes the remote inventory ledger. Destructive, so it requires both the
/// shared-secret token (from the environment) and an explicit confirmation.
pub async fn handle_clear_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let env_name = master_config.service.clear_token_env_name();
    let token = match std::env::var(env_name) {
        Ok(t) if !t.trim().is_empty() => t,
        _ => bail!(
            "No admin token found. Set the {} environment variable before clearing the inventory.",
            env_name
        ),
    };

    if !args.get_flag("yes") && !confirm_on_stdin()? {
        info!("Clear aborted by the operator.");
        return Ok(());
    }

    warn!("🧹 Clearing the ENTIRE remote inventory ledger...");
    let client = op_helper::build_service(master_config);
    client
        .clear_inventory(token.trim())
        .await
        .context("The service rejected the inventory clear")?;
    println!("Inventory cleared.");

    // Show the post-clear state so the operator sees the wipe took effect.
    match client.stats().await {
        Ok(stats) => println!("events: {}   labels: {}", stats.total_events, stats.total_labels),
        Err(e) => warn!("⚠️ Could not refresh stats after the clear: {}", e),
    }
    Ok(())
}

fn confirm_on_stdin() -> Result<bool> {
    print!("This wipes ALL detections and learned objects on the service. Continue? [y/N] ");
    std::io::stdout().flush().context("Could not flush the confirmation prompt")?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("Could not read the confirmation answer")?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Downloads the detection ledger as CSV, honoring the same label/time filter
/// as the dashboard view.
pub async fn handle_export_cli(master_config: &MasterConfig, args: &ArgMatches) -> Result<()> {
    let op_start_time = Instant::now();
    let filter = DetectionFilter {
        label: args.get_one::<String>("label").cloned(),
        last_minutes: args.get_one::<u32>("last-minutes").copied().unwrap_or(0),
        ..Default::default()
    };

    let dest = match args.get_one::<String>("output") {
        Some(path) => PathBuf::from(path),
        None => {
            let dir = file_utils::ensure_output_directory(&master_config.app_settings.output_directory)?;
            dir.join(file_utils::generate_timestamped_filename(
                "inventory_export",
                &master_config.app_settings.filename_timestamp_format,
                "csv",
            ))
        }
    };

    info!("⬇️ Exporting the detection ledger to {}...", dest.display());
    let client = op_helper::build_service(master_config);
    let written = client
        .export_csv(&filter, &dest)
        .await
        .context("CSV export failed")?;
    info!("✅ Export finished in {:?}.", op_start_time.elapsed());
    println!("{}", written.display());
    Ok(())
}
