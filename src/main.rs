mod cli;
mod config_loader;
mod app_config;
mod service_config;
mod camera;
mod core;
mod operations;
mod remote;
mod common;
mod errors;

use common::logging_setup;
use log::{info, error, debug};
use anyhow::{Result, bail};
use operations::frame_op::FrameAction;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let main_start_time = Instant::now();
    // Parse CLI arguments early for potential use in logging or config path
    let matches = cli::build_cli().get_matches();

    // Determine the configuration file path
    let config_path = matches.get_one::<String>("config").map(|s| s.as_str()).unwrap_or("config/console.yaml");

    debug!("Attempting to load configuration from: {}", config_path);
    let config_load_start_time = Instant::now();
    let master_config = match config_loader::load_config(config_path) {
        Ok(cfg) => {
            logging_setup::initialize_logging(Some(&cfg), &matches);
            info!("✅ Full configuration loaded successfully from: {} in {:?}", config_path, config_load_start_time.elapsed());
            cfg
        }
        Err(e) => {
            // Try to initialize logging with CLI args only, or defaults
            logging_setup::initialize_logging(None, &matches);
            error!("❌ Failed to load master configuration from '{}': {:#}. Exiting.", config_path, e);
            return Err(e.context(format!("Failed to load master configuration from '{}'", config_path)));
        }
    };

    info!("🚀 InvCam console starting against {}.", master_config.service.base_url);

    // Dispatch based on subcommand
    if let Some((operation_name, sub_args)) = matches.subcommand() {
        debug!("🎬 Dispatching to subcommand: {}", operation_name);
        let op_start_time = Instant::now();

        let op_result: Result<()> = match operation_name {
            "learn" => {
                operations::scan_op::handle_learn_cli(&master_config, sub_args).await
            }
            "autoscan" => {
                operations::scan_op::handle_autoscan_cli(&master_config, sub_args).await
            }
            "recognize" => {
                operations::frame_op::handle_frame_cli(&master_config, sub_args, FrameAction::Recognize).await
            }
            "register" => {
                operations::frame_op::handle_frame_cli(&master_config, sub_args, FrameAction::Register).await
            }
            "learn-once" => {
                operations::frame_op::handle_frame_cli(&master_config, sub_args, FrameAction::LearnOnce).await
            }
            "dashboard" => {
                operations::dashboard_op::handle_dashboard_cli(&master_config, sub_args).await
            }
            "clear-inventory" => {
                operations::inventory_op::handle_clear_cli(&master_config, sub_args).await
            }
            "export-csv" => {
                operations::inventory_op::handle_export_cli(&master_config, sub_args).await
            }
            _ => {
                bail!("Subcommand '{}' not implemented.", operation_name)
            }
        };

        if let Err(e) = op_result {
            error!("❌ Operation '{}' failed after {:?}: {:#}", operation_name, op_start_time.elapsed(), e);
            return Err(e);
        } else {
            info!("✅ Operation '{}' completed successfully in {:?}.", operation_name, op_start_time.elapsed());
        }
    } else {
        info!("🤔 No subcommand provided. Run with --help to see the available operations.");
    }

    info!("🏁 InvCam finished in {:?}.", main_start_time.elapsed());
    Ok(())
}
