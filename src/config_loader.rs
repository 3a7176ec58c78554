use crate::app_config::ApplicationConfig;
use crate::service_config::ServiceConfig;
use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MasterConfig {
    #[serde(rename = "application", default)]
    pub app_settings: ApplicationConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

pub fn load_config(path: &str) -> Result<MasterConfig> {
    debug!("📄 Attempting to load config from: {}", path);
    let start_time = Instant::now();

    let config_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'. 📖", path))?;
    debug!("Read config file in {:?}", start_time.elapsed());

    let parse_start_time = Instant::now();
    let config: MasterConfig = serde_yaml::from_str(&config_str)
        .with_context(|| format!("Failed to parse YAML configuration from '{}'. 💔", path))?;
    debug!("Parsed YAML in {:?}", parse_start_time.elapsed());

    let validate_start_time = Instant::now();
    validate_master_config(&config).with_context(|| "Master configuration validation failed 👎")?;
    debug!("Validated master config in {:?}", validate_start_time.elapsed());

    info!("✅ Successfully loaded and validated configuration from '{}' in {:?}", path, start_time.elapsed());
    Ok(config)
}

fn validate_master_config(config: &MasterConfig) -> Result<()> {
    debug!("🕵️ Validating master configuration...");
    let validation_start_time = Instant::now();

    if config.app_settings.output_directory.is_empty() {
        bail!("❌ Application output_directory cannot be empty.");
    }
    let output_path = Path::new(&config.app_settings.output_directory);
    if output_path.exists() && !output_path.is_dir() {
        bail!("❌ Output directory '{}' exists but is not a directory.", config.app_settings.output_directory);
    }

    if let Some(q) = config.app_settings.jpeg_quality {
        if q > 100 {
            bail!("❌ jpeg_quality must be in 0..=100, got {}.", q);
        }
    }

    if config.service.base_url.is_empty() {
        bail!("❌ Service base_url cannot be empty.");
    }
    if !config.service.base_url.starts_with("http://") && !config.service.base_url.starts_with("https://") {
        bail!("❌ Service base_url '{}' must start with http:// or https://.", config.service.base_url);
    }

    info!("👍 Master configuration validated successfully in {:?}.", validation_start_time.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let yaml = r#"
application:
  output_directory: "./output"
  camera_index: 1
  cooldown_ms: 900
  preview_window: true
  filename_timestamp_format: "%Y%m%d_%H%M%S"
service:
  base_url: "http://192.168.1.20:8000"
  clear_token_env: "MY_TOKEN"
"#;
        let cfg: MasterConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.app_settings.camera_index, Some(1));
        assert_eq!(cfg.app_settings.cooldown_ms, Some(900));
        assert_eq!(cfg.service.base_url, "http://192.168.1.20:8000");
        assert_eq!(cfg.service.clear_token_env_name(), "MY_TOKEN");
        assert!(validate_master_config(&cfg).is_ok());
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut cfg = MasterConfig::default();
        cfg.service.base_url = "ftp://nope".to_string();
        assert!(validate_master_config(&cfg).is_err());
    }

    #[test]
    fn defaults_cover_missing_sections() {
        let cfg: MasterConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(cfg.service.base_url, "http://127.0.0.1:8000");
        assert_eq!(cfg.app_settings.jpeg_quality, Some(90));
        assert_eq!(cfg.service.clear_token_env_name(), "INVCAM_INVENTORY_TOKEN");
    }
}
