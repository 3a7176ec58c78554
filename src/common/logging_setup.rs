use crate::config_loader::MasterConfig;
use env_logger::Builder;
use log::LevelFilter;

/// CLI `--debug` beats the config's `log_level`, which beats the info
/// default. Double initialization (possible in tests) downgrades to a
/// stderr notice instead of failing the operation.
pub fn initialize_logging(config: Option<&MasterConfig>, cli_matches: &clap::ArgMatches) {
    let level = if cli_matches.get_flag("debug") {
        LevelFilter::Debug
    } else {
        let configured = config.and_then(|c| c.app_settings.log_level.as_deref());
        parse_level(configured.unwrap_or("info"))
    };

    let mut builder = Builder::new();
    builder.filter_level(level);
    if let Err(e) = builder.try_init() {
        eprintln!("Logger already initialized ({}); keeping the existing one.", e);
    }
}

fn parse_level(s: &str) -> LevelFilter {
    match s.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        other => {
            eprintln!("Unrecognized log level '{}', defaulting to info.", other);
            LevelFilter::Info
        }
    }
}
