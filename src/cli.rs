use clap::{Arg, ArgAction, Command};
use log::debug;
use std::time::Instant;

pub fn build_cli() -> Command {
    debug!("⚙️ Building CLI interface...");
    let start_time = Instant::now();
    let cmd = Command::new("invcam")
        .version("0.1.0")
        .author("InvCam Developers")
        .about("An operator console for the camera-based inventory vision service.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom configuration file")
                .action(ArgAction::Set)
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("learn")
                .about("Continuously teaches the service a new object under the given label")
                .arg(Arg::new("label").long("label").value_name("LABEL").required(true).help("Label to store samples under").action(ArgAction::Set))
                .arg(Arg::new("cooldown").long("cooldown").value_name("MS").help("Capture cooldown in milliseconds (overrides config)").value_parser(clap::value_parser!(u64)).action(ArgAction::Set))
                .arg(Arg::new("preview").long("preview").help("Show a live preview window with the capture reticle").action(ArgAction::SetTrue))
        )
        .subcommand(
            Command::new("autoscan")
                .about("Continuously recognizes objects and registers high-confidence hits")
                .arg(Arg::new("cooldown").long("cooldown").value_name("MS").help("Capture cooldown in milliseconds (overrides config)").value_parser(clap::value_parser!(u64)).action(ArgAction::Set))
                .arg(Arg::new("preview").long("preview").help("Show a live preview window with the capture reticle").action(ArgAction::SetTrue))
        )
        .subcommand(
            Command::new("recognize")
                .about("Captures a single frame and asks the service what it sees")
                .arg(Arg::new("preview").long("preview").help("Show the annotated frame in a preview window").action(ArgAction::SetTrue))
        )
        .subcommand(
            Command::new("register")
                .about("Captures a single frame and registers a high-confidence recognition")
                .arg(Arg::new("preview").long("preview").help("Show the annotated frame in a preview window").action(ArgAction::SetTrue))
        )
        .subcommand(
            Command::new("learn-once")
                .about("Submits a single learning sample under the given label")
                .arg(Arg::new("label").long("label").value_name("LABEL").required(true).help("Label to store the sample under").action(ArgAction::Set))
        )
        .subcommand(
            Command::new("dashboard")
                .about("Prints service stats, label counts and the detection ledger")
                .arg(Arg::new("label").long("label").value_name("LABEL").help("Only show detections for this label").action(ArgAction::Set))
                .arg(Arg::new("last-minutes").long("last-minutes").value_name("MINUTES").help("Only show detections from the last N minutes").value_parser(clap::value_parser!(u32)).action(ArgAction::Set))
                .arg(Arg::new("page").long("page").value_name("PAGE").help("Ledger page to show (1-based)").value_parser(clap::value_parser!(u32)).action(ArgAction::Set))
                .arg(Arg::new("watch").long("watch").help("Keep refreshing every 2.5 seconds until interrupted").action(ArgAction::SetTrue))
        )
        .subcommand(
            Command::new("clear-inventory")
                .about("Wipes the remote inventory (requires the admin token)")
                .arg(Arg::new("yes").short('y').long("yes").help("Skip the confirmation prompt").action(ArgAction::SetTrue))
        )
        .subcommand(
            Command::new("export-csv")
                .about("Downloads the detection ledger as a CSV file")
                .arg(Arg::new("label").long("label").value_name("LABEL").help("Only export detections for this label").action(ArgAction::Set))
                .arg(Arg::new("last-minutes").long("last-minutes").value_name("MINUTES").help("Only export detections from the last N minutes").value_parser(clap::value_parser!(u32)).action(ArgAction::Set))
                .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Destination file (default: timestamped file in the output directory)").action(ArgAction::Set))
        );
    debug!("✅ CLI interface built in {:?}", start_time.elapsed());
    cmd
}
