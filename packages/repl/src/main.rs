use std::path::PathBuf;

use clap::Parser;
use pathbridge::{Bridge, BridgeConfig, EngineConfig};
use tracing_subscriber::EnvFilter;

/// pathbridge - Interactive host for the pathbridge command bridge
#[derive(Parser, Debug)]
#[command(name = "pathbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bridge configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Store resources on disk under this directory, overriding the config
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Start the bridge immediately
    #[arg(long)]
    start: bool,

    /// Force vi editing mode
    #[arg(long)]
    vi: bool,

    /// Force emacs editing mode
    #[arg(long)]
    emacs: bool,
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env("PATHBRIDGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let args = Args::parse();

    if args.vi {
        std::env::set_var("PATHBRIDGE_EDIT_MODE", "vi");
    } else if args.emacs {
        std::env::set_var("PATHBRIDGE_EDIT_MODE", "emacs");
    }

    let mut config = match args.config {
        Some(path) => match BridgeConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => BridgeConfig::default(),
    };
    if let Some(dir) = args.data_dir {
        config.engine = EngineConfig::Local { path: dir };
    }

    let bridge = Bridge::new(config);
    if args.start {
        if let Err(e) = bridge.start() {
            eprintln!("Error: failed to start bridge: {}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = pathbridge_repl::run(bridge) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
