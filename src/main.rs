//! `card-bridge`: headless front end for the reader.
//!
//! - `run [--port <path>]` - connect (or auto-connect), print events as JSON
//!   lines on stdout and send commands typed on stdin
//! - `ports` - list candidate serial ports
//! - `init` - write a default configuration file

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use card_bridge::prelude::*;
use card_bridge::serial::{auto_connect, list_ports};

#[derive(Parser)]
#[command(name = "card-bridge")]
#[command(about = "Serial companion for an RFID access-control reader")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "card-bridge.toml", global = true)]
    config: PathBuf,

    /// Verbose logging (-v, -vv for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Bridge the reader to stdin/stdout
    Run {
        /// Reader serial port (e.g. /dev/ttyACM0); scans when omitted
        #[arg(short, long)]
        port: Option<String>,
    },
    /// List candidate serial ports
    Ports,
    /// Write a default configuration file
    Init,
}

fn init_logging(config: &Config, verbose: u8) {
    let level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match Config::load_or_default(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(&config, cli.verbose);

    let result = match cli.command {
        Commands::Run { port } => run(config, port).await,
        Commands::Ports => ports(),
        Commands::Init => init(&cli.config).await,
    };
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn ports() -> Result<()> {
    for port in list_ports()? {
        println!("{port}");
    }
    Ok(())
}

async fn init(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path).await? {
        return Err(BridgeError::invalid_config(format!(
            "{} already exists",
            path.display()
        )));
    }
    Config::create_default(path).await?;
    info!("wrote {}", path.display());
    Ok(())
}

async fn run(config: Config, port: Option<String>) -> Result<()> {
    let publisher = Arc::new(JsonLinesPublisher::new(std::io::stdout()));
    let mut bridge = Bridge::new(config.clone(), publisher);

    match port.or_else(|| config.serial.port.clone()) {
        Some(port) => {
            if let Err(e) = bridge.connect(&port).await {
                warn!("{e}");
            }
        }
        None => {
            auto_connect(&mut bridge, &config).await;
        }
    }

    // Without a terminal (`</dev/null`, a service manager) stdin closes at
    // once; the bridge keeps publishing until interrupted.
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = stdin.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !handle_input(&mut bridge, line.trim()).await {
                        break;
                    }
                }
                None => {
                    info!("stdin closed, running until interrupted");
                    stdin_open = false;
                }
            },
        }
    }

    bridge.disconnect().await
}

/// Returns false when the user asked to quit.
async fn handle_input(bridge: &mut Bridge, input: &str) -> bool {
    let (word, arg) = input.split_once(' ').unwrap_or((input, ""));
    match word {
        "" => {}
        "quit" | "exit" => return false,
        "status" => info!(
            "{} {}",
            bridge.status(),
            bridge.port_name().unwrap_or_default()
        ),
        "ports" => match list_ports() {
            Ok(ports) => info!("ports: {}", ports.join(", ")),
            Err(e) => warn!("{e}"),
        },
        "connect" if !arg.is_empty() => {
            if let Err(e) = bridge.connect(arg.trim()).await {
                warn!("{e}");
            }
        }
        "connect" => warn!("usage: connect <port>"),
        "disconnect" => {
            if let Err(e) = bridge.disconnect().await {
                warn!("{e}");
            }
        }
        _ => match input.parse::<DeviceCommand>() {
            Ok(command) => {
                if let Err(e) = bridge.send(&command).await {
                    warn!("{command}: {e}");
                }
            }
            Err(e) => warn!("{e}"),
        },
    }
    true
}
