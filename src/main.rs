//! Rig monitor entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                  │
//! │  UdpCommandLink      ConsoleSink        SystemClock      │
//! │  (CommandPort)       (SnapshotSink)     (ClockPort)      │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │         RigService (snapshot · policy · liveness)  │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                                                          │
//! │  EventLoop (mio) ◀── SignalDemux ◀── SIGINT/TERM, ticker │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use log::{error, info};

use rigmon::adapters::command_link::UdpCommandLink;
use rigmon::adapters::console_sink::ConsoleSink;
use rigmon::adapters::time::SystemClock;
use rigmon::app::ports::CommandPort;
use rigmon::command::{CommandMessage, Property, PropertyId, ReadRequest};
use rigmon::config::{Overrides, RigConfig};
use rigmon::connector::{Connector, DEFAULT_ADDRESS, parse_address};
use rigmon::event_loop::run_monitor;

/// Properties reported by `query`.
const QUERIED: [Property; 4] = [
    Property::Enabled,
    Property::Amplitude,
    Property::Frequency,
    Property::GlitchChance,
];
const QUERIED_CHANNELS: [u16; 3] = [1, 2, 3];

/// Monitor the rig's telemetry and steer its actuator.
#[derive(Parser, Debug)]
#[command(name = "rigmon", version, long_about = None)]
struct Cli {
    /// IPv4 address of the rig [default: 127.0.0.1]
    address: Option<String>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Idle wake-up interval of the event loop in milliseconds
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one set-value command
    Set {
        /// Target channel on the rig
        channel: u16,
        /// Property name (e.g. frequency) or any numeric id
        property: PropertyId,
        value: u16,
        /// IPv4 address of the rig, if not given before the subcommand
        #[arg(short, long)]
        address: Option<String>,
    },
    /// Send read requests for the main properties of channels 1 to 3
    Query {
        /// IPv4 address of the rig, if not given before the subcommand
        #[arg(short, long)]
        address: Option<String>,
    },
}

impl Cli {
    /// The rig address, given either before the subcommand or through its
    /// `--address`. Two different addresses are an error.
    fn target(&self) -> Result<&str> {
        let sub = match &self.command {
            Some(Command::Set { address, .. } | Command::Query { address }) => address.as_deref(),
            None => None,
        };
        match (self.address.as_deref(), sub) {
            (Some(a), Some(b)) if a != b => bail!("conflicting addresses {} and {}", a, b),
            (Some(a), _) | (None, Some(a)) => Ok(a),
            (None, None) => Ok(DEFAULT_ADDRESS),
        }
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            tick_interval_ms: self.tick_ms,
            idle_timeout_ms: self.idle_timeout_ms,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = RigConfig::resolve(cli.config.as_deref(), cli.overrides())?;
    let address = cli.target()?;
    match &cli.command {
        None => {
            let outcome = run_monitor(address, &config, ConsoleSink::stdout(), SystemClock)?;
            info!("exit: {:?}", outcome);
        }
        Some(Command::Set {
            channel,
            property,
            value,
            ..
        }) => {
            let mut link = command_link(address, &config)?;
            link.send(&CommandMessage::set(*channel, *property, *value).encode());
            info!("set channel {} {} = {}", channel, property, value);
        }
        Some(Command::Query { .. }) => {
            let mut link = command_link(address, &config)?;
            for channel in QUERIED_CHANNELS {
                for property in QUERIED {
                    link.send(&ReadRequest::new(channel, property).encode());
                }
            }
            info!(
                "sent {} read requests",
                QUERIED_CHANNELS.len() * QUERIED.len()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn command_link(address: &str, config: &RigConfig) -> Result<UdpCommandLink> {
    let address = parse_address(address)?;
    let link = Connector::new(address, config).open_command_link();
    if !link.is_connected() {
        bail!("command channel to {} is unavailable", link.peer());
    }
    Ok(link)
}
