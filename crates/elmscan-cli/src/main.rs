//! elmscan - ELM327 OBD-II / UDS vehicle scanner
//!
//! Talks to the vehicle through a serial ELM327 adapter: vehicle info,
//! trouble codes, live data, readiness monitors and raw UDS services.

mod commands;
mod config;
mod connection;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use elmscan_obd::LogFormat;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{CliOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "elmscan")]
#[command(author, version, about = "ELM327 OBD-II / UDS vehicle scanner")]
#[command(propagate_version = true)]
struct Cli {
    /// Adapter serial port (auto-detected when omitted)
    #[arg(short, long, env = "ELMSCAN_PORT", global = true)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, env = "ELMSCAN_BAUDRATE", global = true)]
    baudrate: Option<u32>,

    /// Manufacturer for DTC descriptions and UDS catalogs (jeep, landrover, ...)
    #[arg(short, long, env = "ELMSCAN_MANUFACTURER", global = true)]
    manufacturer: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "ELMSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Append raw adapter traffic to this file
    #[arg(long, global = true)]
    raw_log: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate adapter serial ports
    Ports,

    /// Show adapter, protocol, VIN and MIL status
    Info,

    /// Full scan: vehicle info, trouble codes and readiness monitors
    Scan,

    /// Read stored, pending and permanent trouble codes
    Dtc {
        /// Clear trouble codes and freeze frame data (Mode 04)
        #[arg(long)]
        clear: bool,

        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Poll PIDs until Ctrl+C
    Live {
        /// PIDs to poll, e.g. 0C,0D (default: diagnostic set)
        #[arg(long, value_delimiter = ',')]
        pids: Vec<String>,

        /// Use a predefined PID set instead of --pids
        #[arg(long, value_enum, conflicts_with = "pids")]
        set: Option<PidSet>,

        /// Poll interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,

        /// Record readings to a session log
        #[arg(long, value_enum)]
        log: Option<SessionFormat>,

        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<usize>,
    },

    /// Read freeze frame data (Mode 02)
    Freeze {
        /// Frame number
        #[arg(long, default_value_t = 0)]
        frame: u8,
    },

    /// Show emission readiness monitors
    Readiness,

    /// List supported Mode 01 PIDs
    Pids,

    /// Look up a trouble code or search descriptions
    Lookup {
        /// Code (P0133) or search text
        query: String,
    },

    /// Probe legacy K-Line protocols on the adapter
    Kline,

    /// UDS services on one ECU
    Uds {
        #[command(flatten)]
        target: UdsTarget,

        #[command(subcommand)]
        action: UdsCommand,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PidSet {
    Diagnostic,
    Temperature,
    Throttle,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SessionFormat {
    Csv,
    Json,
}

impl From<SessionFormat> for LogFormat {
    fn from(format: SessionFormat) -> Self {
        match format {
            SessionFormat::Csv => LogFormat::Csv,
            SessionFormat::Json => LogFormat::Json,
        }
    }
}

/// Which ECU a UDS command talks to
#[derive(Debug, Clone, Args)]
pub struct UdsTarget {
    /// Catalog module name (e.g. generic_engine, bcm)
    #[arg(long)]
    module: Option<String>,

    /// Request CAN id
    #[arg(long, conflicts_with = "module")]
    tx: Option<String>,

    /// Response CAN id
    #[arg(long, conflicts_with = "module")]
    rx: Option<String>,

    /// ELM327 protocol number
    #[arg(long, default_value = "6")]
    protocol: String,

    /// Additional catalog YAML files
    #[arg(long)]
    catalog: Vec<PathBuf>,

    /// Do not send the adapter setup (ATSH/ATCRA) before the request
    #[arg(long)]
    no_configure: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum UdsCommand {
    /// Read DIDs (default: standard identification DIDs)
    Read {
        /// DIDs in hex, e.g. F190
        dids: Vec<String>,

        /// Read a DID by catalog name instead
        #[arg(long, conflicts_with = "dids")]
        name: Option<String>,
    },

    /// Write a DID (asks for YES)
    Write {
        did: String,

        /// Data in hex, e.g. "01 02"
        data: String,

        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Run a catalog routine
    Routine {
        name: String,

        /// Routine control action
        #[arg(long, value_enum, default_value = "start")]
        action: RoutineAction,

        /// Routine parameters in hex
        #[arg(long, default_value = "")]
        data: String,
    },

    /// Send a raw service request and print the response
    Raw {
        /// Service id in hex, e.g. 22
        sid: String,

        /// Request data in hex
        data: Option<String>,

        /// Fail on a negative response instead of printing it
        #[arg(long)]
        strict: bool,
    },

    /// Change diagnostic session
    Session {
        /// default, programming, extended or a hex value
        #[arg(value_name = "TYPE")]
        session_type: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoutineAction {
    Start,
    Stop,
    Results,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&CliOverrides {
        port: cli.port.as_deref(),
        baudrate: cli.baudrate,
        manufacturer: cli.manufacturer.as_deref(),
        raw_log: cli.raw_log.as_deref(),
        output: cli.output,
        no_color: cli.no_color,
    });

    let ctx = OutputContext::new(merged.output, merged.no_color, cli.quiet);

    match &cli.command {
        Commands::Ports => commands::ports(&ctx),
        Commands::Info => commands::info(&merged, &ctx),
        Commands::Scan => commands::scan(&merged, &ctx),
        Commands::Dtc { clear, yes } => commands::dtc(&merged, *clear, *yes, &ctx),
        Commands::Live {
            pids,
            set,
            interval,
            log,
            cycles,
        } => {
            let pids = match set {
                Some(PidSet::Diagnostic) => to_owned(elmscan_obd::DIAGNOSTIC_PIDS),
                Some(PidSet::Temperature) => to_owned(elmscan_obd::TEMPERATURE_PIDS),
                Some(PidSet::Throttle) => to_owned(elmscan_obd::THROTTLE_PIDS),
                None => pids.clone(),
            };
            let options = commands::LiveOptions {
                pids,
                interval_ms: interval.unwrap_or(merged.monitor_interval_ms),
                log_format: log.map(LogFormat::from).or(merged.log_format),
                cycles: *cycles,
            };
            commands::live(&merged, options, &ctx)
        }
        Commands::Freeze { frame } => commands::freeze(&merged, *frame, &ctx),
        Commands::Readiness => commands::readiness(&merged, &ctx),
        Commands::Pids => commands::pids(&ctx),
        Commands::Lookup { query } => commands::lookup(&merged, query, &ctx),
        Commands::Kline => commands::kline(&merged, &ctx),
        Commands::Uds { target, action } => commands::uds(&merged, target, action, &ctx),
    }
}

fn to_owned(pids: &[&str]) -> Vec<String> {
    pids.iter().map(|p| p.to_string()).collect()
}
