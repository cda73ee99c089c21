//! LedFlow - generative light show driver
//!
//! Loads a show config, connects to the device and runs the scheduler until
//! `q` or end of input on stdin.

#![warn(missing_docs)]

mod logging_setup;

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
#[cfg(feature = "midi")]
use ledflow_control::MidiInputHandler;
use ledflow_control::{
    Command as ShowCommand, DeviceSession, MemorySession, Scheduler, ShowConfig, UdpDeviceSession,
};
use ledflow_core::Mode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "ledflow")]
#[command(about = "Real-time generative light show driver", long_about = None)]
struct Cli {
    /// Show config file (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the show (default)
    Run {
        /// Mode at startup, by name or index
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Render without sending to the device
        #[arg(long)]
        preview: bool,
    },

    /// Write a config file with every default spelled out
    InitConfig {
        /// Output path
        path: PathBuf,
    },

    /// List MIDI input ports
    #[cfg(feature = "midi")]
    Ports,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ShowConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ShowConfig::default(),
    };
    let _log_guard = logging_setup::init(&config.logging, cli.verbose)?;

    let command = cli.command.unwrap_or(Commands::Run {
        mode: None,
        preview: false,
    });
    match command {
        Commands::Run { mode, preview } => {
            if let Some(mode) = mode {
                config.mode = mode;
            }
            config.preview |= preview;
            run(config)
        }
        Commands::InitConfig { path } => {
            ShowConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        #[cfg(feature = "midi")]
        Commands::Ports => {
            for name in MidiInputHandler::list_ports()? {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn run(config: ShowConfig) -> Result<()> {
    info!("=== LedFlow session started ===");

    let strings = config.device.strings.clone();
    let session: Box<dyn DeviceSession> = if config.preview {
        Box::new(MemorySession::with_token(strings, None))
    } else {
        let token = config.device.session_token()?;
        if token.is_none() {
            warn!("No session token configured; frames will not be sent");
        }
        Box::new(
            UdpDeviceSession::connect(&config.device.address, strings, token)
                .with_context(|| format!("Failed to open device {}", config.device.address))?,
        )
    };

    let scheduler = Scheduler::new(config.scheduler_config(), session);
    scheduler.start()?;

    #[cfg(feature = "midi")]
    let _midi = connect_midi(&config, &scheduler);

    let result = command_loop(&scheduler);
    scheduler.stop();
    info!("Session stats: {:?}", scheduler.stats());
    result
}

#[cfg(feature = "midi")]
fn connect_midi(config: &ShowConfig, scheduler: &Scheduler) -> Option<MidiInputHandler> {
    if !config.midi.enabled {
        return None;
    }
    match MidiInputHandler::connect(
        config.midi.port.as_deref(),
        scheduler.clock(),
        scheduler.event_sender(),
    ) {
        Ok(handler) => Some(handler),
        Err(e) => {
            warn!("MIDI input unavailable: {}", e);
            None
        }
    }
}

/// Read operator commands from stdin until `q` or EOF
fn command_loop(scheduler: &Scheduler) -> Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        match words.next() {
            None => continue,
            Some("q" | "quit") => break,
            Some("mode") => match words.next().map(str::parse::<Mode>) {
                Some(Ok(mode)) => scheduler.set_mode(mode),
                Some(Err(e)) => println!("{}", e),
                None => {
                    let mode = scheduler.mode().map(|m| m.to_string());
                    println!("{}", mode.unwrap_or_default());
                }
            },
            Some("next") => {
                if let Some(mode) = scheduler.mode() {
                    scheduler.set_mode(mode.next());
                }
            }
            Some("touch") => scheduler.command(ShowCommand::Touch),
            Some("stats") => println!("{}", scheduler.stats().to_json()?),
            Some(other) => {
                println!("Unknown command {:?}; try mode <name>, next, touch, stats, q", other)
            }
        }
    }
    Ok(())
}
