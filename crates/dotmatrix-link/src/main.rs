//! dotmatrix-link: command-line front end for a networked dot-matrix display.
//!
//! # Usage
//!
//! ```text
//! dotmatrix-link [OPTIONS] <COMMAND>
//!
//! Commands:
//!   discover  Wait for the display's UDP announcement and print its endpoint
//!   ping      Connect and run one keep-alive exchange
//!   command   Send a device command (set-clock-mode, scroll-date, ...)
//!   blank     Transmit a single all-off frame
//!
//! Options:
//!   --config <PATH>   Settings file [default: platform config dir]
//!   --host <IP>       Display IP address (overrides [device] host)
//!   --port <PORT>     Display TCP port (overrides [device] port)
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable             | Description                         |
//! |----------------------|-------------------------------------|
//! | `DOTMATRIX_CONFIG`   | Settings file path                  |
//! | `DOTMATRIX_HOST`     | Display IP address                  |
//! | `DOTMATRIX_PORT`     | Display TCP port                    |
//!
//! The log level comes from `[logging] level` unless `RUST_LOG` is set.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dotmatrix_core::{DisplayCommand, FrameStore, Message};
use dotmatrix_link::application::{build_message, TransmitRequest};
use dotmatrix_link::infrastructure::network::{discover, ConnectionManager};
use dotmatrix_link::infrastructure::storage::config::{
    config_file_path, load_settings_from, save_settings_to, LinkSettings,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Talks to a dot-matrix display over the network.
#[derive(Debug, Parser)]
#[command(
    name = "dotmatrix-link",
    about = "Discover, probe, and transmit to a networked dot-matrix display",
    version
)]
struct Cli {
    /// Settings file to read (and, for `discover --save`, write).
    #[arg(long, env = "DOTMATRIX_CONFIG")]
    config: Option<PathBuf>,

    /// Display IP address.
    #[arg(long, env = "DOTMATRIX_HOST")]
    host: Option<String>,

    /// Display TCP port.
    #[arg(long, env = "DOTMATRIX_PORT")]
    port: Option<u16>,

    /// Connect timeout in milliseconds.
    #[arg(long)]
    connect_timeout_ms: Option<u64>,

    /// Response timeout in milliseconds.
    #[arg(long)]
    response_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Wait for the display's UDP announcement and print its endpoint.
    Discover {
        /// Store the discovered endpoint in the settings file.
        #[arg(long)]
        save: bool,

        /// How long to listen, in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Connect and run one keep-alive exchange.
    Ping,

    /// Send a device command.
    Command {
        #[arg(value_enum)]
        command: CommandArg,
    },

    /// Transmit a single all-off frame.
    Blank {
        #[arg(long)]
        rows: usize,

        #[arg(long)]
        columns: usize,

        #[arg(long, default_value_t = 100)]
        duration_ms: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CommandArg {
    SetClockMode,
    SecondAnimationActive,
    SecondAnimationInactive,
    ScrollDate,
}

impl From<CommandArg> for DisplayCommand {
    fn from(arg: CommandArg) -> Self {
        match arg {
            CommandArg::SetClockMode => Self::SetClockMode,
            CommandArg::SecondAnimationActive => Self::SecondAnimationActive,
            CommandArg::SecondAnimationInactive => Self::SecondAnimationInactive,
            CommandArg::ScrollDate => Self::ScrollDate,
        }
    }
}

impl Cli {
    /// Applies command-line overrides on top of the loaded settings.
    fn apply_overrides(&self, settings: &mut LinkSettings) {
        if let Some(host) = &self.host {
            settings.device.host = Some(host.clone());
        }
        if let Some(port) = self.port {
            settings.device.port = Some(port);
        }
        if let Some(ms) = self.connect_timeout_ms {
            settings.link.connect_timeout_ms = ms;
        }
        if let Some(ms) = self.response_timeout_ms {
            settings.link.response_timeout_ms = ms;
        }
        if let CliCommand::Discover {
            timeout_ms: Some(ms),
            ..
        } = self.command
        {
            settings.discovery.timeout_ms = ms;
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Spawns a connection manager and connects it to the configured display.
async fn connect(settings: &LinkSettings) -> anyhow::Result<ConnectionManager> {
    let endpoint = settings.device.endpoint()?.context(
        "no display endpoint configured; pass --host and --port or run `discover --save`",
    )?;

    let manager = ConnectionManager::spawn(settings.link.timings());
    manager.set_endpoint(endpoint).await?;
    manager.connect().await?;
    Ok(manager)
}

async fn transmit(settings: &LinkSettings, message: Message) -> anyhow::Result<()> {
    let manager = connect(settings).await?;
    let result = manager.transmit(message).await;
    if let Some(progress) = manager.status().progress {
        println!("{progress}");
    }
    manager.disconnect().await?;
    manager.shutdown().await;
    result.context("transmission failed")
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };
    let mut settings = load_settings_from(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    cli.apply_overrides(&mut settings);

    // `RUST_LOG` wins over the settings file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
        )
        .init();

    match cli.command {
        CliCommand::Discover { save, .. } => {
            let endpoint = discover(&settings.discovery).await?;
            println!("{endpoint}");
            if save {
                settings.device.set_endpoint(endpoint);
                save_settings_to(&path, &settings)
                    .with_context(|| format!("failed to save settings to {}", path.display()))?;
                info!("saved display endpoint to {}", path.display());
            }
        }
        CliCommand::Ping => {
            let manager = connect(&settings).await?;
            let code = manager.keep_alive().await?;
            println!("{code}");
            manager.disconnect().await?;
            manager.shutdown().await;
            anyhow::ensure!(code.is_ok(), "display answered '{code}'");
        }
        CliCommand::Command { command } => {
            transmit(&settings, Message::Command(command.into())).await?;
        }
        CliCommand::Blank {
            rows,
            columns,
            duration_ms,
        } => {
            let mut store = FrameStore::new(rows, columns)?;
            store.set_frame_duration(0, duration_ms)?;
            let message = build_message(
                &store,
                &TransmitRequest::AnimationFrames {
                    only_current: true,
                    current_frame: 0,
                },
            )?;
            transmit(&settings, message).await?;
        }
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
