use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use slotnet_server::ServerConfig;

use crate::exit::{io_error, server_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod config;
pub mod send;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the server until interrupted.
    Serve(ServeArgs),
    /// Send one packet to a server.
    Send(SendArgs),
    /// Print the effective server configuration.
    Config(ConfigArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Config(args) => config::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Server settings: an optional JSON file, then flag or env overrides.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// JSON config file.
    #[arg(long, value_name = "FILE", env = "SLOTNET_CONFIG")]
    pub config: Option<PathBuf>,
    /// Server name used in logs.
    #[arg(long, env = "SLOTNET_NAME")]
    pub name: Option<String>,
    /// TCP and UDP port.
    #[arg(long, short = 'p', env = "SLOTNET_PORT")]
    pub port: Option<u16>,
    /// Number of client slots.
    #[arg(long, env = "SLOTNET_MAX_CLIENTS")]
    pub max_clients: Option<usize>,
    /// Per-connection buffer size in bytes.
    #[arg(long, env = "SLOTNET_BUFFER_SIZE")]
    pub buffer_size: Option<usize>,
    /// Tick context plus work lanes.
    #[arg(long, env = "SLOTNET_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,
    /// Scheduler tick interval in milliseconds.
    #[arg(long, env = "SLOTNET_TICK_INTERVAL_MS")]
    pub tick_interval_ms: Option<u64>,
}

impl SettingsArgs {
    /// Build and validate the effective configuration.
    pub fn resolve(&self) -> CliResult<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path).map_err(|err| {
                server_error(&format!("failed loading {}", path.display()), err)
            })?,
            None => ServerConfig::default(),
        };

        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_clients) = self.max_clients {
            config.max_clients = max_clients;
        }
        if let Some(buffer_size) = self.buffer_size {
            config.buffer_size = buffer_size;
        }
        if let Some(max_concurrency) = self.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
        if let Some(tick_interval_ms) = self.tick_interval_ms {
            config.tick_interval_ms = tick_interval_ms;
        }

        config
            .validate()
            .map_err(|err| server_error("config rejected", err))?;
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
    /// Packet type answered by the built-in echo handler.
    #[arg(long, default_value = "1", env = "SLOTNET_ECHO_TYPE")]
    pub echo_type: i32,
    /// Disable the built-in echo handler.
    #[arg(long)]
    pub no_echo: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server address (host:port).
    pub addr: SocketAddr,
    /// Packet type id.
    #[arg(long = "type", short = 't', default_value = "1")]
    pub packet_type: i32,
    /// String body appended after the type id.
    #[arg(long)]
    pub data: Option<String>,
    /// Send over UDP instead of TCP.
    ///
    /// The server remembers the first address it hears from for a slot, so
    /// repeat sends to a UDP-only slot need the same --bind address.
    #[arg(long, requires = "slot")]
    pub udp: bool,
    /// Slot to address over UDP.
    #[arg(long, requires = "udp")]
    pub slot: Option<usize>,
    /// Local address for the UDP socket (default: ephemeral port).
    #[arg(long, value_name = "ADDR", requires = "udp")]
    pub bind: Option<SocketAddr>,
    /// Wait for one reply frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a reply when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Multi-threaded runtime for commands that do network I/O.
pub fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("slotnet-worker")
        .build()
        .map_err(|err| io_error("failed to start runtime", err))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
