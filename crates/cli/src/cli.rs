//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use actor_factory::Endpoint;

/// CARLA Control - interactive client for the CARLA simulator
#[derive(Parser, Debug)]
#[command(
    name = "carla-control",
    author,
    version,
    about = "Interactive CARLA simulator control",
    long_about = "Spawns vehicles and pedestrians, changes weather and map, shows a vehicle's \n\
                  camera and drives it from the keyboard. Runs the interactive menu when \n\
                  no subcommand is given."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_CONTROL_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (logs go to stderr)
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "CARLA_CONTROL_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Catalog file (TOML or JSON) replacing the built-in one
    #[arg(long, global = true, env = "CARLA_CONTROL_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "CARLA_CONTROL_METRICS_PORT")]
    pub metrics_port: u16,

    /// Replace the window with a surface that only counts frames
    #[arg(long, env = "CARLA_CONTROL_HEADLESS")]
    pub headless: bool,

    /// Seed for random vehicle / spawn point picks
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum wait for a POV frame, in milliseconds
    #[arg(long, default_value = "5000")]
    pub frame_timeout_ms: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Server connection options
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// CARLA server host
    #[arg(long, default_value = "localhost", global = true, env = "CARLA_HOST")]
    pub host: String,

    /// CARLA server port
    #[arg(long, default_value = "2000", global = true, env = "CARLA_PORT")]
    pub port: u16,

    /// Request timeout in seconds (requests are never retried)
    #[arg(long, default_value = "10.0", global = true, env = "CARLA_TIMEOUT")]
    pub timeout: f64,

    /// Client backend
    #[arg(long, value_enum, default_value_t = Backend::default(), global = true, env = "CARLA_CONTROL_BACKEND")]
    pub backend: Backend,
}

impl ConnectionArgs {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
            timeout: Duration::from_secs_f64(self.timeout.max(0.0)),
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive menu (default)
    Interactive,

    /// Generate a world from an OpenDRIVE file
    LoadXodr(LoadXodrArgs),

    /// List blueprint IDs matching a filter
    ListBlueprints(ListBlueprintsArgs),

    /// Print the loaded catalog
    Catalog(CatalogArgs),
}

/// Arguments for the `load-xodr` command
#[derive(Args, Debug, Clone)]
pub struct LoadXodrArgs {
    /// Path to the .xodr file
    pub path: PathBuf,

    /// Tile ground props on a (2N+1)x(2N+1) grid
    #[arg(long)]
    pub props: Option<u32>,

    /// Meters between ground props
    #[arg(long, default_value = "50.0")]
    pub prop_spacing: f64,
}

/// Arguments for the `list-blueprints` command
#[derive(Args, Debug, Clone)]
pub struct ListBlueprintsArgs {
    /// Wildcard filter
    #[arg(long, default_value = "static.prop.*")]
    pub filter: String,
}

/// Arguments for the `catalog` command
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Which `CarlaClient` implementation to use
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// In-memory simulator stand-in
    Mock,
    /// Real CARLA server (needs the `real-carla` feature)
    Carla,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "real-carla") {
            Self::Carla
        } else {
            Self::Mock
        }
    }
}
