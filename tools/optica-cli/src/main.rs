//! Optica CLI: inspect capture-format negotiation against a lens topology.
//!
//! Usage:
//!   optica formats <TOPOLOGY>              Ranked format catalog per lens
//!   optica select <TOPOLOGY> [OPTIONS]     Pick a format for a target
//!   optica zoom <TOPOLOGY> <LOGICAL>       Route a logical zoom to a lens
//!   optica simulate <TOPOLOGY> [OPTIONS]   Configure and record on a simulated device

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use optica_common::config::{AppConfig, FrameRatePolicy};

mod commands;

#[derive(Parser)]
#[command(
    name = "optica",
    about = "Capture-device format negotiation and multi-lens zoom routing",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (defaults to the user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the frame-rate scoring policy
    #[arg(long, global = true, value_enum)]
    policy: Option<PolicyArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Tiered,
    Raw,
}

impl From<PolicyArg> for FrameRatePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Tiered => FrameRatePolicy::Tiered,
            PolicyArg::Raw => FrameRatePolicy::Raw,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the ranked format catalog of every lens
    Formats {
        /// Path to a topology JSON file
        topology: PathBuf,

        /// Prefer enhanced (10-bit) color formats
        #[arg(long)]
        enhanced: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Select a format for a target on one lens
    Select {
        /// Path to a topology JSON file
        topology: PathBuf,

        /// Lens role: ultra-wide, wide or telephoto
        #[arg(long, default_value = "wide")]
        lens: String,

        /// Target width
        #[arg(long, default_value = "3840")]
        width: u32,

        /// Target height
        #[arg(long, default_value = "2160")]
        height: u32,

        /// Target frame rate
        #[arg(long, default_value = "30")]
        fps: f64,

        /// Prefer enhanced (10-bit) color formats
        #[arg(long)]
        enhanced: bool,
    },

    /// Route a logical zoom value to a lens
    Zoom {
        /// Path to a topology JSON file
        topology: PathBuf,

        /// Logical zoom (1.0 = wide lens)
        logical: f64,
    },

    /// Configure a simulated device and make a short recording
    Simulate {
        /// Path to a topology JSON file
        topology: PathBuf,

        /// Target width (defaults to config)
        #[arg(long)]
        width: Option<u32>,

        /// Target height (defaults to config)
        #[arg(long)]
        height: Option<u32>,

        /// Target frame rate (defaults to config)
        #[arg(long)]
        fps: Option<f64>,

        /// Logical zoom (defaults to config)
        #[arg(long)]
        zoom: Option<f64>,

        /// Request HDR video
        #[arg(long)]
        hdr: bool,

        /// Prefer enhanced (10-bit) color formats
        #[arg(long)]
        enhanced: bool,

        /// Exposure bias in EV, clamped to the lens range
        #[arg(long, allow_hyphen_values = true)]
        exposure: Option<f64>,

        /// Request smooth autofocus where the lens supports it
        #[arg(long)]
        smooth_af: bool,

        /// Recording length in milliseconds
        #[arg(long, default_value = "250")]
        duration_ms: u64,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(policy) = cli.policy {
        config.scoring.frame_rate_policy = policy.into();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    optica_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Formats {
            topology,
            enhanced,
            json,
        } => commands::formats::run(&config, topology, enhanced, json),
        Commands::Select {
            topology,
            lens,
            width,
            height,
            fps,
            enhanced,
        } => commands::select::run(&config, topology, &lens, width, height, fps, enhanced),
        Commands::Zoom { topology, logical } => commands::zoom::run(topology, logical),
        Commands::Simulate {
            topology,
            width,
            height,
            fps,
            zoom,
            hdr,
            enhanced,
            exposure,
            smooth_af,
            duration_ms,
        } => {
            let mut target = optica_capture_engine::service::default_target(&config.session);
            match (width, height) {
                (Some(w), Some(h)) => {
                    target.dimensions = optica_device_model::format::Dimensions::new(w, h);
                }
                (None, None) => {}
                _ => anyhow::bail!("--width and --height must be given together"),
            }
            if let Some(fps) = fps {
                target.frame_rate = fps;
            }
            if let Some(zoom) = zoom {
                target.zoom = zoom;
            }
            target.hdr |= hdr;
            target.enhanced_color |= enhanced;
            if let Some(bias) = exposure {
                target.exposure_bias = bias;
            }
            target.smooth_autofocus |= smooth_af;
            commands::simulate::run(&config, topology, target, duration_ms).await
        }
    }
}
