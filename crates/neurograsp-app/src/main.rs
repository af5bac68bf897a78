//! neurograsp
//!
//! Bridges a mental-command stream to a serial robotic arm.
//!
//! # Usage
//!
//! ```bash
//! # Run a live session; requests go to stdout, events are read from stdin
//! cortex-relay | neurograsp live --profile Arm-1 --port /dev/ttyACM0 | cortex-relay
//!
//! # Return the arm to its neutral pose
//! neurograsp reset --port /dev/ttyACM0
//!
//! # Tune the trigger threshold while a session is running
//! neurograsp threshold preset balanced
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use neurograsp_core::protocol::DeviceCommand;
use neurograsp_core::translator::ThresholdSource;
use neurograsp_core::types::{PowerThreshold, ThresholdBand, ThresholdPreset};
use neurograsp_native::bridge::CommandSink;
use neurograsp_native::config::{load_config, BridgeConfig};
use neurograsp_native::cortex::{parse_event, StreamingClient};
use neurograsp_native::session::SessionController;
use neurograsp_native::threshold::FileThreshold;

/// neurograsp BCI actuator bridge
#[derive(Parser, Debug)]
#[command(name = "neurograsp")]
#[command(author, version, about = "Mental-command to robotic-arm bridge", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file (defaults to ./neurograsp.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a live session against the streaming source
    Live {
        /// Profile to load or create
        #[arg(short, long)]
        profile: Option<String>,

        /// Headset id
        #[arg(short, long)]
        device: Option<String>,

        /// Actuator serial port (e.g., /dev/ttyACM0 or COM3)
        #[arg(long)]
        port: Option<String>,

        /// Skip the reset handshake after opening the port
        #[arg(long)]
        no_reset: bool,
    },

    /// Return the arm to its neutral pose
    Reset {
        /// Actuator serial port
        #[arg(long)]
        port: Option<String>,
    },

    /// Close the gripper once
    Grab {
        /// Actuator serial port
        #[arg(long)]
        port: Option<String>,
    },

    /// Read or change the power threshold of a running session
    Threshold {
        #[command(subcommand)]
        action: ThresholdCommand,
    },

    /// List available serial ports
    Devices,
}

#[derive(Subcommand, Debug)]
enum ThresholdCommand {
    /// Print the current threshold
    Show,
    /// Set an exact threshold between 0 and 1
    Set {
        /// New threshold
        value: f64,
    },
    /// Apply a named preset
    Preset {
        /// very-sensitive, sensitive, balanced or less-sensitive
        name: String,
    },
    /// Explain the threshold bands and presets
    Guide,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries session requests, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("neurograsp v{}", env!("CARGO_PKG_VERSION"));

    let mut overrides = HashMap::new();
    match &cli.command {
        Commands::Live {
            profile,
            device,
            port,
            ..
        } => {
            insert_override(&mut overrides, "profile", profile.as_deref());
            insert_override(&mut overrides, "device", device.as_deref());
            insert_override(&mut overrides, "port", port.as_deref());
        }
        Commands::Reset { port } | Commands::Grab { port } => {
            insert_override(&mut overrides, "port", port.as_deref());
        }
        Commands::Threshold { .. } | Commands::Devices => {}
    }

    let config = load_config(cli.config.as_deref(), Some(&overrides))?;

    match cli.command {
        Commands::Live { no_reset, .. } => run_live(&config, no_reset),
        Commands::Reset { .. } => send_once(&config, DeviceCommand::reset()),
        Commands::Grab { .. } => {
            let command = config.translator.translator()?.command().clone();
            send_once(&config, command)
        }
        Commands::Threshold { action } => run_threshold(&config, action),
        Commands::Devices => {
            list_devices();
            Ok(())
        }
    }
}

fn insert_override(overrides: &mut HashMap<String, String>, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        overrides.insert(key.to_string(), value.to_string());
    }
}

// ============================================================================
// Live Session
// ============================================================================

#[cfg(feature = "usb")]
fn open_link(
    config: &BridgeConfig,
) -> anyhow::Result<neurograsp_native::DeviceLink<neurograsp_native::bridge::SerialChannel>> {
    let port = config
        .actuator
        .port
        .as_deref()
        .context("No actuator port configured (use --port or NEUROGRASP_PORT)")?;

    let link = neurograsp_native::DeviceLink::open(port, config.actuator.baud_rate)?
        .with_read_timeout(config.actuator.read_timeout())
        .with_policy(config.actuator.retry_policy());
    Ok(link)
}

#[cfg(feature = "usb")]
fn run_live(config: &BridgeConfig, no_reset: bool) -> anyhow::Result<()> {
    use neurograsp_native::cortex::JsonLineClient;
    use neurograsp_native::ActuatorWorker;

    if config.session.profile.is_empty() {
        bail!("No profile configured (use --profile or NEUROGRASP_PROFILE)");
    }

    let mut link = open_link(config)?;
    if config.actuator.reset_on_connect && !no_reset {
        info!("Resetting arm on {}", link.address());
        link.confirm(&DeviceCommand::reset())?;
    }

    let worker = ActuatorWorker::spawn(link, config.actuator.queue_capacity)?;
    let mut controller = SessionController::new(
        JsonLineClient::new(std::io::stdout()),
        worker,
        config.threshold.source()?,
    )
    .with_translator(config.translator.translator()?)
    .with_sensitivity_plan(config.sensitivity.plan());

    controller.start(&config.session.profile, config.session.device.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(drive(&mut controller));
    // The stdin reader may still be parked on a blocking read
    rt.shutdown_background();

    let stats = controller.stats();
    let final_state = controller.state();
    let (_, worker) = controller.into_parts();
    let worker_stats = worker.shutdown();

    info!(
        "Session ended in {}: {} events, {} triggers, {} suppressed, {} dropped",
        final_state, stats.events, stats.triggers, stats.suppressed, stats.dispatch_failures
    );
    info!(
        "Actuator: {} confirmed, {} failed",
        worker_stats.confirmed, worker_stats.failed
    );

    outcome
}

#[cfg(not(feature = "usb"))]
fn run_live(_config: &BridgeConfig, _no_reset: bool) -> anyhow::Result<()> {
    bail!("Serial support not enabled. Rebuild with --features usb")
}

/// Feed stdin event lines to the controller until the stream ends, the
/// session reaches a terminal state, or the user interrupts.
async fn drive<C, S, T>(controller: &mut SessionController<C, S, T>) -> anyhow::Result<()>
where
    C: StreamingClient,
    S: CommandSink,
    T: ThresholdSource,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Event stream ended");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                match parse_event(&line) {
                    Ok(event) => controller.handle(event)?,
                    Err(e) => warn!("Skipping event line: {}", e),
                }

                if controller.state().is_terminal() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    Ok(())
}

// ============================================================================
// One-shot Commands
// ============================================================================

#[cfg(feature = "usb")]
fn send_once(config: &BridgeConfig, command: DeviceCommand) -> anyhow::Result<()> {
    let mut link = open_link(config)?;
    let confirmation = link.confirm(&command)?;
    info!(
        "Controller echoed {:?} after {} attempt(s)",
        confirmation.echo, confirmation.attempts
    );
    link.close();
    Ok(())
}

#[cfg(not(feature = "usb"))]
fn send_once(_config: &BridgeConfig, _command: DeviceCommand) -> anyhow::Result<()> {
    bail!("Serial support not enabled. Rebuild with --features usb")
}

fn run_threshold(config: &BridgeConfig, action: ThresholdCommand) -> anyhow::Result<()> {
    let threshold: FileThreshold = config.threshold.source()?;

    match action {
        ThresholdCommand::Show => {
            let current = match threshold.read() {
                Ok(value) => value,
                Err(e) => {
                    warn!("{}; showing fallback", e);
                    threshold.fallback()
                }
            };
            println!("{:.2} ({})", current.value(), current.band().describe());
        }
        ThresholdCommand::Set { value } => {
            let value = PowerThreshold::new(value)
                .with_context(|| format!("Threshold {value} must be between 0 and 1"))?;
            threshold.store(value)?;
            println!("{:.2} ({})", value.value(), value.band().describe());
        }
        ThresholdCommand::Preset { name } => {
            let Some(preset) = ThresholdPreset::from_name(&name) else {
                let names: Vec<&str> = ThresholdPreset::ALL.iter().map(|p| p.name()).collect();
                bail!("Unknown preset '{}', expected one of: {}", name, names.join(", "));
            };
            threshold.store(preset.threshold())?;
            println!("{} = {:.2}", preset.name(), preset.threshold().value());
        }
        ThresholdCommand::Guide => {
            println!("A lift triggers the arm when its power is above the threshold.");
            for (range, band) in [
                ("below 0.30", ThresholdBand::VerySensitive),
                ("0.30-0.59", ThresholdBand::Medium),
                ("0.60 and up", ThresholdBand::LessSensitive),
            ] {
                println!("  {:<12} {}", range, band.describe());
            }
            println!("Presets:");
            for preset in ThresholdPreset::ALL {
                println!("  {:<15} {:.2}", preset.name(), preset.threshold().value());
            }
        }
    }

    Ok(())
}

fn list_devices() {
    info!("Scanning for serial ports...");

    #[cfg(feature = "usb")]
    {
        let ports = neurograsp_native::bridge::SerialChannel::list_ports();
        if ports.is_empty() {
            info!("  (none found)");
        }
        for port in ports {
            info!("  {}", port);
        }
    }

    #[cfg(not(feature = "usb"))]
    warn!("Serial support not enabled. Rebuild with --features usb");
}
