//! # Pad Teleop
//!
//! Teleoperate a robot with an 8BitDo gamepad.
//!
//! This application reads a gamepad through evdev, resolves its events into
//! SE(2) or SE(3) delta-pose commands and reports them at a fixed tick rate.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pad_teleop::config::{Config, ControlMode, RESET_INPUT};
use pad_teleop::controller::{CommandResolver, Se2Resolver, Se3Resolver};
use pad_teleop::error::TeleopError;
use pad_teleop::host::evdev::EvdevInputHost;
use pad_teleop::teleop::Teleop;

/// Name of the thread that blocks on the evdev device
const PUMP_THREAD_NAME: &str = "evdev-pump";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Control space, overrides `control.mode`
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// evdev node of the gamepad, overrides `device.path`
    #[arg(short, long)]
    device: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Se2,
    Se3,
}

impl From<ModeArg> for ControlMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Se2 => ControlMode::Se2,
            ModeArg::Se3 => ControlMode::Se3,
        }
    }
}

/// Main entry point for Pad Teleop
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and apply command-line overrides
///    - Set up logging (stdout, plus a file when `logging.file` is set)
///    - Open the gamepad and attach the resolver for the selected mode
///
/// 2. **Main Loop**
///    - Read the resolved command once per tick
///    - Reset the resolver when Start is pressed
///    - Log status every `status_interval_ticks`
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C or a lost gamepad ends the loop
///    - The subscription is released before exit
///
/// # Examples
///
/// ```bash
/// cargo run --release -- --mode se2 --config config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(mode) = args.mode {
        config.control.mode = mode.into();
    }
    if let Some(device) = args.device {
        config.device.path = device;
    }

    let _log_guard = init_logging(&args.log_level, &config.logging.file)?;
    info!("Pad Teleop v{} starting...", env!("CARGO_PKG_VERSION"));

    let host = Arc::new(EvdevInputHost::open(config.device_path())?);
    if config.device.grab {
        host.grab()?;
    }

    match config.control.mode {
        ControlMode::Se2 => {
            let resolver = Se2Resolver::from_config(&config.se2, &config.gripper)?;
            run(host, resolver, &config).await
        }
        ControlMode::Se3 => {
            let resolver = Se3Resolver::from_config(&config.se3, &config.gripper);
            run(host, resolver, &config).await
        }
    }
}

/// Drives one resolver until Ctrl+C or a device error.
async fn run<R: CommandResolver>(host: Arc<EvdevInputHost>, resolver: R, config: &Config) -> Result<()> {
    let teleop = Teleop::attach(Arc::clone(&host), config.device.index, resolver)?;
    info!("{}", teleop.describe());

    let reset_requested = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&reset_requested);
    teleop.add_callback(
        RESET_INPUT,
        Box::new(move || flag.store(true, Ordering::SeqCst)),
    );

    let mut pump_failed = spawn_pump(host)?;

    let mut ticker = interval(tick_period(config.control.tick_rate_hz));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Starting control loop at {}Hz", config.control.tick_rate_hz);
    info!("Press {} to reset, Ctrl+C to exit", RESET_INPUT);

    let mut tick_count: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if reset_requested.swap(false, Ordering::SeqCst) {
                    teleop.reset();
                    info!("Resolver reset");
                }

                let (command, gripper_closed) = teleop.advance();
                debug!("Command {:?}, gripper closed {}", command, gripper_closed);
                tick_count += 1;

                if tick_count % config.control.status_interval_ticks == 0 {
                    info!("Tick {}: command {:?}, gripper {}",
                        tick_count, command, if gripper_closed { "closed" } else { "open" });
                }
            }

            result = &mut pump_failed => {
                let err = result.unwrap_or_else(|_| {
                    TeleopError::Device("event pump stopped".to_string())
                });
                error!("Gamepad lost: {}", err);
                teleop.detach();
                return Err(err.into());
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total ticks: {}", tick_count);
                break;
            }
        }
    }

    teleop.detach();
    Ok(())
}

/// Pumps device events on a dedicated thread until the device fails.
///
/// The pump blocks in the kernel, so it runs on a plain thread that does not
/// hold the runtime open at shutdown.
fn spawn_pump(host: Arc<EvdevInputHost>) -> Result<oneshot::Receiver<TeleopError>> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name(PUMP_THREAD_NAME.to_string())
        .spawn(move || {
            let err = loop {
                match host.pump() {
                    Ok(count) => debug!("Dispatched {} gamepad events", count),
                    Err(e) => break e,
                }
            };
            // The loop may already be gone during shutdown
            let _ = tx.send(err);
        })
        .context("Failed to start event pump thread")?;
    Ok(rx)
}

fn tick_period(tick_rate_hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz.max(1)))
}

/// Installs the stdout subscriber and, if `file` is set, a non-blocking file layer.
///
/// The returned guard must live until exit so buffered lines are flushed.
fn init_logging(level: &str, file: &str) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = if file.is_empty() {
        (None, None)
    } else {
        let path = Path::new(file);
        let directory = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .with_context(|| format!("Log file path {} has no file name", file))?;
        std::fs::create_dir_all(directory)
            .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

        let appender = tracing_appender::rolling::never(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}
