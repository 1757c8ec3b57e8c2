use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nexuscontroller::broadcast::{server, Streamer, SubscriberSet};
use nexuscontroller::calibration::{CalibrationPreset, Calibrator, Feedback, Target};
use nexuscontroller::codec::FrameFormat;
use nexuscontroller::config::AppConfig;
use nexuscontroller::controller::{sniffer, DeviceSampler};
use nexuscontroller::mapping::{MappingProfile, NormalizationPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Config file (default: <config dir>/nexuscontroller/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mapping profile JSON
    #[arg(long, global = true)]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream the normalized controller state over websocket
    Serve(ServeArgs),
    /// Interactively build a mapping profile
    Calibrate(CalibrateArgs),
    /// Print raw device activity
    Sniff(SniffArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,
    #[arg(long, value_enum)]
    format: Option<FrameFormat>,
}

#[derive(Args, Debug)]
struct CalibrateArgs {
    #[arg(long, value_enum)]
    preset: Option<CalibrationPreset>,
    /// Where to write the profile (default: the configured profile path)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print the profile instead of writing it
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct SniffArgs {
    /// Axis values below this magnitude are not printed
    #[arg(long, default_value_t = sniffer::DEFAULT_NOISE_FLOOR)]
    noise: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).await?;
    if let Some(profile) = cli.profile {
        config.profile_path = profile;
    }

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    match cli.command {
        Command::Serve(args) => serve(config, args, cancel).await,
        Command::Calibrate(args) => calibrate(config, args, cancel).await,
        Command::Sniff(args) => sniff(args, cancel).await,
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
        }
        cancel.cancel();
    });
}

#[cfg(feature = "gilrs")]
fn open_sampler() -> Result<Box<dyn DeviceSampler>> {
    let sampler = nexuscontroller::controller::GilrsSampler::new()
        .map_err(|e| eyre!("Failed to initialize gamepad backend: {}", e))?;
    Ok(Box::new(sampler))
}

#[cfg(not(feature = "gilrs"))]
fn open_sampler() -> Result<Box<dyn DeviceSampler>> {
    warn!("Built without a gamepad backend, no device will ever connect");
    Ok(Box::new(nexuscontroller::controller::ScriptedSampler::empty()))
}

async fn serve(mut config: AppConfig, args: ServeArgs, cancel: CancellationToken) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(fps) = args.fps {
        config.stream.frame_rate = fps;
    }
    if let Some(format) = args.format {
        config.stream.frame_format = format;
    }

    let profile = MappingProfile::load_or_empty(&config.profile_path);
    let subscribers = SubscriberSet::new(config.server.subscriber_queue);

    let addr = config.server.socket_addr()?;
    let listener = server::bind(addr).await?;
    let server_handle = tokio::spawn(server::serve(
        listener,
        subscribers.clone(),
        cancel.clone(),
    ));

    // The device backend is not Send, so the loop stays on this task
    let streamer = Streamer::new(
        open_sampler()?,
        NormalizationPipeline::new(profile),
        subscribers,
        Some(config.stream.settings()),
    );
    streamer.run(cancel).await;

    server_handle
        .await
        .map_err(|e| eyre!("Websocket server task failed: {}", e))?;
    Ok(())
}

async fn calibrate(config: AppConfig, args: CalibrateArgs, cancel: CancellationToken) -> Result<()> {
    let mut calibration = config.calibration.clone();
    if let Some(preset) = args.preset {
        calibration.preset = preset;
    }
    let settings = calibration.settings();
    let device_index = config.stream.device_index;
    info!("Calibrating with {:?} preset", calibration.preset);

    let profile = tokio::task::spawn_blocking(move || -> Result<MappingProfile> {
        let mut observer = operator_observer();
        let finished = Calibrator::create(open_sampler()?, Some(settings), device_index)
            .attach()?
            .run(&cancel, &mut observer)?;
        finished
            .into_profile()
            .ok_or_else(|| eyre!("Calibration finished without a profile"))
    })
    .await
    .map_err(|e| eyre!("Calibration task failed: {}", e))??;

    let json = profile.to_json_pretty()?;
    if args.dry_run {
        println!("{}", json);
        return Ok(());
    }

    let output = args.output.unwrap_or(config.profile_path);
    profile
        .save(&output)
        .wrap_err_with(|| format!("Failed to write profile to {}", output.display()))?;
    println!("Profile written to {}", output.display());
    Ok(())
}

/// Prints operator-facing feedback, once per instruction
fn operator_observer() -> impl FnMut(&Feedback) {
    let mut settling: Option<Target> = None;

    move |feedback: &Feedback| match feedback {
        Feedback::Settling { target } => {
            if settling != Some(*target) {
                println!("{}", feedback);
                settling = Some(*target);
            }
        }
        Feedback::BaselineProgress { collected: 1, .. } => println!("{}", feedback),
        Feedback::BaselineProgress { .. } | Feedback::Holding { .. } | Feedback::Waiting => {
            debug!("{}", feedback)
        }
        _ => println!("{}", feedback),
    }
}

async fn sniff(args: SniffArgs, cancel: CancellationToken) -> Result<()> {
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut sampler = open_sampler()?;
        sniffer::run_sniffer(&mut sampler, args.noise, &cancel);
        Ok(())
    })
    .await
    .map_err(|e| eyre!("Sniffer task failed: {}", e))?
}
