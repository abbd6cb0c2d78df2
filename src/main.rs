use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use agro_scan_client::config;
use agro_scan_client::workflow::{BackendClient, Orchestrator, TreatmentInfo};

#[derive(Parser)]
#[command(name = "agro-scan", version, about = "Detect plant leaf diseases via the Agro Scan service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a leaf image file for disease detection
    Predict {
        /// Path to the leaf image
        image: PathBuf,
        /// Also fetch the treatment summary for the detected condition
        #[arg(long)]
        know_more: bool,
    },
    /// Capture a leaf photo from the webcam and submit it
    Camera {
        /// Camera device index (defaults to the configured one)
        #[arg(long)]
        device: Option<u32>,
        /// Also fetch the treatment summary for the detected condition
        #[arg(long)]
        know_more: bool,
    },
    /// Manage the client configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Reset the configuration to defaults
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;

    env_logger::Builder::from_default_env()
        .filter_level(cfg.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    match cli.command {
        Command::Predict { image, know_more } => {
            let mut orchestrator = build_orchestrator(&cfg)?;
            orchestrator
                .select_file(&image.to_string_lossy())
                .await
                .context("failed to read image")?;
            run_prediction(&mut orchestrator, know_more).await
        }
        Command::Camera { device, know_more } => {
            let asset = capture_from_camera(&cfg, device)?;
            let mut orchestrator = build_orchestrator(&cfg)?;
            orchestrator.adopt_capture(asset);
            run_prediction(&mut orchestrator, know_more).await
        }
        Command::Config { action } => run_config(action),
    }
}

fn build_orchestrator(cfg: &config::Config) -> anyhow::Result<Orchestrator> {
    let client = BackendClient::new(cfg).context("failed to build backend client")?;
    Ok(Orchestrator::new(Arc::new(client)))
}

async fn run_prediction(orchestrator: &mut Orchestrator, know_more: bool) -> anyhow::Result<()> {
    let result = orchestrator
        .predict()
        .await
        .context("prediction request failed")?;

    println!("Detected condition: {}", result.label);
    println!("Annotated image:    {}", result.annotated_image_ref);

    if know_more {
        if orchestrator.fetch_treatment().await.is_err() {
            log::warn!("Treatment lookup failed, showing fallback message");
        }
        match orchestrator.treatment() {
            TreatmentInfo::Ready(summary) | TreatmentInfo::Failed(summary) => {
                println!("\nTreatment & solution:\n{}", summary);
            }
            TreatmentInfo::Absent | TreatmentInfo::Pending => {}
        }
    }

    Ok(())
}

#[cfg(feature = "webcam")]
fn capture_from_camera(
    cfg: &config::Config,
    device: Option<u32>,
) -> anyhow::Result<agro_scan_client::ImageAsset> {
    use agro_scan_client::device::NokhwaBackend;
    use agro_scan_client::{CameraSession, FacingMode, StreamConstraints};

    let facing = if cfg.preferred_facing == "user" {
        FacingMode::User
    } else {
        FacingMode::Environment
    };
    let index = device.unwrap_or(cfg.camera_index);

    let mut session = CameraSession::new(NokhwaBackend::new(index), cfg.capture_quality);
    session
        .open(&StreamConstraints::preferred(
            cfg.ideal_width,
            cfg.ideal_height,
            facing,
        ))
        .map_err(|e| describe_device_error(e))?;

    let asset = session.capture().map_err(|e| describe_device_error(e))?;
    println!("Captured {}", asset.file_name());
    Ok(asset)
}

#[cfg(not(feature = "webcam"))]
fn capture_from_camera(
    _cfg: &config::Config,
    _device: Option<u32>,
) -> anyhow::Result<agro_scan_client::ImageAsset> {
    anyhow::bail!("camera support is not compiled in; rebuild with --features webcam")
}

#[cfg(feature = "webcam")]
fn describe_device_error(e: agro_scan_client::AppError) -> anyhow::Error {
    if e.is_device() {
        anyhow::anyhow!("{}. Check that a camera is connected and not in use, and that this application has permission to access it.", e)
    } else {
        anyhow::Error::new(e)
    }
}

fn run_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config::load_config()?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        ConfigAction::Path => {
            println!("{}", config::get_config_path()?.display());
        }
        ConfigAction::Reset => {
            config::reset_config()?;
            println!("Configuration reset to defaults");
        }
    }
    Ok(())
}
