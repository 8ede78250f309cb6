/*
[INPUT]:  CLI arguments, optional YAML configuration file, OS shutdown signals
[OUTPUT]: One image uploaded, processed, and its download URL printed
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use imgpress_adapter::{ImageClient, ImageUpload};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use imgpress_orchestrator::upload::{read_upload, validate_upload};
use imgpress_orchestrator::{AppConfig, OptionsForm, ProcessState, Session, StateView};

#[derive(Parser, Debug)]
#[command(name = "imgpress", version, about = "Upload an image, then compress and resize it remotely")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Overrides service.base_url from the config file
    #[arg(long = "base-url", value_name = "URL")]
    base_url: Option<String>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    /// Validate config and file, then exit without network I/O
    #[arg(long = "dry-run")]
    dry_run: bool,

    #[arg(value_name = "IMAGE")]
    image: PathBuf,
    /// Compression quality, 1-100
    #[arg(long)]
    quality: Option<u8>,
    #[arg(long)]
    width: Option<u32>,
    /// Only editable with the aspect lock off
    #[arg(long, requires = "no_keep_aspect_ratio")]
    height: Option<u32>,
    #[arg(long = "no-keep-aspect-ratio")]
    no_keep_aspect_ratio: bool,
    /// Fit inside a bounding box, keeping the aspect ratio
    #[arg(long = "max-width", conflicts_with_all = ["width", "height", "no_keep_aspect_ratio"])]
    max_width: Option<u32>,
    #[arg(long = "max-height", conflicts_with_all = ["width", "height", "no_keep_aspect_ratio"])]
    max_height: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    info!(
        image = %args.image.display(),
        dry_run = args.dry_run,
        "starting imgpress"
    );

    let mut config = load_config(args.config_path.as_deref())?;
    if let Some(base_url) = &args.base_url {
        config.service.base_url = base_url.clone();
    }
    config.validate().context("invalid configuration")?;
    info!(base_url = %config.service.base_url, "configuration loaded");

    let upload = read_upload(&args.image)
        .await
        .with_context(|| format!("read image {}", args.image.display()))?;
    let mime = validate_upload(&upload).context("image rejected")?;
    info!(file_name = %upload.file_name, size = upload.size(), %mime, "image accepted");

    if args.dry_run {
        info!("dry-run requested; configuration and image validated");
        return Ok(());
    }

    let client = ImageClient::with_config(config.client_config(), &config.service.base_url)
        .context("build http client")?;
    let session = Session::from_config(Arc::new(client), &config);

    tokio::spawn(log_transitions("upload", session.upload().subscribe()));
    tokio::spawn(log_transitions("process", session.process().subscribe()));

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    tokio::select! {
        outcome = run(&session, upload, &args) => outcome,
        _ = shutdown.cancelled() => {
            info!("shutdown signal received");
            session.reset();
            info!("session reset; exiting");
            Ok(())
        }
    }
}

async fn run(session: &Session<ImageClient>, upload: ImageUpload, args: &Cli) -> Result<()> {
    session.start_upload(upload).context("start upload")?;
    let state = session.wait_for_upload().await;
    if let Some(failure) = state.failure() {
        bail!("upload failed ({}): {}", failure.kind.as_str(), failure.message);
    }
    let image = session
        .uploaded_image()
        .context("upload finished without an image")?;
    println!(
        "uploaded {} as {} ({}x{}, {})",
        image.original_name,
        image.id,
        image.width,
        image.height,
        format_file_size(image.file_size)
    );

    let mut form = session.options_form().context("prepare processing options")?;
    apply_options(&mut form, args)?;
    let options = form.build();
    session
        .start_processing(&options)
        .context("start processing")?;

    match session.wait_for_processing().await {
        ProcessState::Succeeded(result) => {
            println!(
                "processed {} -> {} ({}x{}, {}, {:.1}% smaller)",
                image.id,
                result.processed_id,
                result.processed_width,
                result.processed_height,
                format_file_size(result.processed_size),
                result.compression_ratio
            );
        }
        ProcessState::Failed(failure) => {
            bail!("processing failed ({}): {}", failure.kind.as_str(), failure.message);
        }
        other => bail!("processing stopped while {}", other.name()),
    }

    if let Some(url) = session.download_url().context("resolve download url")? {
        println!("download: {url}");
    }
    Ok(())
}

fn apply_options(form: &mut OptionsForm, args: &Cli) -> Result<()> {
    if let Some(quality) = args.quality {
        form.set_quality(quality).context("--quality")?;
    }
    if args.no_keep_aspect_ratio {
        form.set_keep_aspect_ratio(false);
    }
    if args.max_width.is_some() || args.max_height.is_some() {
        form.fit_within(
            args.max_width.unwrap_or(u32::MAX),
            args.max_height.unwrap_or(u32::MAX),
        )
        .context("--max-width/--max-height")?;
    }
    if let Some(width) = args.width {
        form.set_width(width).context("--width")?;
    }
    if let Some(height) = args.height {
        form.set_height(height).context("--height")?;
    }
    info!(
        quality = form.quality(),
        width = form.width(),
        height = form.height(),
        keep_aspect_ratio = form.keep_aspect_ratio(),
        "processing options"
    );
    Ok(())
}

async fn log_transitions<T>(label: &'static str, mut rx: watch::Receiver<T>)
where
    T: StateView + Send + Sync + 'static,
{
    while rx.changed().await.is_ok() {
        let (state, progress, failure) = {
            let current = rx.borrow_and_update();
            (current.name(), current.progress(), current.failure().cloned())
        };
        match failure {
            Some(failure) => warn!(
                task = label,
                state,
                kind = failure.kind.as_str(),
                message = %failure.message,
                "task failed"
            ),
            None => info!(task = label, state, progress, "task progress"),
        }
    }
}

fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path).context("load config"),
        None => Ok(AppConfig::default()),
    }
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
