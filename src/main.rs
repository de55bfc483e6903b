//! Command-line front end: load one image, run filters through the background
//! processor, and write each result next to the others as PNG.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser};
use rust_image_filters::config::Configuration;
use rust_image_filters::events::{ImageAvailable, ProcessorCommand, ProcessorEvent};
use rust_image_filters::tasks::{loader, processor};
use rust_image_filters::{FilterEngine, FilterId};
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(
    name = "image-filters",
    version,
    about = "Apply convolution, blur, greyscale and ripple filters to an image"
)]
struct Cli {
    /// Image to filter
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Path to YAML config with blur/ripple parameters
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Filter to apply (repeatable); every filter when omitted
    #[arg(short, long = "filter", value_name = "NAME")]
    filters: Vec<FilterId>,

    /// Directory receiving `<stem>-<filter>.png`
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rust_image_filters={level}").parse()?)
        .add_directive(format!("image_filters={level}").parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("invalid configuration values")?;

    let filters = if cli.filters.is_empty() {
        FilterId::ALL.to_vec()
    } else {
        cli.filters.clone()
    };
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;

    let cancel = CancellationToken::new();
    let (cmd_tx, cmd_rx) = mpsc::channel(cfg.processor.command_queue);
    let (event_tx, mut event_rx) = mpsc::channel(cfg.processor.event_queue);
    let worker = tokio::spawn(processor::run(
        cmd_rx,
        event_tx,
        cancel.clone(),
        FilterEngine::new(cfg.filters),
    ));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted; stopping");
                cancel.cancel();
            }
        });
    }

    let stem = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string();

    cmd_tx.send(ProcessorCommand::Load(cli.input.clone())).await?;
    let loaded = next_image(&mut event_rx, &cancel)
        .await
        .with_context(|| format!("failed to load {}", cli.input.display()))?;
    info!(
        width = loaded.image.width(),
        height = loaded.image.height(),
        elapsed_ms = loaded.elapsed.as_millis() as u64,
        "loaded {}",
        cli.input.display()
    );

    // One request at a time: the processor only delivers the newest result.
    for filter in filters {
        cmd_tx.send(ProcessorCommand::Apply(filter)).await?;
        let result = next_image(&mut event_rx, &cancel)
            .await
            .with_context(|| format!("filter {filter} failed"))?;
        let target = cli.out_dir.join(format!("{stem}-{filter}.png"));
        save(target.clone(), result.clone()).await?;
        info!(
            %filter,
            elapsed_ms = result.elapsed.as_secs_f64() * 1000.0,
            "wrote {}",
            target.display()
        );
    }

    drop(cmd_tx);
    worker.await??;
    Ok(())
}

async fn next_image(
    events: &mut mpsc::Receiver<ProcessorEvent>,
    cancel: &CancellationToken,
) -> Result<ImageAvailable> {
    select! {
        _ = cancel.cancelled() => bail!("cancelled"),
        event = events.recv() => match event {
            Some(ProcessorEvent::ImageAvailable(image)) => Ok(image),
            Some(ProcessorEvent::Failed(failure)) => Err(anyhow!(failure.reason)),
            None => bail!("processor stopped unexpectedly"),
        },
    }
}

async fn save(path: PathBuf, image: ImageAvailable) -> Result<()> {
    tokio::task::spawn_blocking(move || write_png(&path, &image))
        .await
        .context("save task failed")?
}

fn write_png(path: &Path, image: &ImageAvailable) -> Result<()> {
    loader::save_rgba8(path, &image.image)
        .with_context(|| format!("failed to write {}", path.display()))
}
