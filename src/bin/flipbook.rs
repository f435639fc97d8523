use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "flipbook", version)]
struct Cli {
    /// Optional JSON settings file; flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the images as one looping GIF.
    Export(ExportArgs),
    /// Render a single composited frame as a PNG.
    Preview(PreviewArgs),
    /// Cycle through the frames at the playback rate, logging each one.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct Common {
    /// How each image is fitted to the canvas of the first image.
    #[arg(long, value_enum)]
    fit: Option<FitChoice>,

    /// Frames per second (1-30), shared by playback and export.
    #[arg(long)]
    fps: Option<u32>,

    /// Input images, in frame order.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    common: Common,

    /// Directory the GIF is written into.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    common: Common,

    /// Frame index (0-based).
    #[arg(long, default_value_t = 0)]
    frame: usize,

    /// Mix the previous frame in at the configured onion-skin opacity.
    #[arg(long)]
    onion: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    #[command(flatten)]
    common: Common,

    /// Number of full passes over the frames.
    #[arg(long, default_value_t = 1)]
    cycles: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FitChoice {
    Contain,
    Cover,
    Stretch,
}

impl From<FitChoice> for flipbook::FitPolicy {
    fn from(c: FitChoice) -> Self {
        match c {
            FitChoice::Contain => Self::Contain,
            FitChoice::Cover => Self::Cover,
            FitChoice::Stretch => Self::Stretch,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let base = match &cli.config {
        Some(path) => flipbook::FlipbookConfig::load(path)?,
        None => flipbook::FlipbookConfig::default(),
    };

    match cli.cmd {
        Command::Export(args) => cmd_export(base, args),
        Command::Preview(args) => cmd_preview(base, args),
        Command::Play(args) => cmd_play(base, args),
    }
}

fn open_session(
    mut config: flipbook::FlipbookConfig,
    common: &Common,
) -> anyhow::Result<(flipbook::Session, flipbook::FlipbookConfig)> {
    if let Some(fit) = common.fit {
        config.fit = fit.into();
    }
    if let Some(fps) = common.fps {
        config.fps = flipbook::PlaybackRate::new(fps)?;
    }

    let mut session = flipbook::Session::new(&config)?;
    let added = session
        .add_paths(&common.files)
        .context("load input images")?;
    for rejected in &added.rejected {
        eprintln!("skipped {rejected}");
    }
    Ok((session, config))
}

fn cmd_export(config: flipbook::FlipbookConfig, args: ExportArgs) -> anyhow::Result<()> {
    let (session, mut config) = open_session(config, &args.common)?;
    if let Some(dir) = args.out_dir {
        config.out_dir = dir;
    }

    let observer: flipbook::ProgressObserver = Arc::new(|pct| eprint!("\rexporting... {pct:>3}%"));
    let result = session.export(Some(observer));
    eprintln!();
    let artifact = result?;

    let path = artifact.save_in(&config.out_dir)?;
    eprintln!(
        "wrote {} ({} frames, {}x{}, {} bytes)",
        path.display(),
        artifact.frame_count,
        artifact.canvas.width,
        artifact.canvas.height,
        artifact.len()
    );
    Ok(())
}

fn cmd_preview(config: flipbook::FlipbookConfig, args: PreviewArgs) -> anyhow::Result<()> {
    let (session, config) = open_session(config, &args.common)?;
    let onion = args.onion.then_some(config.onion_opacity);
    let frame = session.preview(args.frame, onion)?;

    ensure_parent_dir(&args.out)?;
    frame
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_play(config: flipbook::FlipbookConfig, args: PlayArgs) -> anyhow::Result<()> {
    let (mut session, _) = open_session(config, &args.common)?;
    if !session.play() {
        anyhow::bail!("playback needs at least 2 frames");
    }

    let interval = session.playback().interval();
    let ticks = session.sequence().len() * args.cycles;
    for _ in 0..ticks {
        if let Some(frame) = session.sequence().current() {
            tracing::info!(
                index = session.sequence().current_index(),
                name = frame.name(),
                "frame"
            );
        }
        std::thread::sleep(interval);
        session.tick();
    }
    session.pause();
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}
