use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use montage::{
    ClipId, ClipSpec, ClipStyle, EngineEvent, FontWeight, Frame, LayerId, Position, Rgba8,
    Session, SessionConfig, TextAlign, TransitionSpec,
};

#[derive(Parser, Debug)]
#[command(name = "montage", version)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print probed metadata of media locators as JSON.
    Info(InfoArgs),
    /// Render one frame of the slideshow as a PNG.
    Frame(FrameArgs),
    /// Play the slideshow in real time and report how many frames were presented.
    Play(PlayArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Media locators (files or `synthetic:` descriptions).
    #[arg(required = true)]
    media: Vec<String>,
}

#[derive(Parser, Debug)]
struct ShowArgs {
    /// Media locators played back to back.
    #[arg(required = true)]
    media: Vec<String>,

    /// Session config JSON; defaults to a 1080x1920 portrait display.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font for the filename captions.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Crossfade in/out duration in seconds.
    #[arg(long, default_value_t = 1.0)]
    fade: f64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    show: ShowArgs,

    /// Timeline time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    #[command(flatten)]
    show: ShowArgs,

    /// Give up after this many seconds of wall-clock time.
    #[arg(long)]
    timeout: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let session = Session::with_default_backend(SessionConfig::default())?;
    let mut assets = Vec::with_capacity(args.media.len());
    for (locator, id) in args.media.iter().zip(session.register_media_all(&args.media)) {
        let id = id.with_context(|| format!("register '{locator}'"))?;
        assets.push(session.media(id)?);
    }
    println!("{}", serde_json::to_string_pretty(&assets)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = build_slideshow(&args.show)?;
    let frame = session.render_at(args.time)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let session = Arc::new(build_slideshow(&args.show)?);
    let events = session.subscribe();
    let duration = session.duration();
    let timeout = Duration::from_secs_f64(args.timeout.unwrap_or(duration + 5.0).max(0.0));

    let presented = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&presented);
    let handle = session.spawn_playback(move |_: &Frame| {
        counter.fetch_add(1, Ordering::Relaxed);
    })?;
    handle.play()?;

    let deadline = Instant::now() + timeout;
    let mut started = false;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(EngineEvent::PlayingStateChanged { is_playing: true }) => started = true,
            Ok(EngineEvent::PlayingStateChanged { is_playing: false }) if started => break,
            Ok(EngineEvent::DecodeFailed { asset, time }) => {
                eprintln!("decode failed for {asset} at {time:.3}s");
            }
            Ok(_) => {}
            Err(_) => {
                eprintln!("timed out after {:.1}s", timeout.as_secs_f64());
                break;
            }
        }
    }
    handle.shutdown();

    eprintln!(
        "played {duration:.2}s, presented {} frames",
        presented.load(Ordering::Relaxed)
    );
    Ok(())
}

/// Media clips back to back on one layer with crossfades, and a caption layer above showing
/// each clip's filename.
fn build_slideshow(args: &ShowArgs) -> anyhow::Result<Session> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::from_path(path)?,
        None => portrait_config(),
    };
    config.apply_env_overrides()?;
    let session = Session::with_default_backend(config)?;

    if let Some(path) = &args.font {
        let bytes = read_file(path)?;
        session.set_font(FontWeight::Bold, bytes)?;
    }

    let video = session.create_layer()?;
    let captions = session.create_layer()?;
    let width = f64::from(config.display.width);
    let height = f64::from(config.display.height);
    let caption_style = ClipStyle {
        font_size: 64.0,
        color: Rgba8::WHITE,
        font_weight: FontWeight::Bold,
        background: Some(Rgba8::BLACK),
        corner_radii: [20.0; 4],
        position: Some(Position::Pixels {
            x: width / 2.0,
            y: height * 0.8,
        }),
        word_wrap_width: Some(width * 0.9),
        text_align: TextAlign::Center,
        padding: 16.0,
        ..ClipStyle::default()
    };

    let mut previous = None;
    for (locator, id) in args.media.iter().zip(session.register_media_all(&args.media)) {
        let asset = session.media(id.with_context(|| format!("register '{locator}'"))?)?;
        let clip = session.add_clip(video, ClipSpec::media(asset.id))?;
        let (_, placed) = session.clip(clip)?;
        session.add_clip(
            captions,
            ClipSpec::text(asset.filename.clone())
                .at(placed.start)
                .lasting(placed.duration)
                .styled(caption_style.clone()),
        )?;
        if let Some(prev) = previous {
            crossfade(&session, video, prev, clip, args.fade);
        }
        previous = Some(clip);
    }
    Ok(session)
}

fn crossfade(session: &Session, layer: LayerId, from: ClipId, to: ClipId, d: f64) {
    if let Err(e) = session.add_transition(layer, TransitionSpec::new(from, to, d, d)) {
        tracing::warn!(error = %e, %from, %to, "skipping crossfade");
    }
}

fn portrait_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.display.width = 1080;
    config.display.height = 1920;
    config
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read '{}'", path.display()))
}
