use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use voice_orb_core::{
    FastrandJitter, FrameOutcome, FrameRecorder, JitterSource, ModeScript, OrbConfig, OrbEngine,
    OrbError, PixelCanvas, RecordingSettings, ShapeStyle, SurfaceSize,
};

fn main() -> voice_orb_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => run_render(args),
        Commands::Config { config } => print_config(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> voice_orb_core::Result<OrbConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading config");
            OrbConfig::load(path)
        }
        None => Ok(OrbConfig::default()),
    }
}

fn run_render(args: RenderArgs) -> voice_orb_core::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(size) = args.size {
        config.surface.size = size;
    }
    if let Some(dpr) = args.dpr {
        config.surface.device_pixel_ratio = dpr;
    }
    if let Some(style) = args.style {
        config.shape.style = style;
    }
    config.validate()?;

    if !args.fps.is_finite() || args.fps <= 0.0 {
        return Err(OrbError::config("--fps must be positive"));
    }

    let jitter: Box<dyn JitterSource> = match args.seed {
        Some(seed) => Box::new(FastrandJitter::with_seed(seed)),
        None => Box::new(FastrandJitter::new()),
    };
    let mut engine: OrbEngine<PixelCanvas> = OrbEngine::with_jitter(&config, jitter)?;
    let mut script = match args.script.as_deref() {
        Some(source) => ModeScript::parse(source)?,
        None => ModeScript::default(),
    };

    let mut recorder = FrameRecorder::new(RecordingSettings {
        output_dir: args.output.clone(),
        file_prefix: "orb".to_string(),
        every: args.every,
    });
    recorder.start()?;

    let size = SurfaceSize::square(config.surface.size, config.surface.device_pixel_ratio);
    engine.bind_surface(PixelCanvas::new(0, 0), size);

    tracing::info!(
        frames = args.frames,
        fps = args.fps,
        style = ?config.shape.style,
        output = ?args.output,
        "rendering orb"
    );

    let dt = 1.0 / args.fps;
    for frame in 0..args.frames {
        for event in script.due(engine.parameters().elapsed_time) {
            engine.set_animation_mode(event.mode);
        }

        match engine.advance(dt) {
            FrameOutcome::Drawn { .. } => {
                if let Some(canvas) = engine.canvas() {
                    recorder.capture(canvas, frame)?;
                }
            }
            FrameOutcome::Cleared { .. } | FrameOutcome::Skipped { .. } => {}
            FrameOutcome::Ignored => break,
        }
    }

    recorder.stop()?;
    engine.teardown();
    tracing::info!(written = recorder.frames_written(), "render finished");
    Ok(())
}

fn print_config(path: Option<&Path>) -> voice_orb_core::Result<()> {
    let config = load_config(path)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Voice agent orb renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the orb offline to a sequence of PNG frames.
    Render(RenderArgs),
    /// Print the effective configuration as JSON.
    Config {
        /// Optional config file to merge over the defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Optional JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Logical edge length of the square surface.
    #[arg(long)]
    size: Option<f32>,
    /// Device pixel ratio.
    #[arg(long)]
    dpr: Option<f32>,
    /// Shape style: `noise` or `waveform`.
    #[arg(long)]
    style: Option<ShapeStyle>,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 180)]
    frames: u64,
    #[arg(long, default_value_t = 60.0)]
    fps: f32,
    /// Mode changes on the animation clock, e.g. `0:idle,1.5:listening,3:speaking`.
    #[arg(long)]
    script: Option<String>,
    /// Seed for the speaking jitter.
    #[arg(long)]
    seed: Option<u64>,
    /// Directory the frames are written to.
    #[arg(short, long, default_value = "frames")]
    output: PathBuf,
    /// Keep one frame out of every N.
    #[arg(long, default_value_t = 1)]
    every: u32,
}
