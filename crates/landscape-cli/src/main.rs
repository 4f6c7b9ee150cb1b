use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use landscape_core::config::LandscapeConfig;
use landscape_core::nn::WeightSet;
use landscape_core::session::{FrameTimings, LandscapeSession, ManualClock, SystemClock};
use landscape_core::surface::SurfaceMesh;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const BENCHMARK_FRAMES: usize = 200;
const WARMUP_FRAMES: usize = 10;
const TARGET_FPS: f64 = 60.0;

#[derive(Parser)]
#[command(name = "neural-landscape")]
#[command(about = "Neural landscape: a 2-3-1 sigmoid network sampled as a height field")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the network at a single input point
    Eval {
        #[arg(long, allow_hyphen_values = true)]
        x1: f64,
        #[arg(long, allow_hyphen_values = true)]
        x2: f64,
        /// Path to a weight set (JSON). Defaults to the built-in configuration.
        #[arg(long)]
        weights: Option<PathBuf>,
    },
    /// Drive a session on a simulated clock and print the last frame
    Render {
        /// Path to config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Path to a starting weight set (JSON)
        #[arg(long)]
        weights: Option<PathBuf>,
        /// Number of frames to render
        #[arg(long, default_value_t = 1)]
        frames: usize,
        /// Simulated time between frames in milliseconds
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
        /// Run auto-perturbation while rendering
        #[arg(long)]
        auto: bool,
        /// Print every n-th vertex row and column
        #[arg(long, default_value_t = 2)]
        stride: usize,
        /// Output directory for weights, diagram and frame stats (optional)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run auto-perturbation against the wall clock
    Auto {
        /// Path to config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// How long to run
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
        /// Target frame rate of the render loop
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Time surface resampling at several grid sizes
    Benchmark,
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

#[derive(Serialize)]
struct RenderSummary<'a> {
    frames: usize,
    perturb_ticks: u64,
    weights: &'a WeightSet,
    last_frame: Option<FrameTimings>,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<LandscapeConfig> {
    let Some(path) = path else {
        return Ok(LandscapeConfig::default());
    };
    let file = File::open(path).context("failed to open config file")?;
    let config: LandscapeConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    config.validate().context("Config validation error")?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

fn load_weights(path: Option<&Path>) -> Result<WeightSet> {
    let Some(path) = path else {
        return Ok(WeightSet::default());
    };
    let file = File::open(path).context("failed to open weights file")?;
    let weights: WeightSet =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse weights")?;
    info!(path = %path.display(), "loaded weights");
    Ok(weights)
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<()> {
    let file = File::create(dir.join(name)).with_context(|| format!("failed to create {name}"))?;
    serde_json::to_writer_pretty(file, value).with_context(|| format!("failed to write {name}"))
}

fn run_render(
    config: LandscapeConfig,
    weights: WeightSet,
    frames: usize,
    frame_ms: u64,
    auto: bool,
    stride: usize,
    out: Option<PathBuf>,
) -> Result<()> {
    let clock = ManualClock::new();
    let mut session = LandscapeSession::try_new(config, weights, clock.clone())
        .context("failed to initialize session")?;
    session.open_view();
    if auto {
        session.start_auto()?;
    }

    let frame_step = Duration::from_millis(frame_ms);
    let mut last_frame = None;
    for _ in 0..frames {
        clock.advance(frame_step);
        session.poll();
        last_frame = session.render_frame();
    }

    print!("{}", session.mesh().render_ascii(stride));
    if let Some(frame) = &last_frame {
        println!(
            "frames={} ticks={} min={:.3} max={:.3} mean={:.3} sample={}us",
            frame.frame_index,
            session.perturb_ticks(),
            frame.stats.min_height,
            frame.stats.max_height,
            frame.stats.mean_height,
            frame.sample_us,
        );
    }

    if let Some(out_dir) = out {
        std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
        write_json(&out_dir, "weights.json", session.weights())?;
        write_json(&out_dir, "diagram.json", &session.diagram())?;
        let summary = RenderSummary {
            frames,
            perturb_ticks: session.perturb_ticks(),
            weights: session.weights(),
            last_frame,
        };
        write_json(&out_dir, "summary.json", &summary)?;
        println!("Results saved to {:?}", out_dir);
    }
    Ok(())
}

/// Wall-clock length of an `auto` run. Rejects negative, NaN and values too
/// large for a `Duration`.
fn auto_run_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .context("--seconds must be a non-negative duration that fits in a Duration")
}

fn run_auto(config: LandscapeConfig, seconds: f64, fps: u32) -> Result<()> {
    let run_for = auto_run_duration(seconds)?;
    let mut session = LandscapeSession::try_new(config, WeightSet::default(), SystemClock)
        .context("failed to initialize session")?;
    session.open_view();
    session.start_auto()?;

    let frame_budget = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
    let start = Instant::now();
    let mut last_report = start;
    while start.elapsed() < run_for {
        let frame_start = Instant::now();
        session.poll();
        if let Some(frame) = session.render_frame() {
            debug!(frame = frame.frame_index, sample_us = frame.sample_us, "frame");
            if last_report.elapsed() >= Duration::from_secs(1) {
                last_report = Instant::now();
                info!(
                    frames = frame.frame_index,
                    ticks = session.perturb_ticks(),
                    mean_height = frame.stats.mean_height,
                    "auto mode running"
                );
            }
        }
        if let Some(rest) = frame_budget.checked_sub(frame_start.elapsed()) {
            thread::sleep(rest);
        }
    }
    session.close_view();

    print!("{}", session.mesh().render_ascii(2));
    println!("{}", serde_json::to_string_pretty(session.weights())?);
    Ok(())
}

fn random_weights(rng: &mut ChaCha12Rng) -> WeightSet {
    WeightSet::from_weights((0..WeightSet::WEIGHT_COUNT).map(|_| rng.random_range(-3.0..=3.0)))
}

fn run_benchmark(segments: usize, seed: u64) -> Result<()> {
    let config = LandscapeConfig {
        grid_segments: segments,
        seed,
        ..LandscapeConfig::default()
    };
    config
        .validate()
        .context("Benchmark config validation error")?;

    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    let mut mesh = SurfaceMesh::new(&config);
    for _ in 0..WARMUP_FRAMES {
        mesh.resample(&random_weights(&mut rng));
    }

    let mut total_us = 0u64;
    for _ in 0..BENCHMARK_FRAMES {
        let weights = random_weights(&mut rng);
        let t0 = Instant::now();
        mesh.resample(&weights);
        total_us += t0.elapsed().as_micros() as u64;
    }

    let avg_us = total_us as f64 / BENCHMARK_FRAMES as f64;
    let budget_us = 1_000_000.0 / TARGET_FPS;
    let vertices = mesh.vertices().len();
    println!("--- {segments}x{segments} segments ({vertices} vertices) ---");
    println!(
        "  Avg resample:  {avg_us:.1} us ({:.1}% of a {TARGET_FPS} fps frame)",
        avg_us / budget_us * 100.0
    );
    println!();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = LandscapeConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Eval { x1, x2, weights } => {
            let weights = load_weights(weights.as_deref())?;
            let hidden = weights.hidden_activations(x1, x2);
            let output = weights.forward(x1, x2);
            println!(
                "hidden=[{:.4}, {:.4}, {:.4}] output={:.4}",
                hidden[0], hidden[1], hidden[2], output
            );
        }
        Commands::Render {
            config,
            weights,
            frames,
            frame_ms,
            auto,
            stride,
            out,
        } => {
            let config = load_config(config.as_deref())?;
            let weights = load_weights(weights.as_deref())?;
            run_render(config, weights, frames, frame_ms, auto, stride, out)?;
        }
        Commands::Auto {
            config,
            seconds,
            fps,
        } => {
            let config = load_config(config.as_deref())?;
            run_auto(config, seconds, fps)?;
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p landscape-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Neural Landscape Resample Benchmark ===");
            println!("Warmup: {WARMUP_FRAMES} frames, Benchmark: {BENCHMARK_FRAMES} frames");
            println!();
            for segments in [25, 50, 100, 200] {
                run_benchmark(segments, 42)?;
            }
        }
    }
    Ok(())
}
