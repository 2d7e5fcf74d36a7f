use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;

use raytracing::{
    renderer::{ExecutionStyle, RaytracerSettings, TerminationPolicy, DEFAULT_THROUGHPUT_CUTOFF},
    scene::test_scenes,
};
use raytracing_cpu::{CpuBackendSettings, FrameDriver};
use tracing::{info, warn};

mod output;

#[derive(Debug, clap::Parser)]
struct CommandLineArguments {
    #[arg(long, help = "Builtin test scene to render (see list-scenes)")]
    scene_name: Option<String>,

    #[arg(short, long, default_value = "scenes/output/output.png", help = "Output png path")]
    output: PathBuf,
    #[arg(long, default_value_t = 1.0, value_parser = parse_exposure, help = "Radiance mapped to full white")]
    exposure: f32,

    #[arg(long, default_value_t = 512, help = "Image width in pixels")]
    width: u32,
    #[arg(long, default_value_t = 512, help = "Image height in pixels")]
    height: u32,

    #[arg(short = 't', long, help = "CPU worker threads")]
    num_threads: Option<u32>,
    #[arg(short = 'd', long, help = "Maximum ray depth (bounces)")]
    ray_depth: Option<u32>,
    #[arg(short, long, help = "Samples per pixel")]
    spp: Option<u32>,
    #[arg(long, help = "Seed for a reproducible render")]
    seed: Option<u64>,

    #[arg(long, value_enum, help = "How low-throughput paths are ended")]
    termination: Option<TerminationArg>,
    #[arg(long, default_value_t = DEFAULT_THROUGHPUT_CUTOFF, help = "Throughput threshold for --termination cutoff")]
    cutoff: f32,
    #[arg(long, default_value_t = 3, help = "First bounce eligible for --termination roulette")]
    roulette_depth: u32,

    #[arg(long, action, help = "Trace whole paths each pass instead of one bounce")]
    full_path: bool,
    #[arg(long, help = "Stop after this many seconds, keeping the partial image")]
    time_limit: Option<f32>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum TerminationArg {
    Cutoff,
    Roulette,
    None,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    #[command(about = "List all builtin test scenes as JSON")]
    ListScenes,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli_args = CommandLineArguments::parse();

    if let Some(Command::ListScenes) = cli_args.command {
        let scenes: Vec<&str> = test_scenes::all_test_scenes()
            .iter()
            .map(|s| s.name)
            .collect();
        println!("{}", serde_json::to_string(&scenes)?);
        return Ok(());
    }

    let name = cli_args
        .scene_name
        .as_deref()
        .context("--scene-name is required (use list-scenes to see the options)")?;
    let scene_descriptor =
        test_scenes::find_test_scene(name).with_context(|| format!("no builtin scene named {name}"))?;
    let scene = (scene_descriptor.scene_func)().with_context(|| format!("failed to build scene {name}"))?;
    let raytracer_settings = apply_overrides((scene_descriptor.settings_func)(), &cli_args);

    let mut backend_settings = CpuBackendSettings::default();
    backend_settings.num_threads = cli_args.num_threads.unwrap_or(backend_settings.num_threads);

    let mut driver = FrameDriver::new(cli_args.width, cli_args.height, raytracer_settings, backend_settings)?;
    let time_limit = cli_args.time_limit.map(Duration::from_secs_f32);

    info!(
        scene = name,
        width = cli_args.width,
        height = cli_args.height,
        threads = backend_settings.num_threads,
        "starting render"
    );

    let start = Instant::now();
    let mut last_report = start;
    while !driver.is_complete() {
        driver.render_pass(&scene);

        if last_report.elapsed() >= Duration::from_secs(1) {
            info!(
                progress = format!("{:.1}%", driver.progress() * 100.0),
                passes = driver.passes_rendered(),
                "rendering"
            );
            last_report = Instant::now();
        }

        if time_limit.is_some_and(|limit| start.elapsed() >= limit) {
            warn!(progress = driver.progress(), "time limit reached, saving partial image");
            break;
        }
    }

    info!(
        elapsed = format!("{:.2}s", start.elapsed().as_secs_f32()),
        samples = driver.samples_completed(),
        "render finished"
    );

    output::save_png(
        &driver.get_buffer(),
        cli_args.exposure,
        driver.width(),
        driver.height(),
        &cli_args.output,
    )?;
    info!(path = %cli_args.output.display(), "saved output");
    Ok(())
}

fn parse_exposure(value: &str) -> Result<f32, String> {
    let exposure: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if exposure > 0.0 && exposure.is_finite() {
        Ok(exposure)
    } else {
        Err(format!("exposure must be a positive finite number, got {exposure}"))
    }
}

// command line values take precedence over the scene's own settings
fn apply_overrides(mut settings: RaytracerSettings, cli_args: &CommandLineArguments) -> RaytracerSettings {
    settings.max_ray_depth = cli_args.ray_depth.unwrap_or(settings.max_ray_depth);
    settings.samples_per_pixel = cli_args.spp.unwrap_or(settings.samples_per_pixel);
    settings.seed = cli_args.seed.or(settings.seed);

    if let Some(termination) = cli_args.termination {
        settings.termination = match termination {
            TerminationArg::Cutoff => TerminationPolicy::Cutoff { threshold: cli_args.cutoff },
            TerminationArg::Roulette => TerminationPolicy::RussianRoulette { min_depth: cli_args.roulette_depth },
            TerminationArg::None => TerminationPolicy::None,
        };
    }

    if cli_args.full_path {
        settings.execution = ExecutionStyle::FullPathPerPass;
    }
    settings
}
