use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use paths::config::{self, SamplerKind, SceneConfig};
use paths::dists::{self, Dists, SampleCounts};
use paths::image::ExportFormat;
use paths::plot::{self, PlotOptions};
use paths::random::Lcg48;
use paths::{bench, random};

#[derive(Parser)]
#[command(name = "paths")]
#[command(about = "Monte-Carlo path tracer and sampling tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the random number primitives into a dists file
    Dists {
        #[arg(long, short, default_value = dists::DEFAULT_FILE_NAME)]
        output: PathBuf,
        /// Uniform pairs
        #[arg(long)]
        uniform: Option<usize>,
        /// Normal pairs per generator
        #[arg(long)]
        normal: Option<usize>,
        /// Unit vectors
        #[arg(long)]
        sphere: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Plot the histograms and unit sphere of a dists file
    Plot {
        #[arg(long, short, default_value = dists::DEFAULT_FILE_NAME)]
        input: PathBuf,
        #[arg(long, short, default_value = "dists.png")]
        output: PathBuf,
        #[arg(long, default_value_t = plot::DEFAULT_BINS)]
        bins: usize,
        /// Skip captions and axis labels
        #[arg(long)]
        no_labels: bool,
    },
    /// Measure sampler throughput
    Bench {
        #[arg(long, short = 'n', default_value_t = 10_000_000)]
        iterations: u64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
    },
    /// Render a JSON scene, `-` reads it from stdin
    Render {
        scene: PathBuf,
        /// Overrides the output path of the scene
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, short)]
        format: Option<ExportFormat>,
        #[arg(long, short)]
        passes: Option<usize>,
        #[arg(long, value_enum)]
        sampler: Option<SamplerArg>,
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SamplerArg {
    Albedo,
    Pt,
    Whitted,
    Stat,
}

impl From<SamplerArg> for SamplerKind {
    fn from(arg: SamplerArg) -> SamplerKind {
        return match arg {
            SamplerArg::Albedo => SamplerKind::Albedo,
            SamplerArg::Pt => SamplerKind::Pt,
            SamplerArg::Whitted => SamplerKind::Whitted,
            SamplerArg::Stat => SamplerKind::Stat,
        };
    }
}

fn sample_dists(
    output: PathBuf,
    uniform: Option<usize>,
    normal: Option<usize>,
    sphere: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let defaults = SampleCounts::default();
    let counts = SampleCounts {
        uniform: uniform.unwrap_or(defaults.uniform),
        normal: normal.unwrap_or(defaults.normal),
        sphere: sphere.unwrap_or(defaults.sphere),
    };

    let dists = match seed {
        Some(seed) => Dists::sample(counts, &mut Lcg48::new(seed)),
        None => random::with_thread_engine(|rng| Dists::sample(counts, rng)),
    };
    dists
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), "dists written");
    return Ok(());
}

fn plot_dists(input: PathBuf, output: PathBuf, bins: usize, labels: bool) -> Result<()> {
    let dists = Dists::read(&input).with_context(|| format!("failed to read {}", input.display()))?;
    let options = PlotOptions {
        bins: bins,
        labels: labels,
        ..PlotOptions::default()
    };
    plot::render_dists(&dists, &output, options)
        .with_context(|| format!("failed to plot {}", output.display()))?;
    info!(path = %output.display(), "plot written");
    return Ok(());
}

fn run_bench(iterations: u64, seed: u64) {
    for result in bench::run(iterations, seed) {
        println!(
            "{:<24} {:>14.0} samples/s {:>8.2} ns/sample",
            result.name,
            result.per_second(),
            result.nanos_per_iteration()
        );
    }
}

struct RenderOverrides {
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
    passes: Option<usize>,
    sampler: Option<SamplerArg>,
    threads: Option<usize>,
    seed: Option<u64>,
}

fn render(scene_path: PathBuf, overrides: RenderOverrides) -> Result<()> {
    let mut scene = SceneConfig::load(&scene_path)
        .with_context(|| format!("failed to load scene {}", scene_path.display()))?;

    if let Some(output) = overrides.output {
        scene.output.path = output;
    }
    if let Some(format) = overrides.format {
        scene.output.format = Some(format);
    }
    if let Some(passes) = overrides.passes {
        scene.integrator.passes = passes;
    }
    if let Some(sampler) = overrides.sampler {
        scene.integrator.sampler = sampler.into();
    }
    if overrides.threads.is_some() {
        scene.integrator.threads = overrides.threads;
    }
    if overrides.seed.is_some() {
        scene.integrator.seed = overrides.seed;
    }

    let job = scene
        .build(&config::base_dir(&scene_path))
        .context("failed to build scene")?;
    info!(
        sampler = ?job.integrator.sampler,
        passes = job.integrator.passes,
        width = job.camera.resolution[0],
        height = job.camera.resolution[1],
        "rendering"
    );

    let mut integrator = job.run(true);
    let path = &job.output.path;
    integrator
        .image()
        .export(path, job.output.format())
        .with_context(|| format!("failed to export {}", path.display()))?;
    info!(path = %path.display(), format = %job.output.format(), "image written");
    return Ok(());
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Dists {
            output,
            uniform,
            normal,
            sphere,
            seed,
        } => sample_dists(output, uniform, normal, sphere, seed)?,
        Commands::Plot {
            input,
            output,
            bins,
            no_labels,
        } => plot_dists(input, output, bins, !no_labels)?,
        Commands::Bench { iterations, seed } => run_bench(iterations, seed),
        Commands::Render {
            scene,
            output,
            format,
            passes,
            sampler,
            threads,
            seed,
        } => render(
            scene,
            RenderOverrides {
                output: output,
                format: format,
                passes: passes,
                sampler: sampler,
                threads: threads,
                seed: seed,
            },
        )?,
    }
    return Ok(());
}
