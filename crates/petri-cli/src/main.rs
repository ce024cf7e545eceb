//! petri - command-line driver for the evolving-trait population simulator.

mod canvas;

use anyhow::{Context, Result};
use canvas::PngCanvas;
use clap::{ArgAction, Args, Parser, Subcommand};
use petri_core::render::{self, RenderOptions};
use petri_core::{EnvironmentPreset, PopulationSummary, SimConfig, Simulation, TraitSeed};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "petri")]
#[command(version)]
#[command(about = "Population simulator with heritable, mutating traits")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SimArgs {
    /// Configuration file (JSON); missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility; drawn at random when no config file
    /// is given
    #[arg(long)]
    seed: Option<u64>,

    /// Initial population size
    #[arg(short, long)]
    population: Option<usize>,

    /// Named environment: neutral, hot, acidic, toxic or scarce
    #[arg(long)]
    preset: Option<EnvironmentPreset>,

    /// Pin every seeded trait to its baseline instead of perturbing it
    #[arg(long)]
    balanced: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation and print its final summary as JSON
    Run {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of steps to simulate
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Print a summary line every N steps
        #[arg(long)]
        report_every: Option<u64>,

        /// Write the final snapshot to this file as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run several consecutive seeds and report how many populations survive
    Survey {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of runs; seeds are consecutive from the base seed
        #[arg(short, long, default_value = "20")]
        runs: u64,

        /// Steps per run
        #[arg(short, long, default_value = "500")]
        steps: u64,
    },

    /// Simulate for a number of steps and write the final frame as PNG
    Render {
        #[command(flatten)]
        sim: SimArgs,

        /// Steps to simulate before drawing
        #[arg(short, long, default_value = "200")]
        steps: u64,

        /// Output image path
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Pixels per world unit
        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// Hide the nutrient overlay
        #[arg(long)]
        no_nutrients: bool,

        /// Hide the toxicity overlay
        #[arg(long)]
        no_toxicity: bool,
    },
}

#[derive(Serialize)]
struct SurveyRun {
    seed: u64,
    survived: bool,
    summary: PopulationSummary,
}

#[derive(Serialize)]
struct SurveyReport {
    runs: Vec<SurveyRun>,
    survival_fraction: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            sim,
            steps,
            report_every,
            output,
        } => run(&sim, steps, report_every, output.as_deref()),
        Commands::Survey { sim, runs, steps } => survey(&sim, runs, steps),
        Commands::Render {
            sim,
            steps,
            output,
            scale,
            no_nutrients,
            no_toxicity,
        } => {
            let options = RenderOptions {
                show_nutrients: !no_nutrients,
                show_toxicity: !no_toxicity,
            };
            render_frame(&sim, steps, &output, scale, &options)
        }
    }
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

fn load_config(path: &Path) -> Result<SimConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn build_config(args: &SimArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig {
            seed: rand::random(),
            ..SimConfig::default()
        },
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(population) = args.population {
        config.seed_parameters.population = population;
    }
    if let Some(preset) = args.preset {
        config.parameters = preset.update().merged(&config.parameters);
    }
    if args.balanced {
        config.seed_parameters.traits = TraitSeed::balanced();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Start a simulation and step it until `steps` have run or the population
/// dies out.
fn simulate(
    config: SimConfig,
    steps: u64,
    mut on_step: impl FnMut(&Simulation),
) -> Result<Simulation> {
    let mut sim = Simulation::new(config).context("failed to build simulation")?;
    sim.start();
    for _ in 0..steps {
        if sim.population() == 0 {
            tracing::info!(generation = sim.generation(), "population is extinct");
            break;
        }
        sim.step();
        on_step(&sim);
    }
    Ok(sim)
}

fn run(
    args: &SimArgs,
    steps: u64,
    report_every: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let config = build_config(args)?;
    tracing::info!(seed = config.seed, steps, "starting run");
    let started = Instant::now();

    let sim = simulate(config, steps, |sim| {
        let Some(every) = report_every.filter(|&n| n > 0) else {
            return;
        };
        if sim.generation().is_multiple_of(every) {
            match serde_json::to_string(&sim.snapshot().summary()) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "failed to encode summary"),
            }
        }
    })?;

    let snapshot = sim.snapshot();
    tracing::info!(
        generation = snapshot.generation(),
        population = snapshot.population(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );
    println!("{}", serde_json::to_string_pretty(&snapshot.summary())?);

    if let Some(path) = output {
        let json = serde_json::to_string(&snapshot)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    }
    Ok(())
}

fn survey(args: &SimArgs, runs: u64, steps: u64) -> Result<()> {
    let base = build_config(args)?;
    tracing::info!(base_seed = base.seed, runs, steps, "starting survey");

    let mut results = Vec::new();
    for offset in 0..runs {
        let config = SimConfig {
            seed: base.seed.wrapping_add(offset),
            ..base.clone()
        };
        let seed = config.seed;
        let sim = simulate(config, steps, |_| {})?;
        let summary = sim.snapshot().summary();
        let survived = summary.population > 0;
        tracing::debug!(seed, survived, population = summary.population, "survey run done");
        results.push(SurveyRun {
            seed,
            survived,
            summary,
        });
    }

    let survivors = results.iter().filter(|r| r.survived).count();
    let report = SurveyReport {
        survival_fraction: if runs == 0 {
            0.0
        } else {
            survivors as f64 / runs as f64
        },
        runs: results,
    };
    tracing::info!(survivors, runs, "survey finished");
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn render_frame(
    args: &SimArgs,
    steps: u64,
    output: &Path,
    scale: f64,
    options: &RenderOptions,
) -> Result<()> {
    anyhow::ensure!(
        scale.is_finite() && scale > 0.0,
        "scale must be positive (got {scale})"
    );
    let config = build_config(args)?;
    let sim = simulate(config, steps, |_| {})?;
    let snapshot = sim.snapshot();

    let mut canvas = PngCanvas::new(sim.environment().extent(), scale);
    render::draw(&mut canvas, &snapshot, options);
    canvas.save(output)?;
    tracing::info!(
        path = %output.display(),
        width = canvas.width(),
        height = canvas.height(),
        generation = snapshot.generation(),
        population = snapshot.population(),
        "frame written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use petri_core::SimConfigError;

    fn args() -> SimArgs {
        SimArgs {
            config: None,
            seed: None,
            population: None,
            preset: None,
            balanced: false,
        }
    }

    #[test]
    fn flags_override_the_default_config() {
        let config = build_config(&SimArgs {
            seed: Some(9),
            population: Some(7),
            preset: Some(EnvironmentPreset::Hot),
            balanced: true,
            ..args()
        })
        .expect("valid overrides");
        assert_eq!(config.seed, 9);
        assert_eq!(config.seed_parameters.population, 7);
        assert_eq!(config.seed_parameters.traits, TraitSeed::balanced());
        assert_eq!(config.parameters.temperature, 85.0);
        assert_eq!(config.parameters.width, 800.0);
        assert_eq!(config.parameters.height, 600.0);
    }

    #[test]
    fn preset_keeps_the_extent_from_the_config_file() {
        let path = std::env::temp_dir().join(format!(
            "petri-cli-preset-{}.json",
            std::process::id()
        ));
        fs::write(&path, r#"{ "seed": 11, "parameters": { "width": 400.0 } }"#)
            .expect("write config");
        let result = build_config(&SimArgs {
            config: Some(path.clone()),
            preset: Some(EnvironmentPreset::Toxic),
            ..args()
        });
        let _ = fs::remove_file(&path);

        let config = result.expect("valid config file");
        assert_eq!(config.seed, 11);
        assert_eq!(config.parameters.width, 400.0);
        assert_eq!(config.parameters.height, 600.0);
        assert_eq!(config.parameters.toxicity, 3.0);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let path = std::env::temp_dir().join("petri-cli-no-such-config.json");
        let err = build_config(&SimArgs {
            config: Some(path),
            ..args()
        })
        .expect_err("missing file");
        assert!(err.to_string().contains("failed to read config"), "{err:#}");
    }

    #[test]
    fn oversized_population_is_rejected() {
        let err = build_config(&SimArgs {
            population: Some(SimConfig::MAX_INITIAL_POPULATION + 1),
            ..args()
        })
        .expect_err("too many agents");
        assert!(matches!(
            err.downcast_ref::<SimConfigError>(),
            Some(SimConfigError::TooManyAgents { .. })
        ));
    }

    #[test]
    fn command_line_parses_into_sim_args() {
        let cli = Cli::try_parse_from([
            "petri", "run", "--seed", "3", "--preset", "acidic", "--balanced", "-p", "12",
        ])
        .expect("valid command line");
        let Commands::Run { sim, steps, .. } = cli.command else {
            panic!("expected the run subcommand");
        };
        assert_eq!(steps, 1000);
        let config = build_config(&sim).expect("valid overrides");
        assert_eq!(config.seed, 3);
        assert_eq!(config.seed_parameters.population, 12);
        assert_eq!(config.parameters.ph, 3.5);

        assert!(Cli::try_parse_from(["petri", "run", "--preset", "lava"]).is_err());
    }
}
