//! CLI entry point for Destro Sim

use clap::{Args, Parser, Subcommand, ValueEnum};
use destro_sim_lib::{
    batch::{self, SweepOptions, SweepStat},
    config::secs,
    load_rotation, Error, Registry, Result, SimConfig, SimParams, Simulator, Stats,
};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Fight length used by `--log-combat`.
const COMBAT_LOG_SECONDS: f64 = 60.0;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "destro-sim")]
#[command(version)]
#[command(about = "Discrete-event DPS simulator for a destruction warlock", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate the configured fight and print a report
    Run(RunArgs),
    /// Load and compile a rotation document
    Validate {
        /// Path to the rotation document
        #[arg(short, long)]
        rotation: PathBuf,
    },
    /// Estimate stat weights by central difference
    Weights(WeightsArgs),
    /// Sweep one stat across a range and write a CSV curve
    Sweep(SweepArgs),
    /// Print the known spell/buff/debuff/resource/item names as JSON
    Registry,
}

/// Options shared by every command that runs the simulator.
#[derive(Args, Debug)]
struct SimArgs {
    /// Path to the configuration file (YAML or JSON)
    #[arg(short, long, default_value = "configs/player.yaml")]
    config: PathBuf,

    /// Rotation document; defaults to the one named in the config
    #[arg(short, long)]
    rotation: Option<PathBuf>,

    /// Iterations per run (overrides the config)
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Base RNG seed (overrides the config; random when neither is set)
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    sim: SimArgs,

    /// Spread iterations across all cores
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Print a combat log of a single 60 s iteration
    #[arg(long, default_value = "false")]
    log_combat: bool,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,
}

#[derive(Args, Debug)]
struct WeightsArgs {
    #[command(flatten)]
    sim: SimArgs,

    /// Worker threads (0 = all cores)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Show plus/minus DPS columns
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct SweepArgs {
    #[command(flatten)]
    sim: SimArgs,

    /// Stat to sweep (crit|haste|sp)
    #[arg(long)]
    stat: String,

    /// Sweep start (percent for crit/haste, raw for spell power)
    #[arg(long)]
    start: Option<f64>,

    /// Sweep stop (inclusive)
    #[arg(long)]
    stop: Option<f64>,

    /// Sweep step
    #[arg(long)]
    step: Option<f64>,

    /// Seeds averaged per sweep point
    #[arg(long, default_value = "1")]
    avg_seeds: usize,

    /// Worker threads (0 = all cores)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Leave out the dps_per_point column
    #[arg(long, default_value = "false")]
    no_deltas: bool,

    /// Directory for the CSV output
    #[arg(long, default_value = "output/stat_curves")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Run(args) => run(args),
        Command::Validate { rotation } => validate(rotation),
        Command::Weights(args) => weights(args),
        Command::Sweep(args) => sweep(args),
        Command::Registry => print_json(&Registry::global().summary()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load config and rotation and build a simulator with the CLI overrides.
fn build(
    args: &SimArgs,
    adjust: impl FnOnce(&mut SimParams),
    log: Option<Box<dyn Write + Send>>,
) -> Result<(Simulator, Stats)> {
    let config = SimConfig::from_file(&args.config)?;
    let rotation_path = args.rotation.clone().unwrap_or_else(|| config.rotation_path());
    let rotation = load_rotation(&rotation_path)?;
    info!(
        config = %args.config.display(),
        rotation = %rotation_path.display(),
        "loaded inputs"
    );

    let mut params = SimParams::from_config(&config);
    if let Some(iterations) = args.iterations {
        params.iterations = iterations.max(1);
    }
    adjust(&mut params);

    let seed = args
        .seed
        .or(config.player.simulation.seed)
        .unwrap_or_else(rand::random);
    let stats = Stats::from(&config.player.stats);
    Ok((Simulator::new(config, params, rotation, seed, log), stats))
}

fn run(args: RunArgs) -> Result<()> {
    let log: Option<Box<dyn Write + Send>> = if args.log_combat {
        Some(Box::new(std::io::stdout()))
    } else {
        None
    };
    let log_combat = args.log_combat;
    let (sim, stats) = build(
        &args.sim,
        |params| {
            if log_combat {
                params.iterations = 1;
                params.duration = secs(COMBAT_LOG_SECONDS);
            }
        },
        log,
    )?;

    let start = Instant::now();
    let result = if args.parallel {
        sim.run_parallel(&stats)
    } else {
        sim.run(&stats)
    };
    let elapsed = start.elapsed();

    match args.format {
        OutputFormat::Text => {
            if log_combat {
                println!();
            }
            println!("=== Destro Sim Results ===");
            println!("Rotation: {}", sim.rotation().name);
            println!("Seed: {}", sim.seed());
            println!();
            result.print_report();

            if args.timing {
                let iterations = result.iterations.max(1) as f64;
                println!();
                println!("--- Performance ---");
                println!("Total time: {:.3}s", elapsed.as_secs_f64());
                println!("Per iteration: {:.3}ms", elapsed.as_secs_f64() * 1000.0 / iterations);
                println!("Iterations/sec: {:.0}", iterations / elapsed.as_secs_f64());
            }
            Ok(())
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct RunOutput<'a> {
                rotation: &'a str,
                seed: u64,
                parallel: bool,
                elapsed_seconds: f64,
                result: &'a destro_sim_lib::AggregateResult,
            }
            print_json(&RunOutput {
                rotation: &sim.rotation().name,
                seed: sim.seed(),
                parallel: args.parallel,
                elapsed_seconds: elapsed.as_secs_f64(),
                result: &result,
            })
        }
    }
}

fn validate(path: PathBuf) -> Result<()> {
    let rotation = load_rotation(&path)?;
    println!(
        "OK: {} ({} actions) from {}",
        rotation.name,
        rotation.action_count(),
        path.display()
    );
    Ok(())
}

fn weights(args: WeightsArgs) -> Result<()> {
    let (sim, stats) = build(&args.sim, |_| {}, None)?;
    let weights = batch::stat_weights(&sim, &stats, args.threads)?;
    match args.format {
        OutputFormat::Text => {
            println!("Rotation: {}", sim.rotation().name);
            weights.print_report(args.verbose);
            Ok(())
        }
        OutputFormat::Json => print_json(&weights),
    }
}

fn sweep(args: SweepArgs) -> Result<()> {
    let stat = SweepStat::from_name(&args.stat).ok_or_else(|| {
        Error::Batch(format!("unsupported stat '{}' (use crit|haste|sp)", args.stat))
    })?;
    let (sim, stats) = build(&args.sim, |_| {}, None)?;

    let options = SweepOptions {
        stat,
        start: args.start,
        stop: args.stop,
        step: args.step,
        avg_seeds: args.avg_seeds.max(1),
        threads: args.threads,
        include_delta: !args.no_deltas,
        output_dir: args.output_dir,
    };
    let report = batch::sweep(&sim, &stats, &options)?;
    println!(
        "Sweep complete ({}): {} points, seeds/point={}, output={}",
        stat.name(),
        report.points.len(),
        report.seeds_per_point,
        report.path.display()
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout_err = |source: std::io::Error| Error::Output {
        path: PathBuf::from("<stdout>"),
        source,
    };
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(|e| stdout_err(e.into()))?;
    writeln!(out).map_err(stdout_err)
}
