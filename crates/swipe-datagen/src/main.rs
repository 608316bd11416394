//! CLI for swipe landing page event data generation.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Instant;
use swipe_datagen::{
    anomaly, output, AnomalyKind, Difficulty, EventGenerator, GeneratorConfig, ScenarioRegistry,
};

#[derive(Parser, Debug)]
#[command(name = "swipe-datagen")]
#[command(about = "Synthetic swipe LP event data generation")]
struct Args {
    /// Scenario name (unknown names fall back to the default scenario)
    #[arg(short, long, default_value = "baseline")]
    scenario: String,

    /// YAML file with additional scenario definitions to register
    #[arg(long)]
    scenario_file: Option<PathBuf>,

    /// Number of days to simulate
    #[arg(short, long, default_value = "30")]
    days: u32,

    /// Nominal page count, used when the scenario has no page-count model
    #[arg(short, long, default_value = "10")]
    pages: u32,

    /// Target conversion rate (e.g. 0.04 for 4%)
    #[arg(long, default_value = "0.04")]
    target_cvr: f64,

    /// Day-to-day volatility: stable, oscillating or cliff
    #[arg(long, default_value = "stable")]
    difficulty: Difficulty,

    /// Random seed for deterministic generation
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Start date (YYYY-MM-DD)
    #[arg(long, default_value = "2024-01-01")]
    start_date: String,

    /// Output directory for Hive-partitioned Parquet files
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Post-pass anomaly, e.g. conversion-outage:3 or traffic-drop:2:0.3
    #[arg(long)]
    anomaly: Option<AnomalyKind>,

    /// Quiet mode (no progress output)
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let start_date = NaiveDate::parse_from_str(&args.start_date, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("Invalid date format: {}", e))?;

    let mut registry = ScenarioRegistry::builtin();
    if let Some(path) = &args.scenario_file {
        let names = registry.register_from_yaml(path)?;
        if !args.quiet {
            println!("Registered custom scenarios: {}", names.join(", "));
        }
    }

    let config = GeneratorConfig::new(&args.scenario)
        .days(args.days)
        .nominal_pages(args.pages)
        .target_cvr(args.target_cvr)
        .difficulty(args.difficulty)
        .start_date(start_date)
        .seed(args.seed);

    if !args.quiet {
        println!(
            "Generating {} days of '{}' ({} difficulty)",
            args.days,
            args.scenario,
            args.difficulty.as_str()
        );
        println!("Output: {:?}", args.output);
        println!("Seed: {}", args.seed);
        println!();
    }

    let start_time = Instant::now();
    let generator = EventGenerator::new(config, &registry)?;
    let mut table = generator.generate();

    if let Some(kind) = args.anomaly {
        // The anomaly pass draws from its own stream.
        let mut rng = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(1));
        anomaly::inject(&mut table, kind, &mut rng);
        if !args.quiet {
            println!("Injected anomaly: {:?}", kind);
        }
    }

    let count = output::write_events_to_parquet(&args.output, &table)?;
    let elapsed = start_time.elapsed();

    if !args.quiet {
        println!("{}", table.summary());
        println!(
            "Wrote {} rows in {:.2}s ({:.0} rows/sec)",
            count,
            elapsed.as_secs_f64(),
            count as f64 / elapsed.as_secs_f64().max(0.001)
        );
    }

    Ok(())
}
