use anyhow::{Context, Result};
use clap::Parser;
use load_core::{
    AuthorClient, Config, HttpAuthorClient, MockAuthorClient, RampPlanner, RunOptions, RunSummary,
    Runner, Scenario, Timings,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "loadgen")]
#[command(about = "Ramping virtual-user load generator for the library API author endpoint")]
struct Args {
    /// Path to configuration file (built-in scenario when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Client mode: mock or http
    #[arg(long, default_value = "http")]
    mode: String,

    /// Target URL (overrides config)
    #[arg(long)]
    url: Option<String>,

    /// Payload seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Print progress every N milliseconds
    #[arg(long, default_value = "1000")]
    print_every_ms: u64,

    /// Directory the run result JSON is written to
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunResult {
    scenario: String,
    timestamp: String,
    mode: String,
    target_url: String,
    seed: Option<u64>,
    #[serde(flatten)]
    summary: RunSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };
    if let Some(url) = args.url {
        config.target.url = url;
    }
    if let Some(seed) = args.seed {
        config.scenario.seed = Some(seed);
    }
    config.validate().context("Invalid configuration")?;

    info!(
        "Starting scenario '{}' in {} mode",
        config.scenario.name, args.mode
    );
    info!("Target: POST {}", config.target.url);
    match config.scenario.seed {
        Some(seed) => info!("Seed: {}", seed),
        None => info!("Seed: none (entropy)"),
    }

    let client: Arc<dyn AuthorClient> = match args.mode.as_str() {
        "mock" => Arc::new(MockAuthorClient::new(
            config.scenario.expected_status,
            "",
            Timings {
                sending: Duration::from_millis(1),
                waiting: Duration::from_millis(5),
                receiving: Duration::from_millis(1),
            },
        )),
        "http" => Arc::new(
            HttpAuthorClient::new(config.target.url.clone(), config.target.timeout_ms)
                .context("Failed to create HTTP client")?,
        ),
        _ => anyhow::bail!("Invalid mode: {}, must be 'mock' or 'http'", args.mode),
    };

    let scenario = Arc::new(Scenario::from_config(client, &config.scenario));
    let planner = RampPlanner::new(config.ramp.clone(), config.runner.start_vus);
    print_ramp_schedule(&planner, config.runner.start_vus);

    let mut options = RunOptions::from_config(&config);
    if args.print_every_ms > 0 {
        options.print_every = Some(Duration::from_millis(args.print_every_ms));
    }

    let summary = Runner::new(scenario, planner, options).run().await?;

    let now = chrono::Utc::now();
    let result = RunResult {
        scenario: config.scenario.name.clone(),
        timestamp: now.to_rfc3339(),
        mode: args.mode.clone(),
        target_url: config.target.url.clone(),
        seed: config.scenario.seed,
        summary,
    };

    std::fs::create_dir_all(&args.results_dir)
        .with_context(|| format!("Failed to create {:?}", args.results_dir))?;
    let output_path = args
        .results_dir
        .join(format!("run_{}.json", now.format("%Y%m%d_%H%M%S")));
    let result_json = serde_json::to_string_pretty(&result)?;
    std::fs::write(&output_path, result_json)
        .with_context(|| format!("Failed to write {:?}", output_path))?;

    info!("Results written to {:?}", output_path);
    print_summary(&result);

    Ok(())
}

fn print_ramp_schedule(planner: &RampPlanner, start_vus: u64) {
    println!("\n=== Ramp Schedule ===");
    println!("Start VUs: {}", start_vus);
    println!("Total duration: {}ms", planner.total_duration_ms());
    for (idx, stage) in planner.stages().iter().enumerate() {
        println!(
            "Stage {}: ramp to {} VUs over {}ms",
            idx, stage.target, stage.duration_ms
        );
    }
    println!();
}

fn print_summary(result: &RunResult) {
    let summary = &result.summary;
    println!("\n=== Scenario {} Summary ===", result.scenario);
    println!("Duration: {}ms", summary.duration_ms);
    println!("Max VUs: {}", summary.max_vus);
    println!("Iterations: {}", summary.iterations);
    println!("Errors: {}", summary.errors);
    println!(
        "Check '{}': {} passed, {} failed ({}%)",
        summary.check.name, summary.check.passes, summary.check.fails, summary.check.pass_rate_pct
    );
    println!(
        "{}: count={} avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p90={:.2}ms p95={:.2}ms",
        summary.trend.name,
        summary.trend.count,
        summary.trend.avg,
        summary.trend.min,
        summary.trend.med,
        summary.trend.max,
        summary.trend.p90,
        summary.trend.p95
    );
    println!();
}
