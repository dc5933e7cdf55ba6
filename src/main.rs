//! Callbook-Harvest main entry point
//!
//! This is the command-line interface for the Callbook-Harvest birthday harvester.

use callbook_harvest::config::{load_config_or_default, validate, Config, ProxyMode};
use callbook_harvest::crawler::harvest;
use callbook_harvest::output::print_statistics;
use callbook_harvest::proxy::provision;
use callbook_harvest::HarvestError;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Callbook-Harvest: harvests a year of callbook birthday listings
///
/// Walks one listing page per calendar day, follows every detail link, and
/// writes call sign, names and birthday of each entry to a CSV file.
#[derive(Parser, Debug)]
#[command(name = "callbook-harvest")]
#[command(version = "1.0.0")]
#[command(about = "Harvests callbook birthday listings into CSV", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Year to harvest (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,

    /// First day to harvest, as MM-DD
    #[arg(long, value_name = "MM-DD")]
    from: Option<String>,

    /// Last day to harvest, as MM-DD
    #[arg(long, value_name = "MM-DD")]
    to: Option<String>,

    /// Output CSV path
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Fetch directly, without acquiring a proxy
    #[arg(long)]
    no_proxy: bool,

    /// Maximum in-flight requests per batch
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Attempts per request on transient failures
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Base backoff delay in seconds between attempts
    #[arg(long, value_name = "SECS")]
    backoff_factor: Option<f64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(year) = self.year {
            config.crawl.year = Some(year);
        }
        if let Some(from) = &self.from {
            config.crawl.first_day = Some(from.clone());
        }
        if let Some(to) = &self.to {
            config.crawl.last_day = Some(to.clone());
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if self.no_proxy {
            config.proxy.mode = ProxyMode::None;
        }
        if let Some(concurrency) = self.concurrency {
            config.fetch.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            config.fetch.timeout_secs = timeout;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.fetch.max_attempts = max_attempts;
        }
        if let Some(backoff_factor) = self.backoff_factor {
            config.fetch.backoff_factor = backoff_factor;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", diagnostic(&e));
            ExitCode::FAILURE
        }
    }
}

/// The single stderr line reported for a fatal error
fn diagnostic(error: &HarvestError) -> String {
    let message = error.to_string();
    format!("[ERROR] {}", message.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("callbook_harvest=info,warn"),
            1 => EnvFilter::new("callbook_harvest=debug,info"),
            2 => EnvFilter::new("callbook_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<(), HarvestError> {
    let mut config = load_config_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    validate(&config)?;

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    handle_harvest(&config, cli.quiet).await
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(config: &Config) -> Result<(), HarvestError> {
    let window = config.window()?;

    println!("=== Callbook-Harvest Dry Run ===\n");

    println!("Window:");
    println!("  Year: {}", config.year());
    if let (Some(first), Some(last)) = (window.first(), window.last()) {
        println!("  Days: {} .. {} ({} work units)", first, last, window.len());
    }

    println!("\nTarget:");
    println!("  Base URL: {}", config.crawl.base_url);
    println!("  Listing path: {}", config.crawl.listing_path);

    println!("\nFetching:");
    println!("  Batch concurrency: {}", config.fetch.concurrency);
    println!("  Unit concurrency: {}", config.crawl.unit_concurrency);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!(
        "  Attempts: {} (backoff factor {}s)",
        config.fetch.max_attempts, config.fetch.backoff_factor
    );

    println!("\nProxy:");
    println!("  Mode: {:?}", config.proxy.mode);
    if config.proxy.mode != ProxyMode::None {
        println!("  Regions: {}", config.proxy.regions.join(", "));
    }

    println!("\nOutput:");
    println!("  CSV: {}", config.output.path);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, quiet: bool) -> Result<(), HarvestError> {
    // The proxy is acquired once, before any fetch; failure ends the run here
    let binding = provision(&config.proxy, &config.fetch.user_agent).await?;

    let start_time = Instant::now();
    let stats = harvest(config, binding).await?;

    if !quiet {
        print_statistics(&stats);
        println!();
    }
    println!(
        "Execution time: {:.3} seconds",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
