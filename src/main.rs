//! Echo-Mesh main entry point
//!
//! This is the command-line interface for the Echo-Mesh mutual-follow crawler.

use clap::{ArgGroup, Parser};
use echo_mesh::config::{load_config_with_hash, Config};
use echo_mesh::crawler::{resume_session, start_new_session};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Echo-Mesh: a mutual-follow graph crawler
///
/// Echo-Mesh crawls outward from a seed artist, keeping only follows that are
/// returned, and checkpoints the resulting graph to SQLite so a crawl can be
/// resumed, inspected or merged with others.
#[derive(Parser, Debug)]
#[command(name = "echo-mesh")]
#[command(version = "1.0.0")]
#[command(about = "A mutual-follow graph crawler", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["seed", "resume", "stats", "merge", "dry_run"])
))]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a new crawl from this profile URL
    #[arg(long, value_name = "PROFILE_URL")]
    seed: Option<String>,

    /// Continue a crawl from a graph database
    #[arg(long, value_name = "GRAPH")]
    resume: Option<PathBuf>,

    /// Show statistics of a graph database and exit
    #[arg(long, value_name = "GRAPH")]
    stats: Option<PathBuf>,

    /// Merge graph databases into <graph-dir>/merged.db and exit
    #[arg(long, value_name = "GRAPH", num_args = 2..)]
    merge: Option<Vec<PathBuf>>,

    /// Validate config and print it without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(path) = &cli.stats {
        handle_stats(path)?;
    } else if let Some(paths) = &cli.merge {
        handle_merge(&config, paths)?;
    } else if let Some(path) = &cli.resume {
        handle_resume(config, path, &config_hash).await?;
    } else if let Some(seed) = &cli.seed {
        handle_crawl(config, seed, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("echo_mesh=info,warn"),
            1 => EnvFilter::new("echo_mesh=debug,info"),
            2 => EnvFilter::new("echo_mesh=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Echo-Mesh Dry Run ===\n");

    println!("Crawler:");
    println!("  Iteration delay: {}ms", config.crawler.iteration_delay);
    println!(
        "  Checkpoint every {} explored artists",
        config.crawler.checkpoint_interval
    );
    println!(
        "  Cache eviction every {} explored artists",
        config.crawler.cache_clear_interval
    );
    println!("  Recent seeds: {}", config.crawler.recent_seeds_capacity);
    println!(
        "  Fetch attempts: {} (backoff {}ms)",
        config.crawler.max_fetch_retries, config.crawler.retry_backoff
    );
    println!("  Failed expansions: {:?}", config.crawler.failed_expansion);

    println!("\nTuning:");
    println!("  Deferral factor: {}", config.tuning.deferral_factor);
    println!(
        "  Sweep deferral factor: {}",
        config.tuning.sweep_deferral_factor
    );
    println!("  Cascade factor: {}", config.tuning.cascade_factor);
    println!("  Boost cap: {}", config.tuning.boost_cap);
    println!("  Bootstrap boost cap: {}", config.tuning.bootstrap_boost_cap);

    println!("\nDirectory:");
    println!("  API: {}", config.directory.api_url);
    println!("  Page size: {}", config.directory.page_size);
    println!("  Timeout: {}s", config.directory.request_timeout);

    println!("\nOutput:");
    println!("  Graph directory: {}", config.output.graph_dir);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics of a graph database
fn handle_stats(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    use echo_mesh::output::{load_statistics, print_statistics};
    use echo_mesh::storage::open_store;

    if !path.exists() {
        return Err(format!("graph {} does not exist", path.display()).into());
    }
    println!("Graph: {}\n", path.display());

    let store = open_store(path)?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --merge mode: writes the union of several graphs
fn handle_merge(config: &Config, paths: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    use echo_mesh::output::write_merged_graph;

    let output = write_merged_graph(paths, Path::new(&config.output.graph_dir))?;
    println!("✓ Merged {} graphs into: {}", paths.len(), output.display());

    Ok(())
}

/// Handles the --resume mode
async fn handle_resume(
    config: Config,
    path: &Path,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Resuming crawl from {}", path.display());

    match resume_session(config, path, config_hash).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed successfully: {} artists explored this session",
                summary.explored
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    seed: &str,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting new crawl from {}", seed);

    match start_new_session(config, seed, config_hash).await {
        Ok((path, summary)) => {
            tracing::info!(
                "Crawl completed successfully: {} artists explored, graph at {}",
                summary.explored,
                path.display()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
