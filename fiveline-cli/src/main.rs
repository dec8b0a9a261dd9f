//! Fiveline CLI: what-if moving-average projection.
//!
//! Commands:
//! - `project`: fetch history, project the targets, print the averages
//! - `cache status`: list cached fetches with age and freshness
//! - `cache clear`: invalidate one symbol or drop everything

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fiveline_core::calendar;
use fiveline_core::config::{FivelineConfig, ProviderKind};
use fiveline_core::data::{
    to_historical_bars, Adjustment, BarCache, CachedProvider, CircuitBreaker, CsvProvider,
    DataProvider, HistoryRequest, YahooProvider,
};
use fiveline_core::{
    pipeline, DisplayResult, PipelineOutcome, PredictionTarget, LOOKBACK_CHOICES, MAX_TARGETS,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fiveline",
    about = "Fiveline CLI: project what-if closes and their moving averages"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory. Overrides the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence when set).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project up to five future closes and recompute MA5/10/20/60/120.
    Project {
        /// Yahoo symbol to fetch (e.g., SPY, ^GSPC or 000001.SZ).
        symbol: String,

        /// One target per future trading day: `price:11.0`, `pct:5`, `5%` or `11.0`.
        #[arg(short = 't', long = "target", required = true, allow_hyphen_values = true)]
        targets: Vec<PredictionTarget>,

        /// Trading bars of history to show. Defaults to the config value.
        #[arg(long)]
        lookback: Option<usize>,

        /// Read history from this CSV file instead of the configured provider.
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Price adjustment: none, forward or backward.
        #[arg(long)]
        adjust: Option<Adjustment>,

        /// Bypass the history cache.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Write the display result as JSON to this path.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached fetches.
    Status,
    /// Remove cached fetches for one symbol, or all of them.
    Clear {
        /// Only clear this symbol.
        #[arg(long)]
        symbol: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => FivelineConfig::from_file(path)?,
        None => FivelineConfig::default(),
    };
    if let Some(dir) = cli.cache_dir {
        config.data.cache_dir = dir;
    }

    match cli.command {
        Commands::Project {
            symbol,
            targets,
            lookback,
            csv,
            adjust,
            no_cache,
            json,
        } => {
            if let Some(path) = csv {
                config.data.provider = ProviderKind::Csv;
                config.data.csv_path = Some(path);
            }
            if let Some(adjust) = adjust {
                config.data.adjustment = adjust;
            }
            if let Some(lookback) = lookback {
                config.display.lookback = lookback;
            }
            config.validate()?;
            run_project(&config, &symbol, &targets, no_cache, json.as_deref())
        }
        Commands::Cache { action } => {
            let cache = BarCache::new(&config.data.cache_dir, config.data.cache_ttl());
            match action {
                CacheAction::Status => run_cache_status(&cache),
                CacheAction::Clear { symbol } => run_cache_clear(&cache, symbol.as_deref()),
            }
        }
    }
}

fn build_provider(
    config: &FivelineConfig,
    circuit_breaker: Arc<CircuitBreaker>,
    no_cache: bool,
) -> Result<Box<dyn DataProvider>> {
    let base: Box<dyn DataProvider> = match config.data.provider {
        ProviderKind::Yahoo => Box::new(YahooProvider::new(circuit_breaker)?),
        ProviderKind::Csv => {
            let Some(path) = config.data.csv_path.as_ref() else {
                bail!("csv provider selected but no csv_path configured");
            };
            Box::new(CsvProvider::new(path))
        }
    };

    if no_cache {
        return Ok(base);
    }
    let cache = BarCache::new(&config.data.cache_dir, config.data.cache_ttl());
    Ok(Box::new(CachedProvider::new(base, cache)))
}

fn run_project(
    config: &FivelineConfig,
    symbol: &str,
    targets: &[PredictionTarget],
    no_cache: bool,
    json_path: Option<&Path>,
) -> Result<()> {
    if targets.len() > MAX_TARGETS {
        bail!("at most {MAX_TARGETS} targets are allowed, got {}", targets.len());
    }
    let lookback = config.display.lookback;
    if !LOOKBACK_CHOICES.contains(&lookback) {
        tracing::warn!(lookback, choices = ?LOOKBACK_CHOICES, "look-back is not one of the standard choices");
    }

    let today = chrono::Local::now().date_naive();
    let request = HistoryRequest::for_lookback(
        symbol,
        today,
        lookback,
        config.data.padding_days,
        config.data.adjustment,
    )?;

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = build_provider(config, Arc::clone(&circuit_breaker), no_cache)?;
    let fetched = match provider.fetch(&request) {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::error!(symbol = %request.symbol, error = %e, "history fetch failed");
            eprintln!(
                "{}",
                unavailable_message(
                    &request.symbol,
                    provider.is_available(),
                    circuit_breaker.remaining_cooldown()
                )
            );
            std::process::exit(1);
        }
    };

    let historical = to_historical_bars(&fetched.bars, config.data.adjustment);
    let result = match pipeline::run(&historical, targets, lookback)? {
        PipelineOutcome::NoData => {
            eprintln!(
                "No data for {} between {} and {}: data unavailable, check symbol or network.",
                request.symbol, request.start, request.end
            );
            std::process::exit(1);
        }
        PipelineOutcome::Ready(result) => result,
    };

    print_summary(&request.symbol, &result, targets);

    if let Some(path) = json_path {
        let body = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
        println!("JSON written to: {}", path.display());
    }

    Ok(())
}

fn unavailable_message(symbol: &str, available: bool, cooldown: Duration) -> String {
    let mut message = format!("No data for {symbol}: data unavailable, check symbol or network.");
    if !available {
        if cooldown.is_zero() {
            message.push_str(" Provider is not available.");
        } else {
            message.push_str(&format!(" Provider paused, retry in {}.", format_age(cooldown)));
        }
    }
    message
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

fn print_summary(symbol: &str, result: &DisplayResult, targets: &[PredictionTarget]) {
    let series = &result.series;
    let windows = result.averages().windows();

    println!();
    println!("=== {symbol} What-If Projection ===");
    if let Some(last) = series.last_historical() {
        println!("Last close:     {:.3} on {}", last.close, last.date);
        let dates = calendar::trading_days_after(last.date, targets.len());
        let plan: Vec<String> = dates
            .iter()
            .zip(targets)
            .map(|(d, t)| format!("{d} {t}"))
            .collect();
        println!("Targets:        {}", plan.join(", "));
    }
    println!(
        "Bars shown:     {} ({} historical, {} projected)",
        series.len(),
        series.historical_len(),
        series.projected().len()
    );
    println!();

    let mut header = format!("{:<12} {:>10}", "Date", "Close");
    for w in &windows {
        header.push_str(&format!(" {:>10}", format!("MA{w}")));
    }
    println!("{header}");
    println!("{}", "-".repeat(header.len()));

    // The last historical row anchors the projected rows.
    let offset = series.historical_len();
    if let Some(last) = series.last_historical() {
        let row = result.averages().row(offset - 1);
        print_row(last.date.to_string(), last.close, &row);
    }
    for row in result.projected_rows() {
        print_row(format!("{}*", row.date), row.close, &row.averages);
    }
    println!();
    println!("* projected");
}

fn print_row(
    date: String,
    close: f64,
    averages: &std::collections::BTreeMap<usize, Option<f64>>,
) {
    let mut line = format!("{date:<12} {close:>10.3}");
    for value in averages.values() {
        line.push_str(&format!(" {:>10}", format_value(*value)));
    }
    println!("{line}");
}

fn run_cache_status(cache: &BarCache) -> Result<()> {
    let entries = cache.entries()?;
    if entries.is_empty() {
        println!("Cache is empty: {}", cache.cache_dir().display());
        return Ok(());
    }

    let now = Utc::now();
    println!("Cache: {}", cache.cache_dir().display());
    println!("Entries: {}", entries.len());
    println!();
    println!(
        "{:<10} {:<25} {:<10} {:>8} {:>10} {:<6}",
        "Symbol", "Date Range", "Adjust", "Bars", "Age", "Fresh"
    );
    println!("{}", "-".repeat(74));
    for meta in &entries {
        let fresh = if meta.is_fresh(cache.ttl(), now) { "yes" } else { "no" };
        println!(
            "{:<10} {:<25} {:<10} {:>8} {:>10} {:<6}",
            meta.symbol,
            format!("{} to {}", meta.start, meta.end),
            meta.adjustment.to_string(),
            meta.bar_count,
            format_age(meta.age(now)),
            fresh
        );
    }
    Ok(())
}

fn run_cache_clear(cache: &BarCache, symbol: Option<&str>) -> Result<()> {
    let removed = match symbol {
        Some(symbol) => cache.invalidate(symbol)?,
        None => cache.clear()?,
    };
    match symbol {
        Some(symbol) => println!("Removed {removed} cached fetch(es) for {symbol}."),
        None => println!("Removed {removed} cached fetch(es)."),
    }
    Ok(())
}

fn format_age(age: std::time::Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{:.1}h", secs as f64 / 3600.0)
    } else {
        format!("{:.1}d", secs as f64 / 86_400.0)
    }
}
