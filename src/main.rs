//! storedash CLI
//!
//! Command-line front end for the dashboard core:
//! - List and filter orders
//! - Dashboard stats and revenue buckets
//! - Export the filtered view
//! - Tail the live transaction feed

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use storedash::config::{generate_default_config, Config, LoggingConfig};
use storedash::export::{scoped_rows, write_export, ExportFormat, ExportScope};
use storedash::feed::{
    prepend_bounded, ConnectionState, FeedEvent, LiveFeedSubscriber, WsConnector,
    NEW_TRANSACTION,
};
use storedash::query::{
    compare_periods, parse_filter_expression, revenue_by_period, DateRange, Interval, Panel,
    StatsConfig,
};
use storedash::records::{Order, Transaction};
use storedash::source::{load_file, HttpSource};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "storedash")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query, export and watch store dashboard data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ~/.config/storedash/config.toml or ./storedash.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List orders matching a filter expression
    Orders {
        /// Read orders from a JSON file instead of the API
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Filter expression, e.g. `status:pending amount:100..500 sort:-total`
        #[arg(short = 'q', long)]
        filter: Option<String>,
        /// Show every match instead of the first 20
        #[arg(long)]
        all: bool,
    },

    /// Show dashboard stats
    Stats {
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Comparison window in days
        #[arg(long, default_value = "30")]
        days: u32,
    },

    /// Show revenue grouped by period
    Revenue {
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Bucket size (day, week, month)
        #[arg(short, long, default_value = "day")]
        group_by: String,
    },

    /// Export orders as CSV or JSON
    Export {
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short = 'q', long)]
        filter: Option<String>,
        /// csv or json (default from config)
        #[arg(short = 'F', long)]
        format: Option<String>,
        /// Export the whole collection, ignoring the filter
        #[arg(long)]
        all: bool,
        /// Output directory (default from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Tail the live transaction feed
    Watch {
        /// WebSocket URL (default from config)
        #[arg(long)]
        url: Option<String>,
        /// Channel name (default from config)
        #[arg(long)]
        channel: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Orders { file, filter, all } => {
            let orders = load_orders(file.as_deref(), &config).await?;
            let panel = build_panel(orders, filter.as_deref())?;
            let view = panel.view();

            if view.is_empty() {
                println!("No orders match.");
            } else {
                println!(
                    "{:<12} {:<20} {:<11} {:<8} {:>10}  {}",
                    "ID", "Customer", "Status", "Priority", "Total", "Date"
                );
                println!("{}", "-".repeat(76));
                let shown = if all { view.len() } else { view.len().min(20) };
                for order in &view[..shown] {
                    println!(
                        "{:<12} {:<20} {:<11} {:<8} {:>10.2}  {}",
                        order.id,
                        truncate(&order.customer.name, 20),
                        order.status.as_str(),
                        order.priority.as_str(),
                        order.total,
                        order.date.format("%Y-%m-%d")
                    );
                }
                if shown < view.len() {
                    println!("... {} more (use --all)", view.len() - shown);
                }
            }

            println!();
            println!("Showing {} of {} orders", view.len(), panel.len());
            println!("Dashboard: {}", panel.stats());
        }

        Commands::Stats { file, days } => {
            let orders = load_orders(file.as_deref(), &config).await?;
            let panel = Panel::new(orders);
            let stats = panel.stats();

            println!("Orders:   {}", stats.total_count);
            for (status, count) in &stats.counts {
                println!("  {:<12} {}", status, count);
            }
            println!("Revenue:  {:.2}", stats.revenue);
            println!("Average:  {:.2}", stats.average);

            let periods = DateRange::last_days(Utc::now().date_naive(), days)
                .and_then(|current| current.previous().map(|previous| (current, previous)));
            match periods {
                Some((current, previous)) => {
                    let comparison =
                        compare_periods(panel.records(), &current, &previous, &StatsConfig::default());
                    println!();
                    println!("Last {} days vs previous {}:", days, days);
                    println!("  Revenue  {}", format_change(comparison.revenue_change));
                    println!("  Orders   {}", format_change(comparison.count_change));
                    println!("  Average  {}", format_change(comparison.average_change));
                }
                None => tracing::warn!(days, "Comparison window out of range, skipping"),
            }
        }

        Commands::Revenue { file, group_by } => {
            let Some(interval) = Interval::parse(&group_by) else {
                bail!("Unknown interval '{}': expected day, week or month", group_by);
            };
            let orders = load_orders(file.as_deref(), &config).await?;
            let buckets = revenue_by_period(&orders, interval, &StatsConfig::default());

            if buckets.is_empty() {
                println!("No revenue recorded.");
            }
            for bucket in buckets {
                println!(
                    "{}  {:>12.2}  ({} orders)",
                    bucket.start, bucket.revenue, bucket.counted
                );
            }
        }

        Commands::Export {
            file,
            filter,
            format,
            all,
            out,
        } => {
            let format = match format.as_deref() {
                Some(f) => ExportFormat::parse(f)
                    .with_context(|| format!("Unknown export format '{}'", f))?,
                None => config.export.format,
            };
            let scope = if all {
                ExportScope::All
            } else {
                ExportScope::Filtered
            };
            let dir = out.unwrap_or_else(|| PathBuf::from(&config.export.dir));

            let orders = load_orders(file.as_deref(), &config).await?;
            let panel = build_panel(orders, filter.as_deref())?;
            let rows = scoped_rows(&panel, scope);

            let path = write_export(&dir, "orders", &rows, format, Utc::now().date_naive())?;
            println!("Exported {} orders to {}", rows.len(), path.display());
        }

        Commands::Watch { url, channel } => {
            let url = url.unwrap_or_else(|| config.feed.url.clone());
            let channel = channel.unwrap_or_else(|| config.feed.channel.clone());
            watch(&url, &channel, &config).await?;
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("storedash={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Orders from a file, or from the API with an empty fallback
async fn load_orders(file: Option<&Path>, config: &Config) -> anyhow::Result<Vec<Order>> {
    if let Some(path) = file {
        return Ok(load_file(path)?);
    }

    let source = HttpSource::new(&config.api.base_url, config.api.timeout())?;
    let loaded = source.load_or_fallback("orders", Vec::new()).await;
    if let Some(e) = &loaded.degraded {
        eprintln!("Warning: could not load orders from {}: {}", source.base_url(), e);
    }
    Ok(loaded.records)
}

fn build_panel(orders: Vec<Order>, filter: Option<&str>) -> anyhow::Result<Panel<Order>> {
    let mut panel = Panel::new(orders);
    if let Some(expr) = filter {
        let query = parse_filter_expression(expr)
            .with_context(|| format!("Invalid filter expression '{}'", expr))?;
        panel.set_filter(query.filter);
        panel.set_sort(query.sort);
    }
    Ok(panel)
}

async fn watch(url: &str, channel: &str, config: &Config) -> anyhow::Result<()> {
    let feed_config = config.feed.to_feed_config();
    let limit = feed_config.recent_limit;
    let subscriber = LiveFeedSubscriber::new(Arc::new(WsConnector::new(url)), feed_config);
    let recent: Arc<Mutex<Vec<Transaction>>> = Arc::new(Mutex::new(Vec::new()));

    subscriber.on_connect(|event| println!("● Live ({})", event.channel()));
    subscriber.on_disconnect(|event| {
        if let FeedEvent::Disconnect { reason, .. } = event {
            println!("○ Offline: {}", reason);
        }
    });
    subscriber.on_error(|event| {
        if let FeedEvent::Error { message, .. } = event {
            eprintln!("Feed error: {}", message);
        }
    });

    {
        let recent = Arc::clone(&recent);
        subscriber.subscribe_typed(NEW_TRANSACTION, move |tx: Transaction| {
            println!(
                "{}  {:<10} {:<20} {:>10.2}  {}",
                tx.date.format("%H:%M:%S"),
                tx.id,
                truncate(&tx.customer, 20),
                tx.amount,
                tx.status.as_str()
            );
            if let Ok(mut list) = recent.lock() {
                let next = prepend_bounded(&list, tx, limit);
                *list = next;
            }
        });
    }

    println!("Watching {} on {} (Ctrl+C to stop)", channel, url);
    let mut handle = subscriber.connect(channel);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
        }
        _ = handle.wait_for(ConnectionState::GaveUp) => {
            eprintln!("Gave up reconnecting to {}", url);
        }
    }

    subscriber.shutdown().await;

    let count = recent.lock().map(|list| list.len()).unwrap_or(0);
    println!("Received {} recent transactions", count);
    Ok(())
}

fn format_change(change: Option<f64>) -> String {
    match change {
        Some(pct) => format!("{:+.1}%", pct),
        None => "n/a".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
