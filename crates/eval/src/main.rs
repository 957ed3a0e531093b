//! Command-line client for the ranking API.
//!
//! Usage:
//!     menurank ranking --start 2025-09-10 --end 2025-09-20 --top-k 10
//!     menurank ranking --query espresso --format json
//!     menurank series 42 --raw
//!     menurank report --out-dir ./reports
//!     menurank health

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use menurank_backend_http::{ApiConfig, HttpRankingApi, RankingApi};
use menurank_export::{DirectorySink, ReportName};
use menurank_features::normalize_series;
use menurank_filters::FilterState;
use menurank_model::{parse_date, DayRankingParams, ProductId, RankingRow, ShareBreakdown};
use menurank_orchestrator::{Dashboard, DashboardConfig, ViewModel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "menurank")]
#[command(about = "Query the menu ranking API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API base URL (defaults to $MENURANK_API_BASE, then http://127.0.0.1:8000)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "15")]
    timeout_secs: u64,
}

/// Date window and cohort size shared by most commands.
#[derive(Args)]
struct Window {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    start: Option<String>,

    /// Last day, YYYY-MM-DD
    #[arg(long)]
    end: Option<String>,

    /// Number of products to rank (1-100)
    #[arg(short = 'k', long)]
    top_k: Option<String>,

    /// Show raw scores instead of 0-100
    #[arg(long)]
    raw: bool,
}

impl Window {
    fn filters(&self) -> Result<FilterState> {
        let mut filters = FilterState::default();
        if let Some(start) = &self.start {
            filters.set_start_date(start)?;
        }
        if let Some(end) = &self.end {
            filters.set_end_date(end)?;
        }
        if let Some(top_k) = &self.top_k {
            filters.set_top_k(top_k);
        }
        filters.set_normalize(!self.raw);
        Ok(filters)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ranking, share and series of the top product for a window
    Ranking {
        #[command(flatten)]
        window: Window,

        /// Only show products whose name contains this text
        #[arg(short, long)]
        query: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Ranking for a single day
    ByDay {
        /// Day, YYYY-MM-DD
        day: String,

        #[arg(short = 'k', long, default_value = "10")]
        top_k: u32,

        #[arg(long)]
        raw: bool,
    },

    /// Daily score series of one product
    Series {
        product_id: i64,

        #[command(flatten)]
        window: Window,
    },

    /// Units sold per product in the top-K cohort
    Share {
        #[command(flatten)]
        window: Window,
    },

    /// Ask the server to write a CSV export
    Export {
        #[command(flatten)]
        window: Window,
    },

    /// Download the PDF report
    Report {
        #[command(flatten)]
        window: Window,

        /// Directory to save the report in
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Name the file by download time instead of date range
        #[arg(long)]
        timestamp_name: bool,
    },

    /// Check API health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("menurank=debug".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.api_url {
        Some(url) => ApiConfig::new(url),
        None => ApiConfig::default(),
    }
    .with_timeout_secs(cli.timeout_secs);
    tracing::debug!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "using ranking API");
    let api = HttpRankingApi::new(config)?;

    match cli.command {
        Commands::Ranking {
            window,
            query,
            format,
        } => run_ranking(api, &window, query, &format).await?,
        Commands::ByDay { day, top_k, raw } => run_by_day(&api, &day, top_k, !raw).await?,
        Commands::Series { product_id, window } => run_series(&api, product_id, &window).await?,
        Commands::Share { window } => run_share(&api, &window).await?,
        Commands::Export { window } => run_export(api, &window).await?,
        Commands::Report {
            window,
            out_dir,
            timestamp_name,
        } => run_report(api, &window, out_dir, timestamp_name).await?,
        Commands::Health => run_health(&api).await?,
    }

    Ok(())
}

fn dashboard(api: HttpRankingApi, window: &Window) -> Result<Dashboard<HttpRankingApi>> {
    Ok(Dashboard::with_config(
        api,
        window.filters()?,
        DashboardConfig::default(),
    ))
}

fn print_rows(rows: &[&RankingRow], normalize: bool) {
    if rows.is_empty() {
        println!("No records");
        return;
    }
    println!("{:>4}  {:>8}  {:<32}  {:>8}", "rank", "id", "name", "score");
    for row in rows {
        println!(
            "{:>4}  {:>8}  {:<32}  {:>8.2}",
            row.rank,
            row.product_id,
            row.display_name(),
            row.display_score(normalize)
        );
    }
}

fn print_dashboard(view: &ViewModel) {
    let filters = view.filters();
    let range = filters.range();
    println!(
        "Window: {} .. {} ({} days), top {}",
        range.start(),
        range.end(),
        range.days(),
        filters.top_k()
    );
    if !view.applied_query().is_empty() {
        println!("Filter: {:?}", view.applied_query());
    }
    println!("---");
    print_rows(&view.visible_rows(), filters.normalize());

    println!("\nSelected: {}", view.selected_name());
    for point in view.series() {
        println!(
            "   {}  {:>8.2}",
            point.date,
            point.display_score(filters.normalize())
        );
    }

    let share = view.share();
    if !share.is_empty() {
        println!("\nShare ({} units):", share.total_units());
        for slice in share {
            println!(
                "   {:<32} {:>6}  {:>5.1}%",
                slice.name.as_deref().unwrap_or("-"),
                slice.sales_count,
                share.fraction(slice) * 100.0
            );
        }
    }
}

async fn run_ranking(
    api: HttpRankingApi,
    window: &Window,
    query: Option<String>,
    format: &str,
) -> Result<()> {
    let mut dashboard = dashboard(api, window)?;
    dashboard.mount().await;
    if let Some(query) = query {
        dashboard.set_query(query);
        dashboard.flush().await;
    }

    let view = dashboard.view();
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&view.visible_rows())?);
    } else {
        print_dashboard(&view);
    }
    Ok(())
}

async fn run_by_day(api: &HttpRankingApi, day: &str, top_k: u32, normalize: bool) -> Result<()> {
    let day = parse_date(day).with_context(|| format!("Invalid date: {day}"))?;
    let params = DayRankingParams {
        day,
        top_k: top_k.clamp(1, 100),
        normalize,
    };

    println!("Ranking for {day}");
    println!("---");
    let rows = api.ranking_by_day(&params).await?;
    print_rows(&rows.iter().collect::<Vec<_>>(), normalize);
    Ok(())
}

async fn run_series(api: &HttpRankingApi, product_id: i64, window: &Window) -> Result<()> {
    let filters = window.filters()?;
    let params = filters.ranking_params().series(ProductId(product_id));
    let points = normalize_series(api.series(&params).await?);

    println!("Product {product_id}, {} .. {}", params.start_date, params.end_date);
    println!("---");
    if points.is_empty() {
        println!("No records");
    }
    for point in &points {
        println!("{}  {:>8.2}", point.date, point.display_score(filters.normalize()));
    }
    Ok(())
}

async fn run_share(api: &HttpRankingApi, window: &Window) -> Result<()> {
    let params = window.filters()?.ranking_params().share();
    let slices = api.share(&params).await?;

    println!("Top {} share, {} .. {}", params.top_k, params.start_date, params.end_date);
    println!("---");
    for slice in &slices {
        println!(
            "{:>8}  {:<32} {:>6}  {:>5.1}%",
            slice.product_id,
            slice.name.as_deref().unwrap_or("-"),
            slice.sales_count,
            slices.fraction(slice) * 100.0
        );
    }
    println!("---");
    println!("Total: {} units", slices.total_units());
    Ok(())
}

async fn run_export(api: HttpRankingApi, window: &Window) -> Result<()> {
    let dashboard = dashboard(api, window)?;
    match dashboard.export_csv().await {
        Ok(export) => {
            println!("{}", export.notice());
            if let Some(rows) = export.rows {
                println!("Rows: {rows}");
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", e.notice());
            std::process::exit(1);
        }
    }
}

async fn run_report(
    api: HttpRankingApi,
    window: &Window,
    out_dir: PathBuf,
    timestamp_name: bool,
) -> Result<()> {
    let dashboard = dashboard(api, window)?;
    let sink = DirectorySink::new(out_dir);
    let naming = if timestamp_name {
        ReportName::Timestamp
    } else {
        ReportName::DateRange
    };

    match dashboard.download_report(&sink, naming).await {
        Ok(filename) => {
            println!("Saved {}", sink.dir().join(filename).display());
            Ok(())
        }
        Err(e) => {
            println!("{}", e.notice());
            std::process::exit(1);
        }
    }
}

async fn run_health(api: &HttpRankingApi) -> Result<()> {
    print!("Checking {} backend at {}... ", api.name(), api.config().base_url);

    match api.health_check().await {
        Ok(()) => {
            println!("OK");
            Ok(())
        }
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}
