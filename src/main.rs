//! report-engine: command-line front end for the report engine
//!
//! Connects to the analytics backend, loads the column metadata and runs one
//! chart, pivot or recast operation. Results are printed as JSON on stdout,
//! logs go to stderr (`RUST_LOG`, default `info`).

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use report_engine::backend::{AnalyticsClient, RecastTarget};
use report_engine::report::{
    filter_value, Aggregator, ChartKind, PreferenceStore, ReportTab, ReportView, Zone,
};
use report_engine::{EngineConfig, EngineError};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "report-engine", version, about = "Charts and pivot tables over an analytics backend")]
struct Cli {
    /// Backend base URL (overrides REPORT_BACKEND_URI)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Bearer token (overrides REPORT_BACKEND_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the column catalog
    Columns,

    /// Generate a chart and print its plot specification
    Chart {
        #[arg(long)]
        x: String,
        #[arg(long)]
        y: Option<String>,
        #[arg(long)]
        kind: Option<ChartKind>,
        #[arg(long)]
        title: Option<String>,
        /// Cross-filter as COL=VAL, repeatable
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
    },

    /// Generate a pivot table and print its grid
    Pivot {
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
        /// Value fields as COL or COL:AGG
        #[arg(long, value_delimiter = ',', required = true)]
        values: Vec<String>,
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
    },

    /// Change column types (COL=text|decimal|integer) and print the new catalog
    Recast {
        #[arg(value_parser = parse_pair, required = true)]
        changes: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<EngineError>() {
            Some(engine) => engine.user_message(),
            None => format!("{:#}", e),
        };
        eprintln!("✗ {}", message);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::from_env();
    if let Some(url) = cli.backend {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    if cli.token.is_some() {
        config.token = cli.token;
    }

    let store = PreferenceStore::new(config.preferences_path.clone());
    let client = AnalyticsClient::new(config)?;
    let mut view = ReportView::mount(Arc::new(client), store).await?;

    match cli.command {
        Command::Columns => print_columns(&view),
        Command::Chart {
            x,
            y,
            kind,
            title,
            filters,
        } => {
            remember_tab(&mut view, ReportTab::Charts);
            apply_filters(&mut view, &filters).await?;
            view.set_x(Some(x.as_str()))?;
            view.set_y(y.as_deref())?;
            if let Some(kind) = kind {
                view.set_kind(kind)?;
            }
            if let Some(title) = title {
                view.set_title(title);
            }
            view.generate_chart().await?;
            match view.plot_spec() {
                Some(spec) => println!("{}", serde_json::to_string_pretty(&spec)?),
                None => println!("No data for this selection"),
            }
        }
        Command::Pivot {
            rows,
            columns,
            values,
            filters,
        } => {
            remember_tab(&mut view, ReportTab::Pivot);
            apply_filters(&mut view, &filters).await?;
            for column in &rows {
                view.assign(column, Zone::Rows)?;
            }
            for column in &columns {
                view.assign(column, Zone::Columns)?;
            }
            for field in &values {
                let (column, aggregator) = parse_value_field(field)?;
                view.assign(column, Zone::Values)?;
                view.set_aggregator(column, aggregator)?;
            }
            view.generate_pivot().await?;
            match view.pivot_grid() {
                Some(grid) => println!("{}", serde_json::to_string_pretty(&grid)?),
                None => println!("No data for this selection"),
            }
        }
        Command::Recast { changes } => {
            let changes = changes
                .into_iter()
                .map(|(column, target)| -> Result<(String, RecastTarget)> {
                    let target = target.parse().map_err(|e: String| anyhow!(e))?;
                    Ok((column, target))
                })
                .collect::<Result<Vec<_>>>()?;
            view.recast(&changes).await?;
            print_columns(&view);
        }
    }
    Ok(())
}

fn remember_tab(view: &mut ReportView, tab: ReportTab) {
    if let Err(e) = view.switch_tab(tab) {
        tracing::warn!(error = %e, "Could not persist active tab");
    }
}

async fn apply_filters(view: &mut ReportView, filters: &[(String, String)]) -> Result<()> {
    for (column, raw) in filters {
        let value = filter_value(view.catalog().dtype_of(column), raw);
        let refresh = view.add_filter(column, value)?;
        view.refresh(refresh).await?;
    }
    Ok(())
}

fn print_columns(view: &ReportView) {
    println!("{:<32} {:<10} {}", "column", "type", "backend type");
    for column in view.catalog().iter() {
        println!(
            "{:<32} {:<10} {}",
            column.name,
            format!("{:?}", column.dtype),
            column.backend_tag
        );
    }
}

fn parse_pair(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected COL=VALUE, got '{}'", s)),
    }
}

fn parse_value_field(s: &str) -> Result<(&str, Aggregator)> {
    match s.split_once(':') {
        Some((column, aggregator)) => {
            let aggregator = aggregator.parse().map_err(|e: String| anyhow!(e))?;
            Ok((column.trim(), aggregator))
        }
        None => Ok((s.trim(), Aggregator::default())),
    }
}
