//! Trellis command line: lay out one small chart per facet of a table

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis_core::{Domain, SortDirection};
use trellis_data::{CsvSource, DataSource, SalesDemoSource, TrellisConfig};

mod app;
mod commands;
mod render;

use app::{GridSpec, TrellisApp};
use render::grid_columns;

/// Small-multiples viewer for CSV data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV file to load; synthetic sales data when omitted
    #[arg(long)]
    csv: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Column to facet by; repeat for a composite label
    #[arg(long = "facet")]
    facets: Vec<String>,

    /// Numeric column for metrics and the shared scale
    #[arg(long)]
    value: Option<String>,

    /// default, sum, max, min, mean, count, deviation or trend
    #[arg(long)]
    sort: Option<String>,

    /// asc or desc
    #[arg(long)]
    direction: Option<SortDirection>,

    /// Initial search query
    #[arg(long)]
    query: Option<String>,

    /// Scale every chart to its own values
    #[arg(long)]
    no_shared_scale: bool,

    /// Fixed value domain, e.g. "0,10000"
    #[arg(long, value_parser = parse_domain, allow_hyphen_values = true)]
    y_domain: Option<Domain>,

    /// Charts per row; derived from --width when omitted
    #[arg(long)]
    columns: Option<usize>,

    /// Available width in pixels
    #[arg(long, default_value = "1200")]
    width: u32,

    /// Grid rows in view at once
    #[arg(long, default_value = "3")]
    visible_rows: usize,

    /// Read commands from stdin after the first render
    #[arg(short, long)]
    interactive: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_domain(value: &str) -> Result<Domain, String> {
    let (min, max) = value
        .split_once(',')
        .ok_or_else(|| format!("expected 'min,max', got '{}'", value))?;
    let min: f64 = min.trim().parse().map_err(|_| format!("invalid minimum '{}'", min))?;
    let max: f64 = max.trim().parse().map_err(|_| format!("invalid maximum '{}'", max))?;
    if min > max {
        return Err(format!("minimum {} is above maximum {}", min, max));
    }
    Ok(Domain::new(min, max))
}

/// Config file (or defaults) with command line flags applied on top
fn resolve_config(args: &Args) -> Result<TrellisConfig> {
    let mut config = match &args.config {
        Some(path) => TrellisConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TrellisConfig::default(),
    };

    if !args.facets.is_empty() {
        config.facet_columns = args.facets.clone();
    }
    if let Some(value) = &args.value {
        config.value_column = Some(value.clone());
    }
    if let Some(sort) = &args.sort {
        config.sort_by = sort.clone();
    }
    if let Some(direction) = args.direction {
        config.direction = direction;
    }
    if let Some(query) = &args.query {
        config.query = query.clone();
    }
    if args.no_shared_scale {
        config.shared_scale = false;
    }
    if args.y_domain.is_some() {
        config.y_domain = args.y_domain;
    }

    // The demo data has a known shape
    if args.csv.is_none() {
        if config.facet_columns.is_empty() {
            config.facet_columns = vec!["region".to_string(), "category".to_string()];
        }
        if config.value_column.is_none() {
            config.value_column = Some("revenue".to_string());
        }
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = resolve_config(&args)?;

    let source: Box<dyn DataSource> = match &args.csv {
        Some(path) => Box::new(
            CsvSource::new(path.clone(), config.null_config.clone())
                .await
                .with_context(|| format!("Failed to load {}", path.display()))?,
        ),
        None => Box::new(SalesDemoSource::new()),
    };
    let rows = source.load_rows().await?;
    info!("Faceting {} by {}", source.source_name(), config.facet_columns.join(", "));

    let grid = GridSpec {
        columns: args
            .columns
            .unwrap_or_else(|| grid_columns(args.width, config.min_chart_width)),
        visible_rows: args.visible_rows,
        chart_height: config.chart_height,
    };

    let mut app = TrellisApp::new(rows, &config, grid)?;
    print!("{}", app.render()?);
    info!("{} rows in {} charts", app.state().rows().len(), app.state().facet_index()?.len());

    if args.interactive {
        app.run_interactive().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domain() {
        assert_eq!(parse_domain("0,100").unwrap(), Domain::new(0.0, 100.0));
        assert_eq!(parse_domain("-5, 5").unwrap(), Domain::new(-5.0, 5.0));
        assert!(parse_domain("100").is_err());
        assert!(parse_domain("10,1").is_err());
        assert!(parse_domain("a,1").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "trellis",
            "--facet",
            "region",
            "--sort",
            "trend",
            "--direction",
            "desc",
            "--no-shared-scale",
            "--y-domain",
            "0,500",
        ]);
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.facet_columns, vec!["region".to_string()]);
        assert_eq!(config.value_column.as_deref(), Some("revenue"));
        assert_eq!(config.sort_by, "trend");
        assert_eq!(config.direction, SortDirection::Desc);
        assert!(!config.shared_scale);
        assert_eq!(config.y_domain, Some(Domain::new(0.0, 500.0)));
    }

    #[test]
    fn test_csv_requires_facet_column() {
        let args = Args::parse_from(["trellis", "--csv", "sales.csv"]);
        let config = resolve_config(&args).unwrap();
        assert!(config.facet_key::<trellis_data::TableRow>().is_err());
    }

    #[test]
    fn test_unknown_sort_flag() {
        let args = Args::parse_from(["trellis", "--sort", "median"]);
        assert!(resolve_config(&args).is_err());
    }
}
