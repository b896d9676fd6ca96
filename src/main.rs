//! CLI entry point for the bus tracker client.
//!
//! Each subcommand maps to one client operation and prints the resulting
//! records as labelled text or JSON.

use std::ffi::OsStr;
use std::path::Path;

use anyhow::{Result, bail};
use bustracker::output::print_records;
use bustracker::{Client, Config, PredictionQuery, estimate_minutes_remaining, format_timestamp};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "bustracker")]
#[command(about = "Query the CTA Bus Tracker API", long_about = None)]
struct Cli {
    /// Print JSON instead of labelled text
    #[arg(long, global = true)]
    json: bool,

    /// JSON config file; defaults to BUSTRACKER_* environment variables
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the API's current time
    Time,
    /// List all routes
    Routes,
    /// List the directions a route runs in
    Directions {
        #[arg(value_name = "ROUTE")]
        route: String,
    },
    /// List the stops of a route in one direction
    Stops {
        #[arg(value_name = "ROUTE")]
        route: String,

        /// Exact API spelling, e.g. "North Bound"
        #[arg(value_name = "DIRECTION")]
        direction: String,
    },
    /// Show route patterns by id or by route and direction
    Patterns {
        /// Pattern ids (comma separated, up to 10)
        #[arg(long = "pid", value_delimiter = ',')]
        pattern_ids: Vec<u32>,

        #[arg(long, requires = "direction")]
        route: Option<String>,

        #[arg(long, requires = "route")]
        direction: Option<String>,
    },
    /// Show vehicle positions by vehicle id or route
    Vehicles {
        /// Vehicle ids (comma separated, up to 10)
        #[arg(long = "vid", value_delimiter = ',')]
        vehicle_ids: Vec<u32>,

        /// Routes (comma separated, up to 10)
        #[arg(long = "route", value_delimiter = ',')]
        routes: Vec<String>,
    },
    /// Show arrival/departure predictions for stops or vehicles
    Predictions {
        /// Stop ids (comma separated, up to 10)
        #[arg(long = "stop", value_delimiter = ',')]
        stop_ids: Vec<u32>,

        /// Vehicle ids (comma separated, up to 10)
        #[arg(long = "vehicle", value_delimiter = ',')]
        vehicle_ids: Vec<u32>,

        /// Only predictions for these routes (stop queries only)
        #[arg(long = "route", value_delimiter = ',')]
        routes: Vec<String>,

        /// Maximum number of predictions
        #[arg(long)]
        top: Option<u32>,

        /// Also log minutes remaining against the API clock
        #[arg(long, default_value_t = false)]
        live: bool,
    },
    /// Show service bulletins for routes or stops
    Bulletins {
        /// Routes (comma separated, up to 10)
        #[arg(long = "route", value_delimiter = ',')]
        routes: Vec<String>,

        /// Stop ids (comma separated, up to 10)
        #[arg(long = "stop", value_delimiter = ',')]
        stop_ids: Vec<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: coloured stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/bustracker.log".to_string());
    let log_dir = Path::new(&log_file_path).parent().unwrap_or(Path::new("logs"));
    let log_file_name =
        Path::new(&log_file_path).file_name().unwrap_or(OsStr::new("bustracker.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry().with(stderr_layer).with(json_layer).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    info!(base_url = %config.base_url, timezone = %config.timezone, "Client configured");
    let client = Client::from_config(config)?;

    match cli.command {
        Commands::Time => {
            let now = client.system_time().await?;
            print_records(&[format_timestamp(&now)], cli.json)?;
        }
        Commands::Routes => {
            print_records(&client.routes().await?, cli.json)?;
        }
        Commands::Directions { route } => {
            print_records(&client.route_directions(&route).await?, cli.json)?;
        }
        Commands::Stops { route, direction } => {
            print_records(&client.route_stops(&route, &direction).await?, cli.json)?;
        }
        Commands::Patterns { pattern_ids, route, direction } => {
            let patterns = match (pattern_ids.is_empty(), route, direction) {
                (false, None, None) => client.patterns_by_id(&pattern_ids).await?,
                (true, Some(route), Some(direction)) => {
                    client.route_patterns(&route, &direction).await?
                }
                _ => bail!("give either --pid or --route with --direction"),
            };
            print_records(&patterns, cli.json)?;
        }
        Commands::Vehicles { vehicle_ids, routes } => {
            let vehicles = match (vehicle_ids.is_empty(), routes.is_empty()) {
                (false, true) => client.vehicles_by_id(&vehicle_ids).await?,
                (true, false) => {
                    let routes: Vec<&str> = routes.iter().map(String::as_str).collect();
                    client.vehicles_by_route(&routes).await?
                }
                _ => bail!("give either --vid or --route"),
            };
            print_records(&vehicles, cli.json)?;
        }
        Commands::Predictions { stop_ids, vehicle_ids, routes, top, live } => {
            let query = PredictionQuery { stop_ids, vehicle_ids, routes, top };
            let predictions = client.predictions(&query).await?;

            if live && !predictions.is_empty() {
                let now = client.system_time().await?;
                for p in &predictions {
                    info!(
                        route = %p.route,
                        stop_id = p.stop_id,
                        vehicle_id = p.vehicle_id,
                        at_creation = p.minutes_at_creation(),
                        remaining = estimate_minutes_remaining(p, now),
                        "Minutes to arrival"
                    );
                }
            }
            print_records(&predictions, cli.json)?;
        }
        Commands::Bulletins { routes, stop_ids } => {
            let bulletins = match (routes.is_empty(), stop_ids.is_empty()) {
                (false, true) => {
                    let routes: Vec<&str> = routes.iter().map(String::as_str).collect();
                    client.bulletins_for_routes(&routes).await?
                }
                (true, false) => client.bulletins_for_stops(&stop_ids).await?,
                _ => bail!("give either --route or --stop"),
            };
            print_records(&bulletins, cli.json)?;
        }
    }

    Ok(())
}
