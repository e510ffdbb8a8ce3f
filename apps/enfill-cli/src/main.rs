use clap::{Parser, Subcommand};
use enfill_application::config::{load_config, Config};
use enfill_domain::errors::ErrorClass;
use std::net::SocketAddr;
use std::path::PathBuf;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "enfill")]
#[command(about = "Fills gaps in energy meter time series.", version)]
struct Cli {
    /// Config file path (TOML). If omitted, uses env ENFILL_CONFIG, then
    /// built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline over a CSV or XLSX file and write the filled
    /// 15-minute series.
    Fill {
        /// Input table (.csv or .xlsx).
        input: PathBuf,

        /// Output CSV path.
        #[arg(long, default_value = "filled.csv")]
        out: PathBuf,

        /// Also upsert the filled series into Postgres ([db] must be
        /// configured).
        #[arg(long)]
        store: bool,
    },

    /// Normalize a table and report its frequency and gap profile without
    /// imputing anything.
    Inspect {
        /// Input table (.csv or .xlsx).
        input: PathBuf,
    },

    /// Apply SQL migrations in lexical order.
    Migrate {
        /// Postgres connection string. Falls back to the [db] config section.
        #[arg(long)]
        db_url: Option<String>,

        /// Directory containing .sql migration files.
        #[arg(long, default_value = "migrations")]
        migrations: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(|| {
        std::env::var("ENFILL_CONFIG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });
    let config = match config_path {
        Some(path) => match load_config(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if let Err(err) = init_tracing(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = init_metrics() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Fill { input, out, store } => commands::run_fill(&config, &input, &out, store),
        Command::Inspect { input } => commands::run_inspect(&input),
        Command::Migrate { db_url, migrations } => {
            commands::run_migrate(&config, db_url.as_deref(), &migrations)
        }
    };

    match result {
        Ok(json) => {
            println!(
                "{}",
                serde_json::to_string(&json)
                    .unwrap_or_else(|_| "{\"status\":\"error\",\"error\":\"json\"}".to_string())
            );
        }
        Err(err) => {
            let code = match err.class() {
                ErrorClass::Client => 2,
                ErrorClass::Internal => 1,
            };
            eprintln!("error: {err}");
            std::process::exit(code);
        }
    }
}

fn init_tracing(config: &Config) -> Result<(), String> {
    let filter = std::env::var("ENFILL_LOG").unwrap_or_else(|_| config.log.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    match config.log.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init(),
        "text" => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
        other => return Err(format!("unknown log format '{other}' (expected text|json)")),
    }
    Ok(())
}

#[cfg(feature = "prometheus")]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = std::env::var("ENFILL_METRICS_ADDR").ok() else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let addr: SocketAddr = raw
        .parse()
        .map_err(|err| format!("invalid ENFILL_METRICS_ADDR (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics() -> Result<Option<SocketAddr>, String> {
    Ok(None)
}
