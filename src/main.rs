use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use update_checker::config::ServerConfig;
use update_checker::store::Store;

#[derive(Parser)]
#[command(name = "update-checker")]
#[command(version, about = "Version-check and usage telemetry server")]
struct Cli {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct Options {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Write logs to this file instead of stdout
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        #[arg(long)]
        bind_address: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the current usage report as JSON
    Report,
}

fn load_config(options: &Options) -> anyhow::Result<ServerConfig> {
    let mut config = match &options.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(database) = &options.database {
        config.database_path = Some(database.clone());
    }
    if let Some(log_file) = &options.log_file {
        config.log_file = Some(log_file.clone());
    }
    Ok(config)
}

fn print_report(config: &ServerConfig) -> anyhow::Result<()> {
    let db_path = config.database_path();
    let store = Store::new(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    let report = store.packages_report(Utc::now())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.options)?;

    let _guard = update_checker::logging::init(config.log_file.as_deref(), cli.options.json_logs)
        .context("Failed to initialize logging")?;

    match cli.command {
        Some(Command::Report) => print_report(&config),
        Some(Command::Serve { bind_address, port }) => {
            if let Some(bind_address) = bind_address {
                config.bind_address = bind_address;
            }
            if let Some(port) = port {
                config.port = port;
            }
            serve(config)
        }
        None => serve(config),
    }
}

fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(update_checker::server::run_server(config))
}
