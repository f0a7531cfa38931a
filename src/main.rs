use actix_web::{web, App, HttpServer};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use loadforge_runner::utils::duration::parse_duration_secs;
use loadforge_runner::{executor, report, ws, RunConfig};

#[derive(Parser)]
#[command(name = "loadforge-runner")]
#[command(version)]
#[command(about = "Closed-model HTTP load runner", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one load test and print the summary
    Run(RunArgs),

    /// Accept run configurations over a WebSocket at /ws
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target URL
    #[arg(short, long)]
    target: Option<String>,

    /// Number of virtual users
    #[arg(long)]
    vus: Option<u64>,

    /// Run duration, e.g. 300, 30s, 5m, 1m30s
    #[arg(short, long, value_parser = parse_duration_flag)]
    duration: Option<u64>,

    /// Aggregate requests-per-second cap (0 = unlimited)
    #[arg(long)]
    rps: Option<u64>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Status code the check expects
    #[arg(long)]
    expected_status: Option<u16>,

    /// Write the final report as JSON to this path
    #[arg(long)]
    summary_export: Option<PathBuf>,
}

fn parse_duration_flag(s: &str) -> Result<u64, String> {
    parse_duration_secs(s).map_err(|e| e.to_string())
}

impl RunArgs {
    fn resolve(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)?,
            None => RunConfig::default(),
        };
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(vus) = self.vus {
            config.vus = vus;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(rps) = self.rps {
            config.rps = rps;
        }
        if let Some(timeout) = self.timeout_ms {
            config.timeout = Some(timeout);
        }
        if let Some(status) = self.expected_status {
            config.expected_status = status;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Run(args) => {
            let config = args.resolve().context("invalid run configuration")?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start tokio runtime")?;
            let metrics = runtime.block_on(executor::run_load_test(config))?;

            report::print_summary(&metrics);
            if let Some(path) = &args.summary_export {
                report::export_summary(&metrics, path)?;
                println!("{} {}", "summary written to".bold(), path.display());
            }
            Ok(())
        }
        Commands::Serve { bind } => {
            actix_web::rt::System::new().block_on(serve(bind))?;
            Ok(())
        }
    }
}

async fn serve(bind: String) -> std::io::Result<()> {
    tracing::info!("worker listening on ws://{}/ws", bind);

    HttpServer::new(|| App::new().route("/ws", web::get().to(ws::ws_handler)))
        .bind(bind.as_str())?
        .run()
        .await
}
