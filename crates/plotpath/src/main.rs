use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use plotpath::app::{build_service, resolve_data_dir, DataLayout};
use plotpath::config::{load_config, Config};
use plotpath::server::{build_router, listen_address, serve, AppState};
use plotpath::PlotpathError;

/// Image to plotter G-code conversion service.
#[derive(Debug, Parser)]
#[command(name = "plotpath", version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, `host:port` or `:port`
    #[arg(long)]
    listen: Option<String>,

    /// Data directory for uploads and the AI cache
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Hostname shown by the index route
    #[arg(long, env = "HOSTNAME")]
    hostname: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_json) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))?;
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt::layer()))?;
    }

    // Route `log` records from the database layer into tracing.
    tracing_log::LogTracer::init()?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), PlotpathError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    if let Some(dir) = cli.data_dir {
        config.data_directory = Some(dir.display().to_string());
    }
    if let Some(hostname) = cli.hostname {
        config.server.hostname = Some(hostname);
    }

    let layout = DataLayout::new(resolve_data_dir(config.data_directory.as_deref()));
    info!("Data directory: {}", layout.root.display());
    let service = build_service(&config, &layout)?;

    let state = AppState {
        service: service.clone(),
        hostname: config
            .server
            .hostname
            .clone()
            .unwrap_or_else(|| "localhost".to_string()),
    };
    let router = build_router(state, config.upload.max_upload_bytes);

    let addr = listen_address(&config.server.listen);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(PlotpathError::Server)?;
    info!("Listening on {}", addr);

    serve(listener, router, shutdown_signal())
        .await
        .map_err(PlotpathError::Server)?;

    service.launcher().shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown requested, waiting for running jobs");
}
