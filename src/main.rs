use clap::Parser;
use lmstudio_proxy::config::config_search_paths;
use lmstudio_proxy::{build_router, AppState, ProxyConfig, SharedLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILE: &str = "lmstudio-proxy.log";

#[derive(Parser)]
#[command(
    name = "lmstudio-proxy",
    about = "Serve the LM Studio REST API on top of an OpenAI-compatible backend",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend base URL, e.g. http://localhost:8000 (overrides config and environment)
    #[arg(long)]
    backend_url: Option<String>,

    /// Model id reported for backend models without one
    #[arg(long)]
    default_model: Option<String>,

    /// Request log file (JSONL)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lmstudio_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    config.apply_env()?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }
    if let Some(alias) = cli.default_model {
        config.backend.default_model_alias = alias;
    }
    if let Some(path) = cli.log_file {
        config.log_file = Some(path);
    }

    config.validate()?;

    let log_file = config
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
    let logger = SharedLogger::new(&log_file)?;

    info!("╔═══════════════════════════════════════════════════════╗");
    info!("║           lmstudio-proxy v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚═══════════════════════════════════════════════════════╝");
    info!("  Backend:        {}", config.backend.base_url);
    info!("  Default model:  {}", config.backend.default_model_alias);
    info!("  Port:           {}", config.port);
    info!("  Log file:       {}", log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting lmstudio-proxy backend={} port={}",
            config.backend.base_url, config.port
        ),
    );

    let port = config.port;
    let state = Arc::new(AppState::new(config, logger.clone())?);

    let app = build_router(state.clone());
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("");
    info!("  Point your LM Studio client at http://localhost:{}/api/v0", port);
    info!("");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logger.info("startup", "Proxy shutting down");
    drop(state);
    logger.info("startup", "HTTP client closed");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
