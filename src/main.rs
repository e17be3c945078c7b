//! tts-gateway server - HTTP API for single-flight speech synthesis

use std::process::ExitCode;

use clap::Parser;
use tokio::signal;

use tts_gateway::config::ServerConfig;
use tts_gateway::engines::{self, LoadError};
use tts_gateway::gateway::GatewayConfigBuilderError;
use tts_gateway::server::{create_router, AppState};
use tts_gateway::SingleFlightGateway;

#[derive(thiserror::Error, Debug)]
enum BootError {
    #[error("failed to load synthesis engine: {0}")]
    Engine(#[from] LoadError),
    #[error("invalid gateway configuration: {0}")]
    Config(#[from] GatewayConfigBuilderError),
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let config = ServerConfig::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();

    // Request intake is a single cooperative thread; inference runs on the
    // blocking pool.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(usize::from(config.blocking_threads))
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), BootError> {
    log::info!("Initializing '{}' synthesis engine", config.engine);
    let capability = engines::load(&config.engine)?;

    let gateway = SingleFlightGateway::new(capability, config.gateway_config()?);
    if !config.default_voice.is_file() {
        log::warn!(
            "Default voice {} does not exist; requests without voice_path will fail",
            config.default_voice.display()
        );
    }
    let state = AppState::new(gateway, config.default_voice.clone())
        .with_max_text_chars(config.max_text_chars);
    let app = create_router(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::warn!("Ctrl+C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => log::info!("Received SIGTERM, shutting down..."),
    }
}
