//! ratewatch gateway
//!
//! - Token-bucket rate limiters declared in YAML
//! - Event history: /{prefix}/events[/:name[/:type]]
//! - Live events (SSE): /{prefix}/stream/events[/:name[/:type]]
//! - Ops: /healthz, /metrics

use std::error::Error;
use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use ratewatch_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "ratewatch-gateway exited");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let path = config::resolve_path(std::env::var(config::CONFIG_ENV).ok());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse()?;

    let app = router::build_router(AppState::new(cfg)?);
    let listener = TcpListener::bind(listen).await?;

    tracing::info!(%listen, config = %path.display(), "ratewatch-gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
