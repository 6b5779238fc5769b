//! soaptap demo host.
//!
//! Serves the bundled calculator over SOAP/HTTP with message logging
//! attached to every endpoint.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use tracing_subscriber::{fmt, EnvFilter};

use soaptap_inspector::config::{self, Settings};
use soaptap_inspector::pipeline::Interceptor;
use soaptap_inspector::{app_state, router};

const CONFIG_ENV: &str = "SOAPTAP_CONFIG";
const DEFAULT_CONFIG: &str = "soaptap.yaml";
const LISTEN_KEY: &str = "Listen";
const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "soaptap host failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let layers = config::load_from_file(&path)?;
    let settings = Settings::from_lookup(&layers, &config::base_dir(), Local::now().date_naive())?;
    let listen: SocketAddr = layers.get_string(LISTEN_KEY, DEFAULT_LISTEN).parse()?;

    tracing::info!(
        logging = settings.logging_enabled,
        dir = %settings.log_directory.display(),
        max_bytes = settings.max_buffer_bytes,
        "message logging configured"
    );

    let interceptor = Arc::new(Interceptor::new(settings));
    let state = app_state::AppState::new(interceptor);
    let app = router::build_router(state);

    tracing::info!(%listen, "soaptap host starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
