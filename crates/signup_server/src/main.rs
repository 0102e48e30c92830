//! signup_server: the registration mock, the goal mock and the signup API in
//! one process.
//!
//! Configuration comes from `SIGNUP_CONFIG` (YAML) and `SIGNUP_*` variables;
//! see `signup_core::config`.

use anyhow::Context;
use signup_core::config::SignupConfig;
use signup_server::{build_router, AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,signup_server=debug".into()),
        )
        .init();

    let config = SignupConfig::load()?;
    tracing::info!(
        demo_id = %config.demo_id,
        default_user = %config.default_user,
        lookup_failure = ?config.lookup_failure,
        "configuration loaded"
    );

    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("signup_server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::warn!(error = %e, "no ctrl-c handler, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
