//! Serve command - run the web frontend

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bankfront_core::adapters::web;
use bankfront_core::config::Config;
use bankfront_core::services::EntryPoint;
use bankfront_core::FrontendContext;
use tracing::info;

use super::get_bankfront_dir;

pub fn run(addr: &str, demo: bool, settings: Option<&Path>) -> Result<()> {
    let config = Config::load(settings)?;
    let ctx = if demo {
        FrontendContext::demo(config)?
    } else {
        FrontendContext::connect(config)?
    };
    let ctx = ctx.with_event_log(&get_bankfront_dir()?, EntryPoint::Server)?;
    if let Some(log) = &ctx.event_log {
        let _ = log.log_command("serve");
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(serve(Arc::new(ctx), addr))
}

async fn serve(ctx: Arc<FrontendContext>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting frontend on {}", listener.local_addr()?);

    axum::serve(listener, web::router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}
