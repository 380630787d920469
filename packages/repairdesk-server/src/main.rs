mod app;
mod bootstrap;
mod db;
mod error;
mod routes;
mod services;
mod state;

use crate::bootstrap::config::ServerConfig;
use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(clap::Parser)]
#[command(name = "repairdesk-server", about = "repairdesk settings and notification server")]
struct CliArgs {
    /// 监听地址，覆盖 REPAIRDESK_ADDR
    #[clap(long)]
    addr: Option<String>,
    /// 数据库连接串，覆盖 REPAIRDESK_DB_URL
    #[clap(long)]
    db_url: Option<String>,
    /// 只执行迁移和默认设置初始化，然后退出
    #[clap(long)]
    seed_only: bool,
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = ServerConfig::from_env()?
        .with_overrides(args.addr.as_deref(), args.db_url.as_deref())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { repairdesk_service(config, args.seed_only).await })?;

    Ok(())
}

async fn repairdesk_service(config: ServerConfig, seed_only: bool) -> anyhow::Result<()> {
    let settings = bootstrap::app::prepare_settings(&config).await?;
    if seed_only {
        info!("settings initialized, exiting");
        return Ok(());
    }

    let state = Arc::new(bootstrap::app::app_state(&config, settings));
    let notifier = state.notifier.clone();
    let app = app::axum_app(state);

    let tcp_listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!(addr = %config.addr, "repairdesk started");

    axum::serve(tcp_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    notifier.shutdown(config.shutdown_grace).await;
    info!("repairdesk stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
