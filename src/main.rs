use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use wlo_dedup::api;
use wlo_dedup::core::config::Config;
use wlo_dedup::core::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
        tracing_subscriber::EnvFilter::new(format!("{},tower_http=warn", level.to_lowercase()))
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting wlo-dedup duplicate-detection service");

    let config = Config::from_env();

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .connect_timeout(config.http_connect_timeout)
        .build()?;

    if config.admin_api_key.is_none() {
        warn!("ADMIN_API_KEY is not set — /admin/cache/clear will return 500 until it is configured");
    }

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(http_client, config));

    let app = api::build_router(state.clone());

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or set BIND_ADDR to a free address.",
                bind_addr
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("wlo-dedup listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(ref mut s) = sigint {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received, draining in-flight requests");
}
