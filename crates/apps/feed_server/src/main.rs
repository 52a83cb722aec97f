use anyhow::Context;
use feed_server::{router, FeedServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = FeedServerConfig::from_env()?;
    let addr = config.addr;
    info!(
        fixtures = %config.fixtures.display(),
        failing = config.failing.len(),
        "hazard feed server listening on http://{addr}"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(listener, router(config))
        .await
        .context("server error")?;
    Ok(())
}
