use std::sync::Arc;

use anyhow::Context;

use atelier_api::app::{AppServices, build_app};
use atelier_api::config::AppConfig;
use atelier_infra::InMemoryDirectory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    atelier_observability::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let directory = Arc::new(InMemoryDirectory::new());
    if let Some(admin) = &config.bootstrap {
        directory
            .add_super_admin(&admin.email, &admin.name, &admin.password)
            .context("failed to seed bootstrap super-admin")?;
        tracing::info!(email = %admin.email, "bootstrap super-admin seeded");
    }

    let services = AppServices::new(&config, directory).map_err(|e| {
        tracing::error!(code = e.code(), error = %e, "refusing to start");
        e
    })?;

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
