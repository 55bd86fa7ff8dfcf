use std::sync::Arc;

use kiln_api::{ApiConfig, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kiln_observability::init();

    let config = ApiConfig::from_env()?;
    let services = Arc::new(app::services::build_services(config.broker.clone())?);
    let broker = services.broker.clone();
    let router = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    broker.shutdown().await;
    Ok(())
}
