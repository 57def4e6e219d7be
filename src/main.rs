use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tunelake::{
    api::{create_router, AppState},
    services::{
        load_catalog, KafkaEventSource, LogSink, ObjectStoreCatalogSource, StatusHandle,
        StreamDriver,
    },
    AppError, Config, PipelineContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let status = StatusHandle::new();
    tracing::info!(
        topic = %config.kafka_topic,
        bootstrap = %config.kafka_bootstrap_servers,
        offset_reset = config.kafka_offset_reset.as_str(),
        trigger_interval_ms = config.trigger_interval_ms,
        max_batch_size = config.max_batch_size,
        "Starting song recommender stream"
    );

    // Startup failures are fatal; nothing is retried
    let (catalog, source) = match initialize(&config).await {
        Ok(parts) => parts,
        Err(e) => {
            status.fail(e.to_string()).await;
            return Err(e).context("startup failed");
        }
    };
    let catalog = Arc::new(catalog);

    if config.status_api_enabled {
        let app = create_router(AppState::new(catalog.clone(), status.clone()));
        let listener = tokio::net::TcpListener::bind(config.status_addr())
            .await
            .with_context(|| format!("failed to bind status API on {}", config.status_addr()))?;
        tracing::info!(addr = %config.status_addr(), "Status API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Status API stopped");
            }
        });
    }

    let ctx = PipelineContext::new(
        catalog,
        Arc::new(LogSink::new(config.display_limit)),
        config.decode_policy,
    );
    let (driver, handle) = StreamDriver::new(ctx, Box::new(source), status);
    let mut run = tokio::spawn(driver.run());

    tokio::select! {
        result = &mut run => {
            return result.context("stream driver task panicked")?.context("stream driver failed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl-C received, shutting down");
            handle.shutdown().await;
        }
    }

    run.await
        .context("stream driver task panicked")?
        .context("stream driver failed")
}

async fn initialize(config: &Config) -> Result<(tunelake::models::Catalog, KafkaEventSource), AppError> {
    let catalog_source = ObjectStoreCatalogSource::from_config(config)?;
    let catalog = load_catalog(&catalog_source).await?;
    let event_source = KafkaEventSource::from_config(config)?;
    Ok((catalog, event_source))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tunelake=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
