//! Storefront checkout - cart, discount, order and payment service

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_checkout::config::AppConfig;
use storefront_checkout::events::{EventPublisher, LogPublisher, NatsPublisher};
use storefront_checkout::http::{router, AppState};
use storefront_checkout::payment::ZarinpalGateway;
use storefront_checkout::services::Services;
use storefront_checkout::store::{MemoryStore, PgStore, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let stores = match &config.database_url {
        Some(url) => Stores::postgres(Arc::new(PgStore::connect(url, config.max_connections).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            Stores::in_memory(Arc::new(MemoryStore::new()))
        }
    };

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client, config.event_prefix.clone())),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, logging domain events instead");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let gateway = Arc::new(ZarinpalGateway::new(config.gateway.clone())?);
    let services = Services::new(&stores, gateway, events, config.payment.clone());
    let app = router(AppState { services, users: stores.users.clone() });

    tracing::info!(sandbox = config.gateway.sandbox, "Storefront checkout listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
