use std::sync::Arc;

use tokio::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ptx_trust_center::config::TrustCenterConfig;
use ptx_trust_center::gpas::GpasClient;
use ptx_trust_center::rest::{router, AppState};
use ptx_trust_center::tid::TransportIdGenerator;
use ptx_trust_center::{InMemoryStore, PseudonymIssuer};

/// Entry point of the trust-center agent.
///
/// # Environment Variables
/// - `PTX_TCA_CONFIG`: path of the YAML configuration file
///   (default: "trust-center.yaml")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ptx=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path =
        std::env::var("PTX_TCA_CONFIG").unwrap_or_else(|_| "trust-center.yaml".into());
    let config = TrustCenterConfig::from_yaml(&std::fs::read_to_string(&config_path)?)?;

    tracing::info!("++ Starting trust-center agent on {}", config.listen_addr);

    let issuer = Arc::new(PseudonymIssuer::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(GpasClient::new(reqwest::Client::new(), config.gpas.clone())),
        TransportIdGenerator::from_entropy(),
        Duration::from_secs(config.transport_id_ttl_secs),
    ));

    let app = router(AppState { issuer }).layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
