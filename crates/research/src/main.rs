use std::collections::HashMap;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ptx_research::client::TrustCenterClient;
use ptx_research::config::ResearchConfig;
use ptx_research::deidentify::Stage2Deidentifier;
use ptx_research::rest::{router, AppState};
use ptx_research::sender::FhirStoreSender;
use ptx_research::TransferProcess;

/// Entry point of the research agent.
///
/// # Environment Variables
/// - `PTX_RDA_CONFIG`: path of the YAML configuration file
///   (default: "research.yaml")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ptx=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("PTX_RDA_CONFIG").unwrap_or_else(|_| "research.yaml".into());
    let config = ResearchConfig::from_yaml(&std::fs::read_to_string(&config_path)?)?;

    tracing::info!("++ Starting research agent on {}", config.listen_addr);

    let http = reqwest::Client::new();
    let retry = config.retry();
    let trust_center = Arc::new(TrustCenterClient::new(http.clone(), config.trust_center.clone()));

    let mut processes = HashMap::new();
    for project in &config.projects {
        let process = Arc::new(TransferProcess {
            project: project.name.clone(),
            domain: project.domain.clone(),
            deidentifier: Arc::new(Stage2Deidentifier::new(
                Arc::clone(&trust_center) as _,
                project.domain.clone(),
                retry.clone(),
            )),
            persister: Arc::new(FhirStoreSender::new(
                http.clone(),
                config.research_store.clone(),
                retry.clone(),
            )),
        });
        processes.insert(project.name.clone(), process);
    }

    let app = router(AppState {
        processes: Arc::new(processes),
    })
    .layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
