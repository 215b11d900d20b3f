use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ptx_api::traits::PinnedCohortSelector;
use ptx_api::ConsentedPatient;
use ptx_clinical::client::TrustCenterClient;
use ptx_clinical::config::ClinicalConfig;
use ptx_clinical::deidentify::Stage1Deidentifier;
use ptx_clinical::rest::{router, AppState};
use ptx_clinical::selectors::EverythingDataSelector;
use ptx_clinical::sender::ResearchAgentSender;
use ptx_clinical::{TransferProcess, TransferRunner};

/// Entry point of the clinical agent.
///
/// # Environment Variables
/// - `PTX_CDA_CONFIG`: path of the YAML configuration file
///   (default: "clinical.yaml")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ptx=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("PTX_CDA_CONFIG").unwrap_or_else(|_| "clinical.yaml".into());
    let config = ClinicalConfig::from_yaml(&std::fs::read_to_string(&config_path)?)?;

    tracing::info!("++ Starting clinical agent on {}", config.listen_addr);

    let http = reqwest::Client::new();
    let retry = config.retry();
    let trust_center = Arc::new(TrustCenterClient::new(http.clone(), config.trust_center.clone()));

    let mut processes = HashMap::new();
    for project in &config.projects {
        let cohort = project
            .cohort
            .iter()
            .map(|patient| {
                let policies = if patient.policies.is_empty() {
                    project.policies.clone()
                } else {
                    patient.policies.clone()
                };
                ConsentedPatient::new(patient.id.clone(), policies)
            })
            .collect();

        let process = Arc::new(TransferProcess {
            project: project.name.clone(),
            domain: project.domain.clone(),
            policies: project.policies.clone(),
            cohort_selector: Arc::new(PinnedCohortSelector::new(cohort)),
            data_selector: Arc::new(EverythingDataSelector::new(
                http.clone(),
                config.clinical_store.clone(),
            )),
            deidentifier: Arc::new(Stage1Deidentifier::new(
                Arc::clone(&trust_center) as _,
                project.domain.clone(),
                retry.clone(),
            )),
            bundle_sender: Arc::new(ResearchAgentSender::new(
                http.clone(),
                config.research_agent.clone(),
                project.name.clone(),
                retry.clone(),
            )),
        });
        processes.insert(project.name.clone(), process);
    }

    let runner = Arc::new(TransferRunner::new(
        Duration::from_secs(config.run_retention_secs),
        config.concurrency,
    ));

    let app = router(AppState {
        runner,
        processes: Arc::new(processes),
    })
    .layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
