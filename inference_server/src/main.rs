use anyhow::{Result, anyhow};
use data_ingestion::config::ScraperConfig;
use data_ingestion::logger::init_logger;
use data_ingestion::pacing::Pacer;
use data_ingestion::{ChromeLauncher, DatasetStore, ScrapeJob, ScrapeOrchestrator};
use inference_server::{
    AppState, BatchPredictor, Classifier, OnnxClassifier, PredictionService, Server, ServerConfig,
};
use log::{info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logger();

    let server_config = ServerConfig::from_env()?;
    let scraper_config = ScraperConfig::from_env()?;

    server_config.model.check_feature_order().map_err(|e| anyhow!(e))?;

    let model_path = &server_config.model.path;
    info!("Loading {} from {}", server_config.model.model_type, model_path.display());
    let classifier: Arc<dyn Classifier> =
        Arc::new(OnnxClassifier::load(model_path, &server_config.model)?);

    if !scraper_config.data_dir.is_dir() {
        warn!(
            "Data directory {} does not exist yet, predictions will report missing data",
            scraper_config.data_dir.display()
        );
    }

    let service = Arc::new(PredictionService::new(classifier));
    let store = DatasetStore::new(scraper_config.data_dir.clone());
    let predictor = BatchPredictor::new(service, store);

    let orchestrator = ScrapeOrchestrator::new(
        ChromeLauncher::new(scraper_config.browser.clone()),
        ScrapeJob::new(&scraper_config),
        &scraper_config.retry,
        Pacer::from(&scraper_config.pacing),
    );

    let server = Server::new(AppState {
        predictor: Arc::new(predictor),
        scraper: Arc::new(orchestrator),
        model_type: server_config.model.model_type.clone(),
    });

    server.run(&server_config.bind_address()).await
}
