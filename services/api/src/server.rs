use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lendmarket::config::AppConfig;
use lendmarket::error::AppError;
use lendmarket::marketplace::{
    InMemoryDocumentStore, InMemoryMarketplaceRepository, MarketplaceService,
};
use lendmarket::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryMarketplaceRepository::default());
    let documents = Arc::new(InMemoryDocumentStore::new(
        config.marketplace.storage_base_url.clone(),
    ));
    let marketplace_service = Arc::new(MarketplaceService::new(
        repository,
        documents,
        config.marketplace.clone(),
    ));

    let app = with_marketplace_routes(marketplace_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        document_max_bytes = config.marketplace.document_max_bytes,
        "credit marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
