use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    calculator::Estimator,
    config::{Config, DataBackend},
    handlers::{self, estimate::AppState},
    images::{HttpProbe, ImageResolver},
    matcher::CanonicalModelIndex,
    metrics,
    predictor::ForestModel,
    reference::{ReferenceData, ReferenceTables, SqliteReferenceStore},
    signals::shutdown_signal,
};

/// Start the estimation server
///
/// This function:
/// 1. Initializes metrics
/// 2. Loads reference data, the canonical model index and the price model
/// 3. Binds to the configured address and serves until SIGTERM/SIGINT
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics()?);

    let estimator = build_estimator(&config).await?;
    info!(
        "Loaded {} canonical models, backend {:?}",
        estimator.index().len(),
        config.data.backend
    );

    let app_state = AppState {
        estimator: Arc::new(estimator),
        defaults: Arc::new(config.estimation.clone()),
    };

    let app = create_router(app_state, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting street-smarts on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");

    Ok(())
}

/// Open the configured reference provider
pub async fn open_reference(config: &Config) -> Result<Arc<dyn ReferenceData>> {
    let data = &config.data;
    let reference: Arc<dyn ReferenceData> = match data.backend {
        DataBackend::Csv => {
            let (emissions, photos) = match (&data.emissions_csv, &data.photos_csv) {
                (Some(e), Some(p)) => (e, p),
                _ => anyhow::bail!("The csv backend requires data.emissions_csv and data.photos_csv"),
            };
            Arc::new(ReferenceTables::load(emissions, photos)?)
        }
        DataBackend::Sqlite => {
            let url = data
                .database_url
                .as_deref()
                .context("The sqlite backend requires data.database_url")?;
            Arc::new(SqliteReferenceStore::open(url, data.max_connections).await?)
        }
    };

    Ok(reference)
}

/// Build the estimator and everything it depends on
///
/// Any failure here is fatal for the process.
pub async fn build_estimator(config: &Config) -> Result<Estimator> {
    let reference = open_reference(config).await?;

    let names = reference.model_names().await?;
    let index = CanonicalModelIndex::new(names)?;

    let predictor = ForestModel::load(&config.model.path)?;

    let probe = HttpProbe::new(Duration::from_secs(config.images.probe_timeout_seconds))?;
    let images = ImageResolver::new(
        Arc::new(probe),
        config.images.max_photos,
        config.images.placeholder_url.clone(),
    );

    Ok(Estimator::new(
        reference,
        Arc::new(index),
        Arc::new(predictor),
        images,
    ))
}

/// Create the Axum router with all routes and middleware
pub fn create_router(
    app_state: AppState,
    metrics_handle: Arc<metrics_exporter_prometheus::PrometheusHandle>,
) -> Router {
    let api_routes = Router::new()
        .route("/v1/estimate", get(handlers::estimate::handle_estimate))
        .route("/v1/models", get(handlers::models::list_models))
        .route("/v1/models/match", get(handlers::models::match_models))
        .route("/ready", get(handlers::ops::readiness_check))
        .with_state(app_state);

    Router::new()
        .route("/health", get(handlers::ops::health_check))
        .route("/metrics", get(handlers::ops::metrics))
        .with_state(metrics_handle)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}
