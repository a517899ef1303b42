//! HTTP telemetry server.
//!
//! Serves the latest sensor reading, the rolling-window features and
//! maintenance predictions. One background task polls the sampler into the
//! feature window; request handlers only read.

pub mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use maintwatch_core::model::load_artifact;
use maintwatch_core::{
    FeatureVector, HubHealth, InferenceService, LayoutInfo, MonitorConfig, PredictionResult,
    Reading, SensorUnavailable, ServiceStatus, TelemetryHub, WindowSnapshot,
};

pub use error::ApiError;

/// Shared server state.
pub struct AppState {
    hub: Arc<TelemetryHub>,
    inference: Arc<InferenceService>,
    /// Artifact re-read by `POST /model/reload`.
    model_path: PathBuf,
    /// Hint for clients polling an empty window.
    retry_after_secs: u64,
}

impl AppState {
    pub fn new(
        hub: Arc<TelemetryHub>,
        inference: Arc<InferenceService>,
        model_path: PathBuf,
        sample_interval: Duration,
    ) -> Self {
        Self {
            hub,
            inference,
            model_path,
            retry_after_secs: sample_interval.as_secs_f64().ceil().max(1.0) as u64,
        }
    }
}

#[derive(Serialize)]
struct FeaturesResponse {
    features: FeatureVector,
    window: WindowSnapshot,
    layout: LayoutInfo,
}

#[derive(Serialize)]
struct CurrentPredictionResponse {
    features: FeatureVector,
    #[serde(flatten)]
    prediction: PredictionResult,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: ServiceStatus,
    sampler: HubHealth,
}

#[derive(Serialize)]
struct ReloadResponse {
    reloaded: bool,
    model: ServiceStatus,
}

async fn handle_sensor_data(State(state): State<Arc<AppState>>) -> Result<Json<Reading>, ApiError> {
    Ok(Json(state.hub.latest_reading()?))
}

async fn handle_features(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeaturesResponse>, ApiError> {
    let (features, window) = state.hub.aggregator().features_with_snapshot();
    let features = features.map_err(|e| ApiError::insufficient(e, state.retry_after_secs))?;
    Ok(Json(FeaturesResponse {
        features,
        window,
        layout: LayoutInfo::current(),
    }))
}

async fn handle_predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionResult>, ApiError> {
    let features = FeatureVector::from_json_slice(&body)?;
    Ok(Json(state.inference.predict(&features)?))
}

async fn handle_predict_current(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CurrentPredictionResponse>, ApiError> {
    let features = state
        .hub
        .current_features()
        .map_err(|e| ApiError::insufficient(e, state.retry_after_secs))?;
    let prediction = state.inference.predict(&features)?;
    Ok(Json(CurrentPredictionResponse {
        features,
        prediction,
    }))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let model = state.inference.status();
    let sampler = state.hub.health();
    Json(HealthResponse {
        status: if model.model_loaded && sampler.healthy {
            "ok"
        } else {
            "degraded"
        },
        version: maintwatch_core::VERSION,
        model,
        sampler,
    })
}

async fn handle_reload(State(state): State<Arc<AppState>>) -> Result<Json<ReloadResponse>, ApiError> {
    let path = state.model_path.clone();
    let loaded = tokio::task::spawn_blocking(move || load_artifact(&path))
        .await
        .map_err(|e| ApiError::Internal(format!("reload task failed: {e}")))?;
    let classifier = loaded.inspect_err(|e| {
        log::warn!("reload of {} rejected: {e}", state.model_path.display());
    })?;
    state.inference.reload(classifier)?;
    Ok(Json(ReloadResponse {
        reloaded: true,
        model: state.inference.status(),
    }))
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "maintwatch",
        "version": maintwatch_core::VERSION,
        "sampler": state.hub.sampler().name(),
        "feature_layout": LayoutInfo::current(),
        "endpoints": {
            "/": "This API index",
            "/sensor-data": {
                "method": "GET",
                "description": "Latest sensor reading",
            },
            "/features": {
                "method": "GET",
                "description": "Rolling-window features with window metadata",
            },
            "/predict": {
                "method": "POST",
                "description": "Classify a feature vector",
                "body": "JSON object with mean_vibration, std_vibration, temp_difference, pressure_diff",
            },
            "/predict/current": {
                "method": "GET",
                "description": "Classify the current window's features",
            },
            "/model/reload": {
                "method": "POST",
                "description": format!("Reload the artifact from {}", state.model_path.display()),
            },
            "/health": "Sampler and model status",
        },
    }))
}

/// Build the axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/sensor-data", get(handle_sensor_data))
        .route("/features", get(handle_features))
        .route("/predict", post(handle_predict))
        .route("/predict/current", get(handle_predict_current))
        .route("/model/reload", post(handle_reload))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Poll the hub every `interval`, bounding each poll by `timeout`.
///
/// This task is the only writer to the feature window.
pub fn spawn_sampling_task(
    hub: Arc<TelemetryHub>,
    interval: Duration,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let started = Instant::now();
            let polled = Arc::clone(&hub);
            let task = tokio::task::spawn_blocking(move || polled.poll());
            match tokio::time::timeout(timeout, task).await {
                // Poll failures are recorded by the hub itself.
                Ok(Ok(_)) => {}
                Ok(Err(join_err)) => hub.record_failure(
                    started.elapsed(),
                    SensorUnavailable::new(format!("sampling task failed: {join_err}")),
                ),
                Err(_) => hub.record_failure(
                    started.elapsed(),
                    SensorUnavailable::new(format!(
                        "sensor poll timed out after {} ms",
                        timeout.as_millis()
                    )),
                ),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}

/// Run the HTTP telemetry server until Ctrl+C.
pub async fn run_server(
    config: &MonitorConfig,
    hub: Arc<TelemetryHub>,
    inference: Arc<InferenceService>,
) -> std::io::Result<()> {
    let sampling = spawn_sampling_task(
        Arc::clone(&hub),
        config.sample_interval(),
        config.request_timeout(),
    );
    let state = Arc::new(AppState::new(
        hub,
        inference,
        config.model_path.clone(),
        config.sample_interval(),
    ));
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("maintwatch server listening on http://{addr}");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    sampling.abort();
    served
}
