//! HTTP API for the forest dashboard.

mod error;

use std::{convert::Infallible, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::{Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::broadcast};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    alerts::{AlertKind, AlertMessage, DispatchReceipt, Notifier, PhoneNumber},
    comparison::{rank_forests, trend_delta, RankedForest, TrendDirection},
    forest::{Forest, ForestId, ForestMetrics, ForestTrend, MapPosition},
    narrative::{
        AnalysisRequest, AnalysisResponse, NarrativeService, RestorationRequest,
        RestorationResponse,
    },
    report::ReportBuilder,
    restoration::{RestorationDelta, RestorationSnapshot},
    score::{Grade, ScoreResult, StatusColor, StatusLabel},
    store::ForestStore,
};

pub use error::ApiError;

const EVENT_CAPACITY: usize = 256;

/// Pushed to `/api/events` subscribers as JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DashboardEvent {
    #[serde(rename_all = "camelCase")]
    AlertSent {
        forest_name: String,
        kind: AlertKind,
        score: i64,
    },
    #[serde(rename_all = "camelCase")]
    AnalysisCompleted {
        forest_name: String,
        score: i64,
        grade: Grade,
    },
    #[serde(rename_all = "camelCase")]
    RestorationCompared { forest_name: String, score_change: f64 },
    #[serde(rename_all = "camelCase")]
    ReportGenerated { forest_id: ForestId, pages: usize },
}

pub struct AppState {
    store: Arc<ForestStore>,
    narrative: NarrativeService,
    notifier: Arc<dyn Notifier>,
    broadcaster: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(
        store: Arc<ForestStore>,
        narrative: NarrativeService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (broadcaster, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            narrative,
            notifier,
            broadcaster,
        }
    }

    pub fn store(&self) -> &ForestStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcaster.subscribe()
    }

    fn forest(&self, id: &str) -> Result<&Forest, ApiError> {
        self.store
            .get(id)
            .ok_or_else(|| ApiError::ForestNotFound(id.to_string()))
    }

    fn publish(&self, event: DashboardEvent) {
        match serde_json::to_string(&event) {
            // No subscribers is not an error.
            Ok(payload) => {
                let _ = self.broadcaster.send(payload);
            }
            Err(err) => tracing::warn!(%err, "failed to encode dashboard event"),
        }
    }
}

pub struct WebServerConfig {
    pub host: String,
    pub port: u16,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/forests", get(list_forests))
        .route("/api/forests/:id", get(forest_detail))
        .route("/api/forests/:id/trends", get(forest_trends))
        .route("/api/forests/:id/restoration", get(forest_restoration))
        .route("/api/forests/:id/report", get(forest_report))
        .route("/api/comparison", get(comparison))
        .route("/api/score", post(score_metrics))
        .route("/api/analyze-forest-health", post(analyze_forest_health))
        .route("/api/compare-restoration", post(compare_restoration))
        .route("/api/alerts", post(send_alert))
        .route("/api/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: WebServerConfig, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        forests = state.store().len(),
        narrative = state.narrative.backend_name(),
        "JuaMsitu API listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    forests: usize,
    narrative_backend: String,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        forests: state.store().len(),
        narrative_backend: state.narrative.backend_name().to_string(),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForestSummary {
    id: ForestId,
    name: String,
    location: String,
    area_hectares: f64,
    score: i64,
    grade: Grade,
    status_color: StatusColor,
    status: StatusLabel,
    last_updated: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<MapPosition>,
}

impl ForestSummary {
    fn of(forest: &Forest) -> Self {
        let result = forest.score();
        Self {
            id: forest.id.clone(),
            name: forest.name.clone(),
            location: forest.location.clone(),
            area_hectares: forest.area_hectares,
            score: result.score,
            grade: result.grade,
            status_color: result.status_color,
            status: result.status(),
            last_updated: forest.last_updated,
            position: forest.position,
        }
    }
}

async fn list_forests(State(state): State<Arc<AppState>>) -> Json<Vec<ForestSummary>> {
    Json(state.store().iter().map(ForestSummary::of).collect())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForestDetail<'a> {
    #[serde(flatten)]
    forest: &'a Forest,
    health: ScoreResult,
    status: StatusLabel,
}

async fn forest_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let forest = state.forest(&id)?;
    let health = forest.score();
    let body = serde_json::to_value(ForestDetail {
        forest,
        health,
        status: health.status(),
    })
    .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(body))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendsResponse {
    forest_id: ForestId,
    trends: Vec<ForestTrend>,
    delta: i64,
    direction: TrendDirection,
}

async fn forest_trends(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrendsResponse>, ApiError> {
    let forest = state.forest(&id)?;
    let delta = trend_delta(&forest.trends);
    Ok(Json(TrendsResponse {
        forest_id: forest.id.clone(),
        trends: forest.trends.clone(),
        delta,
        direction: TrendDirection::from_delta(delta),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RestorationView {
    forest_id: ForestId,
    before: RestorationSnapshot,
    after: RestorationSnapshot,
    delta: RestorationDelta,
}

async fn forest_restoration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RestorationView>, ApiError> {
    let forest = state.forest(&id)?;
    let after = RestorationSnapshot::from_forest(forest, forest.last_updated);
    let baseline_date = forest
        .last_updated
        .checked_sub_months(Months::new(6))
        .unwrap_or(forest.last_updated);
    let before = RestorationSnapshot::demo_baseline(&after, baseline_date);
    Ok(Json(RestorationView {
        forest_id: forest.id.clone(),
        delta: RestorationDelta::between(&before, &after),
        before,
        after,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    #[serde(default)]
    analysis: bool,
}

async fn forest_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<ReportQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let forest = state.forest(&id)?;

    let mut builder = ReportBuilder::new(forest, Utc::now().date_naive());
    if query.analysis {
        let response = state.narrative.analyze(&AnalysisRequest::for_forest(forest))?;
        builder = builder.with_analysis(response.analysis);
    }
    let report = builder.build();

    state.publish(DashboardEvent::ReportGenerated {
        forest_id: forest.id.clone(),
        pages: report.page_count(),
    });

    let disposition = format!("attachment; filename=\"{}.txt\"", report.file_stem());
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(report.render()),
    ))
}

async fn comparison(State(state): State<Arc<AppState>>) -> Json<Vec<RankedForest>> {
    Json(rank_forests(state.store().iter()))
}

async fn score_metrics(
    payload: Result<Json<ForestMetrics>, JsonRejection>,
) -> Result<Json<ScoreResult>, ApiError> {
    let Json(metrics) = payload?;
    metrics.validate()?;
    Ok(Json(ScoreResult::evaluate(&metrics)))
}

async fn analyze_forest_health(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.narrative.analyze(&request)?;
    state.publish(DashboardEvent::AnalysisCompleted {
        forest_name: response.forest_name.clone(),
        score: response.score,
        grade: response.grade,
    });
    Ok(Json(response))
}

async fn compare_restoration(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RestorationRequest>, JsonRejection>,
) -> Result<Json<RestorationResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.narrative.compare_restoration(&request)?;
    state.publish(DashboardEvent::RestorationCompared {
        forest_name: response.forest_name.clone(),
        score_change: response.improvements.score,
    });
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertRequest {
    forest_name: String,
    score: i64,
    grade: Grade,
    #[serde(default)]
    phone_number: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertResponse {
    success: bool,
    message: String,
    receipt: DispatchReceipt,
}

async fn send_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AlertRequest>, JsonRejection>,
) -> Result<Json<AlertResponse>, ApiError> {
    let Json(request) = payload?;
    let to = PhoneNumber::parse(&request.phone_number)?;
    let message = AlertMessage::compose(&request.forest_name, request.score, request.grade);
    let receipt = state.notifier.send(&to, &message)?;
    state.publish(DashboardEvent::AlertSent {
        forest_name: message.forest_name.clone(),
        kind: message.kind,
        score: message.score,
    });
    Ok(Json(AlertResponse {
        success: true,
        message: format!("Alert sent to {to}"),
        receipt,
    }))
}

async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.subscribe()).filter_map(|msg| match msg {
        Ok(payload) => Some(Ok(Event::default().data(payload))),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
