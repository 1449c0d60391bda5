use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    models::{InterestLevel, ProcessedDataset, TopicGroup, TopicStat},
    services::{aggregator, loader, parser},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/survey/dashboard", get(dashboard))
        .route("/survey/topics/:group", get(topic_group))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    /// Optional override URL; when present it is the exclusive data source.
    datafile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopicParams {
    datafile: Option<String>,
    /// Keep only topics with at least one response at this level.
    interest: Option<String>,
    /// Truncate to the N best-scoring topics.
    top: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TopicGroupResponse {
    group: TopicGroup,
    total_responses: usize,
    interest_filter: Option<&'static str>,
    topics: Vec<TopicStat>,
}

#[axum::debug_handler]
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<ProcessedDataset>, AppError> {
    let dataset = build_dataset(&state, params.datafile.as_deref()).await?;
    Ok(Json(dataset))
}

#[axum::debug_handler]
async fn topic_group(
    State(state): State<Arc<AppState>>,
    Path(group): Path<String>,
    Query(params): Query<TopicParams>,
) -> Result<Json<TopicGroupResponse>, AppError> {
    let group: TopicGroup = group
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("unknown topic group: {}", group)))?;
    let level = params
        .interest
        .as_deref()
        .map(|raw| {
            raw.parse::<InterestLevel>()
                .map_err(|_| AppError::InvalidInput(format!("unknown interest level: {}", raw)))
        })
        .transpose()?;

    let dataset = build_dataset(&state, params.datafile.as_deref()).await?;

    // Pure read-side projection of the immutable dataset.
    let mut topics: Vec<TopicStat> = dataset
        .topic_group(group)
        .iter()
        .filter(|topic| level.map_or(true, |lvl| topic.count(lvl) > 0))
        .cloned()
        .collect();
    if let Some(top) = params.top {
        topics.truncate(top);
    }

    Ok(Json(TopicGroupResponse {
        group,
        total_responses: dataset.total_responses,
        interest_filter: level.map(|lvl| lvl.label()),
        topics,
    }))
}

/// Runs the full Loader -> Parser -> Aggregator pipeline once. Every request
/// recomputes from scratch, there is no cross-request state.
async fn build_dataset(
    state: &AppState,
    override_url: Option<&str>,
) -> Result<ProcessedDataset, AppError> {
    let start = std::time::Instant::now();

    let text = loader::load_survey_text(&state.config, override_url).await?;
    tracing::info!("loaded {}KB of survey text", text.len() / 1024);

    let rows = parser::parse_survey(&text);
    tracing::info!("parsed {} survey rows", rows.len());

    let dataset = aggregator::process(rows)?;
    tracing::info!(
        "processed dataset in {:?}: {} companies, {}/{}/{} topics",
        start.elapsed(),
        dataset.companies.len(),
        dataset.challenges.len(),
        dataset.technologies.len(),
        dataset.products.len()
    );

    Ok(dataset)
}
