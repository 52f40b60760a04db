use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::handlers::estimate::AppState;
use crate::matcher::ModelMatch;

const MAX_MATCH_LIMIT: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchParams {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub query: String,
    pub data: Vec<ModelMatch>,
}

/// Handle /v1/models
/// Returns every canonical model name in index order
pub async fn list_models(State(state): State<AppState>) -> impl IntoResponse {
    let data = state
        .estimator
        .index()
        .names()
        .map(str::to_string)
        .collect();

    Json(ModelsResponse {
        object: "list".to_string(),
        data,
    })
}

/// Handle /v1/models/match
pub async fn match_models(
    State(state): State<AppState>,
    params: Result<Query<MatchParams>, QueryRejection>,
) -> Result<Json<MatchResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    if params.q.trim().is_empty() {
        return Err(AppError::InvalidRequest("q must not be empty".to_string()));
    }
    if params.limit == 0 || params.limit > MAX_MATCH_LIMIT {
        return Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {}",
            MAX_MATCH_LIMIT
        )));
    }

    let data = state.estimator.index().top_matches(&params.q, params.limit);
    Ok(Json(MatchResponse {
        query: params.q,
        data,
    }))
}
