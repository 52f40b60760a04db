use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use std::sync::Arc;

use crate::calculator::{EstimationResult, Estimator};
use crate::error::AppError;
use crate::query::{EstimateParams, OwnershipAssumptions};

/// Shared, read-only state for every request
#[derive(Clone)]
pub struct AppState {
    pub estimator: Arc<Estimator>,
    pub defaults: Arc<OwnershipAssumptions>,
}

/// Handle /v1/estimate
///
/// Query parameters not listed in [`EstimateParams`] are rejected.
pub async fn handle_estimate(
    State(state): State<AppState>,
    params: Result<Query<EstimateParams>, QueryRejection>,
) -> Result<Json<EstimationResult>, AppError> {
    let Query(params) = params.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let query = params.into_query(&state.defaults)?;

    let result = state.estimator.estimate(&query).await?;
    Ok(Json(result))
}
