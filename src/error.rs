use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Errors raised by the estimation core
#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    /// Reference data or candidate set unusable (fatal at startup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Price model artifact could not be loaded (fatal at startup)
    #[error("Price model unavailable: {0}")]
    ModelUnavailable(String),

    /// No EPA row for the requested vehicle
    #[error("No emission data for {make} {model} ({year})")]
    NoEmissionData { make: String, model: String, year: i32 },

    /// A divisor derived from reference data was zero
    #[error("Division by zero: {0}")]
    DivisionByZero(&'static str),

    /// The feature vector did not fit the price model
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Query parameters failed validation
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The reference store failed to answer
    #[error("Reference data error: {0}")]
    Reference(String),
}

impl From<sqlx::Error> for EstimateError {
    fn from(err: sqlx::Error) -> Self {
        Self::Reference(err.to_string())
    }
}

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Configuration error
    ConfigError(String),
    /// Request parameters rejected
    InvalidRequest(String),
    /// The request was well-formed but the reference data cannot answer it
    Unprocessable(String),
    /// Internal server error
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
            Self::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::ConfigError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type_name(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type_name(error: &AppError) -> &'static str {
    match error {
        AppError::ConfigError(_) => "config_error",
        AppError::InvalidRequest(_) => "invalid_request",
        AppError::Unprocessable(_) => "unprocessable",
        AppError::InternalError(_) => "internal_error",
    }
}

impl From<EstimateError> for AppError {
    fn from(err: EstimateError) -> Self {
        match err {
            EstimateError::InvalidQuery(_) => Self::InvalidRequest(err.to_string()),
            EstimateError::NoEmissionData { .. } | EstimateError::DivisionByZero(_) => {
                Self::Unprocessable(err.to_string())
            }
            EstimateError::Configuration(_) | EstimateError::ModelUnavailable(_) => {
                Self::ConfigError(err.to_string())
            }
            EstimateError::Prediction(_) => {
                tracing::error!(error = %err, "Price model rejected a well-formed query");
                Self::InternalError(err.to_string())
            }
            EstimateError::Reference(_) => Self::InternalError(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}
