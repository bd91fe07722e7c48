// Error types for the pricing subsystem
// Covers data loading, discount configuration and pipeline execution

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the pricing subsystem
///
/// Calculator and store failures are all expressed through this enum; the
/// pipeline itself never swallows an error, it propagates out of the run
/// to the HTTP layer.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Request-level validation failures
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Product referenced by a quote does not exist
    #[error("Product not found: {0}")]
    ProductNotFound(i32),

    /// Bundle pricing requested for a product that is not a bundle
    #[error("Product {0} is not a bundle")]
    NotABundle(i32),

    /// Discount referenced by id does not exist
    #[error("Discount not found: {0}")]
    DiscountNotFound(i32),

    /// A discount record failed configuration validation
    #[error("Invalid discount configuration: {0}")]
    InvalidDiscount(String),

    /// Too many calculators registered on one pipeline
    #[error("Calculator pipeline is full (limit {0})")]
    PipelineOverflow(usize),

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// JSON serialization/deserialization errors (attribute combinations)
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

impl From<validator::ValidationErrors> for PricingError {
    fn from(err: validator::ValidationErrors) -> Self {
        PricingError::ValidationError(err.to_string())
    }
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            PricingError::ValidationError(_) => (StatusCode::BAD_REQUEST, "Validation error"),
            PricingError::ProductNotFound(_) => (StatusCode::NOT_FOUND, "Product not found"),
            PricingError::NotABundle(_) => (StatusCode::BAD_REQUEST, "Not a bundle"),
            PricingError::DiscountNotFound(_) => (StatusCode::NOT_FOUND, "Discount not found"),
            PricingError::InvalidDiscount(_) => (StatusCode::BAD_REQUEST, "Invalid discount"),
            PricingError::PipelineOverflow(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Pipeline overflow")
            }
            PricingError::DatabaseError(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            PricingError::JsonError(_) => (StatusCode::BAD_REQUEST, "JSON parsing error"),
        };

        let body = Json(json!({
            "error": error_message,
            "details": self.to_string(),
        }));

        (status, body).into_response()
    }
}
