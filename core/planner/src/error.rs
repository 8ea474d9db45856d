use ryan_store::StoreError;
use thiserror::Error;

use crate::gateway::ModelError;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("AI returned invalid JSON: {0}")]
    InvalidAnalysis(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for PlannerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => PlannerError::NotFound { entity, id },
            StoreError::Validation(message) => PlannerError::Validation(message),
            other => PlannerError::Store(other),
        }
    }
}

impl PlannerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        PlannerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

/// Treats a missing or blank field as a validation failure
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PlannerError::Validation(message.to_string()))
}
