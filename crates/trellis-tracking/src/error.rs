use thiserror::Error;

use crate::finder::DiscoveryTier;

pub type TrackingResult<T> = std::result::Result<T, TrackingError>;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("invalid run-creation request: {0}")]
    InvalidRequest(String),

    #[error(
        "no run found for identity {identity} after exhausting trusted discovery tiers {attempted:?}; \
         weak fallbacks are disabled in strict mode"
    )]
    DiscoveryExhausted {
        identity: String,
        attempted: Vec<DiscoveryTier>,
    },

    #[error("tracking backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Identity(#[from] trellis_identity::IdentityError),

    #[error(transparent)]
    Store(#[from] trellis_store::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
