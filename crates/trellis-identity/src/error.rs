use thiserror::Error;

pub type IdentityResult<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid study key hash: {0}")]
    InvalidKeyHash(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid objective config: {0}")]
    InvalidObjective(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
