use thiserror::Error;

pub type ArtifactResult<T> = std::result::Result<T, ArtifactError>;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(
        "no valid checkpoint found for {identity}; attempted sources: {attempted:?}. \
         Manual recovery: download the checkpoint artifact from {tracking_uri} \
         (run {run_hint}, artifact path '{artifact_hint}') into {cache_dir}"
    )]
    Exhausted {
        identity: String,
        attempted: Vec<String>,
        tracking_uri: String,
        run_hint: String,
        artifact_hint: String,
        cache_dir: String,
    },

    #[error("archive extraction failed for {path}: {reason}")]
    Archive { path: String, reason: String },

    #[error(transparent)]
    Tracking(#[from] trellis_tracking::TrackingError),

    #[error(transparent)]
    Store(#[from] trellis_store::StoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
