#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] openclaw_store::Error),

    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    #[error("upstream collaborator error: {0}")]
    Upstream(String),

    #[error("invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("unknown job type: {0}")]
    UnknownJobType(String),

    #[error("timed out waiting for rollout: {0}")]
    RolloutTimeout(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
