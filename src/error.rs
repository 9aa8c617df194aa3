use thiserror::Error;

#[derive(Debug, Error)]
pub enum RlError {
    #[error("Environment is not ready to receive actions")]
    EnvNotReady,
    #[error("No applicable actions in state {0}")]
    NoApplicableActions(String),
    #[error("No plan found from state {0}")]
    PlanNotFound(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Episode (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Plotting failed: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, RlError>;
