use crate::gitlab_api::ApiError;

/// Errors from configuration and instance registration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("No such gitlab in config: {0}")]
    NotFound(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}
