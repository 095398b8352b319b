use thiserror::Error;

use crate::gitlab_api::ApiError;

#[derive(Debug, Error)]
pub enum ProjectsError {
    #[error("No such gitlab in config: {0}")]
    UnknownInstance(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}
