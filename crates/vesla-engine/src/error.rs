#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot connect to the container engine: is the Docker daemon running?")]
    Connect { source: bollard::errors::Error },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("container engine request failed ({operation}): {message}")]
    Api {
        operation: &'static str,
        message: String,
    },

    #[error("image build failed: {message}")]
    BuildFailed { message: String },
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Map a bollard error, turning HTTP 404 into [`EngineError::NotFound`].
    pub(crate) fn from_bollard(
        operation: &'static str,
        resource: &str,
        err: bollard::errors::Error,
    ) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => Self::NotFound {
                resource: resource.to_owned(),
            },
            other => Self::Api {
                operation,
                message: other.to_string(),
            },
        }
    }
}
