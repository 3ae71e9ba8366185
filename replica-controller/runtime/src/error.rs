use crate::watchdog;
use faas_replicas_core::{FunctionRef, NoEndpoints, Unauthorized};
use hyper::StatusCode;
use thiserror::Error;

/// Failures of a function API request.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),

    #[error("function {0} not found")]
    NotFound(FunctionRef),

    #[error(transparent)]
    NoEndpoints(#[from] NoEndpoints),

    #[error("Can't reach service for: {function}: {source}")]
    Upstream {
        function: FunctionRef,
        #[source]
        source: watchdog::Error,
    },

    #[error("Cannot parse request. Please pass valid JSON: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error("failed to read request body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to encode response: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Catalog(anyhow::Error),
}

// === impl Error ===

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NoEndpoints(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { source, .. } => match source {
                watchdog::Error::Decode(_) => StatusCode::BAD_REQUEST,
                watchdog::Error::Status(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::MalformedRequest(_) | Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Serialize(_) | Self::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The plain-text response body. Not-found responses have no body and
    /// encoding failures are not described to the caller.
    pub fn body(&self) -> String {
        match self {
            Self::NotFound(_) => String::new(),
            Self::Serialize(_) => "Failed to marshal functions".to_string(),
            error => error.to_string(),
        }
    }
}
