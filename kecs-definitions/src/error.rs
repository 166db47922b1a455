//! AWS-shaped error types.
//!
//! Every ECS operation error surfaces as one of these variants so the HTTP
//! layer can render `{"__type": "...", "message": "..."}` bodies that match
//! what the AWS CLI/SDKs expect. One error enum covering every resource kind,
//! built on `thiserror`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task definition not found: {0}")]
    TaskDefinitionNotFound(String),

    #[error("Task set not found: {0}")]
    TaskSetNotFound(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    ClientException(String),

    #[error("update already in progress for {0}")]
    UpdateInProgress(String),

    #[error("{0}")]
    ServerException(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(anyhow::Error::from(e))
    }
}

impl ApiError {
    /// The `__type` AWS clients switch on.
    pub fn aws_type(&self) -> &'static str {
        match self {
            ApiError::ClusterNotFound(_) => "ClusterNotFoundException",
            ApiError::ServiceNotFound(_) => "ServiceNotFoundException",
            ApiError::TaskNotFound(_) => "InvalidParameterException",
            ApiError::TaskDefinitionNotFound(_) => "ClientException",
            ApiError::TaskSetNotFound(_) => "ClientException",
            ApiError::InvalidParameter(_) => "InvalidParameterException",
            ApiError::ClientException(_) => "ClientException",
            ApiError::UpdateInProgress(_) => "UpdateInProgressException",
            ApiError::ServerException(_) => "ServerException",
            ApiError::BackendUnavailable(_) => "ServerException",
            ApiError::BackendError(_) => "ServerException",
            ApiError::Internal(_) => "ServerException",
        }
    }

    /// HTTP status code to send the AWS-shaped error body with.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BackendUnavailable(_) => 503,
            ApiError::Internal(_) | ApiError::ServerException(_) => 500,
            ApiError::BackendError(_) => 502,
            _ => 400,
        }
    }
}
