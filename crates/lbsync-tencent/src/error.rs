//! Tencent Cloud client error types

use lbsync_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TencentError {
    #[error("API error [{code}]: {message} (request id: {request_id})")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TencentError {
    /// Whether the remote reported the addressed resource as absent
    pub fn is_not_found(&self) -> bool {
        match self {
            TencentError::Api { code, .. } => {
                code.starts_with("ResourceNotFound") || code.ends_with(".NotFound")
            }
            _ => false,
        }
    }
}

impl From<TencentError> for CloudError {
    fn from(err: TencentError) -> Self {
        match err {
            TencentError::Api {
                code,
                message,
                request_id,
            } => CloudError::Api {
                code,
                message,
                request_id,
            },
            TencentError::JsonError(e) => CloudError::Json(e),
            other => CloudError::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TencentError>;
