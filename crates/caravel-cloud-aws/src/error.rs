//! AWS provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("aws CLI not found. Please install: https://aws.amazon.com/cli/")]
    AwsCliNotFound,

    #[error("AWS authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("aws command failed: {0}")]
    CommandFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Unexpected response from aws CLI: {0}")]
    UnexpectedResponse(String),

    #[error("Missing reference in recorded state: {0}")]
    MissingReference(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] caravel_cloud::CloudError),
}

impl From<AwsError> for caravel_cloud::CloudError {
    fn from(err: AwsError) -> Self {
        match err {
            AwsError::NotFound(s) => caravel_cloud::CloudError::ResourceNotFound(s),
            AwsError::AlreadyExists(s) => caravel_cloud::CloudError::ResourceAlreadyExists(s),
            AwsError::AuthenticationFailed(s) => {
                caravel_cloud::CloudError::AuthenticationFailed(s)
            }
            AwsError::CommandFailed(s) => caravel_cloud::CloudError::CommandFailed(s),
            AwsError::CloudError(e) => e,
            other => caravel_cloud::CloudError::ApiError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
