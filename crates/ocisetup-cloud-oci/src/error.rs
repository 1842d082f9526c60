//! OCI CLI error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OciError {
    #[error("oci CLI not found ({0}). Please install: https://docs.oracle.com/iaas/Content/API/SDKDocs/cliinstall.htm")]
    CliNotFound(String),

    #[error("oci CLI did not answer within {0:?}")]
    Timeout(Duration),

    #[error("service error {status} {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("oci command failed: {0}")]
    CommandFailed(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OciError>;
