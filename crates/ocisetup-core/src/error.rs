//! Error types for credential provisioning

use crate::validator::ResourceType;
use std::path::PathBuf;
use thiserror::Error;

/// Input rejected by the validator. Recoverable by asking again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("invalid {expected} OCID '{value}': expected it to start with ocid1.{expected}.oc1.")]
    InvalidFormat {
        expected: ResourceType,
        value: String,
    },
}

/// Input accepted, but worth telling the operator about.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    #[error("region '{0}' is not a known region, using it anyway")]
    UnknownRegion(String),
}

/// Post-write smoke test failure. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("verification failed: {0}")]
pub struct VerificationFailure(pub String);

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("private key file not found or unreadable: {}", .0.display())]
    KeyFileNotFound(PathBuf),

    #[error("failed to compute key fingerprint: {0}")]
    Fingerprint(String),

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("provisioning run has already finished")]
    Finished,
}

impl ProvisionError {
    /// Remediation hint shown to the operator alongside fatal errors.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::KeyGeneration(_) => Some(
                "check that the key directory is writable, or reuse an existing key with --key-file",
            ),
            Self::KeyFileNotFound(_) => {
                Some("pass the path of an existing PEM private key, or generate a new pair")
            }
            Self::Fingerprint(_) => Some(
                "the key must be an unencrypted RSA private key in PEM format (PKCS#1 or PKCS#8)",
            ),
            Self::Read { .. } | Self::Malformed { .. } => {
                Some("fix or move the existing config file, then run setup again")
            }
            Self::Persist { .. } => Some(
                "check permissions of the config directory; any previous config was kept as a backup",
            ),
            Self::Validation(_) | Self::Finished => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Format errors show what was expected and what was given
    #[test]
    fn test_invalid_format_message() {
        let err = ValidationError::InvalidFormat {
            expected: ResourceType::Tenancy,
            value: "ocid1.user.oc1..x".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid tenancy OCID 'ocid1.user.oc1..x': expected it to start with ocid1.tenancy.oc1."
        );
    }

    /// Fatal errors carry a hint for the operator
    #[test]
    fn test_fatal_errors_have_hints() {
        assert!(ProvisionError::KeyFileNotFound(PathBuf::from("/nope")).hint().is_some());
        assert!(ProvisionError::Fingerprint("bad".into()).hint().is_some());
        assert!(ProvisionError::Finished.hint().is_none());
    }
}
