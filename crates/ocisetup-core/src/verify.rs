//! Post-write smoke test seam

use crate::error::VerificationFailure;
use crate::record::ConfigRecord;
use async_trait::async_trait;
use std::path::Path;

/// Something that can prove a freshly written record actually authenticates,
/// usually by calling the cloud CLI with it.
#[async_trait]
pub trait RecordVerifier: Send + Sync {
    /// Short human-readable name shown in progress output
    fn name(&self) -> &str;

    /// Returns a one-line summary on success.
    async fn verify(
        &self,
        record: &ConfigRecord,
        config_path: &Path,
    ) -> std::result::Result<String, VerificationFailure>;
}

/// Outcome of the optional verification step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Skipped,
    Passed(String),
    Failed(VerificationFailure),
}

impl VerificationStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
