//! Credential verification through the oci CLI

use crate::cli::OciCli;
use crate::error::Result;
use async_trait::async_trait;
use ocisetup_core::{ConfigRecord, RecordVerifier, VerificationFailure};
use std::path::Path;
use std::time::Duration;

/// Verifies a written record by listing regions and reading the tenancy
/// with it.
#[derive(Debug, Clone)]
pub struct OciVerifier {
    binary: String,
    timeout: Duration,
}

impl OciVerifier {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn check(&self, record: &ConfigRecord, config_path: &Path) -> Result<String> {
        let cli = OciCli::new(config_path)
            .with_binary(&self.binary)
            .with_timeout(self.timeout);

        cli.check_installed().await?;
        let regions = cli.list_regions().await?;
        let tenancy = cli.get_tenancy(record.tenancy.as_str()).await?;

        Ok(format!(
            "authenticated to tenancy {} ({} regions visible)",
            tenancy.name,
            regions.len()
        ))
    }
}

#[async_trait]
impl RecordVerifier for OciVerifier {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn verify(
        &self,
        record: &ConfigRecord,
        config_path: &Path,
    ) -> std::result::Result<String, VerificationFailure> {
        self.check(record, config_path)
            .await
            .map_err(|e| VerificationFailure(e.to_string()))
    }
}
