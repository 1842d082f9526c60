//! oci CLI wrapper
//!
//! Every call runs against an explicit config file and the `DEFAULT`
//! profile, and is bounded by a timeout.

use crate::error::{OciError, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const DEFAULT_BINARY: &str = "oci";
const DEFAULT_PROFILE: &str = "DEFAULT";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// oci CLI wrapper
#[derive(Debug, Clone)]
pub struct OciCli {
    binary: String,
    config_file: PathBuf,
    profile: String,
    timeout: Duration,
}

impl OciCli {
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            config_file: config_file.into(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Check if the CLI is installed
    pub async fn check_installed(&self) -> Result<()> {
        if self.binary.contains(std::path::MAIN_SEPARATOR) {
            if !Path::new(&self.binary).is_file() {
                return Err(OciError::CliNotFound(self.binary.clone()));
            }
            return Ok(());
        }

        let which = Command::new("which")
            .arg(&self.binary)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;

        if !which.success() {
            return Err(OciError::CliNotFound(self.binary.clone()));
        }
        Ok(())
    }

    /// Run an oci command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--config-file").arg(&self.config_file);
        cmd.arg("--profile").arg(&self.profile);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!(
            "Running: {} --config-file {} --profile {} {}",
            self.binary,
            self.config_file.display(),
            self.profile,
            args.join(" ")
        );

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(OciError::CliNotFound(self.binary.clone()));
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(OciError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(parse_failure(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// List regions visible to the configured user
    pub async fn list_regions(&self) -> Result<Vec<RegionInfo>> {
        let output = self
            .run_command(&["iam", "region", "list", "--output", "json"])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }

        let response: Envelope<Vec<RegionInfo>> = serde_json::from_str(&output)?;
        Ok(response.data)
    }

    /// Get tenancy details by OCID
    pub async fn get_tenancy(&self, tenancy_id: &str) -> Result<TenancyInfo> {
        let output = self
            .run_command(&[
                "iam",
                "tenancy",
                "get",
                "--tenancy-id",
                tenancy_id,
                "--output",
                "json",
            ])
            .await?;

        let response: Envelope<TenancyInfo> = serde_json::from_str(&output)?;
        Ok(response.data)
    }
}

/// The CLI wraps every JSON response in `{"data": ...}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// `ServiceError:` payload printed on stderr
#[derive(Debug, Deserialize)]
struct ServiceError {
    status: u16,
    code: String,
    message: String,
}

fn parse_failure(stderr: &str) -> OciError {
    let service = stderr
        .find('{')
        .and_then(|start| serde_json::from_str::<ServiceError>(stderr[start..].trim()).ok());

    match service {
        Some(e) => OciError::Service {
            status: e.status,
            code: e.code,
            message: e.message,
        },
        None => OciError::CommandFailed(stderr.trim().to_string()),
    }
}

/// Region entry from `oci iam region list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionInfo {
    pub key: String,
    pub name: String,
}

/// Tenancy details from `oci iam tenancy get`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TenancyInfo {
    pub id: String,
    pub name: String,
    pub home_region_key: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ServiceError JSON on stderr becomes a Service error
    #[test]
    fn test_parse_service_error() {
        let stderr = r#"ServiceError:
{
    "code": "NotAuthenticated",
    "message": "The required information to complete authentication was not provided.",
    "opc-request-id": "ABC",
    "status": 401
}"#;
        match parse_failure(stderr) {
            OciError::Service {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 401);
                assert_eq!(code, "NotAuthenticated");
                assert!(message.starts_with("The required information"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// Anything else is a plain command failure
    #[test]
    fn test_parse_plain_failure() {
        let err = parse_failure("ERROR: Could not find config file at /nope\n");
        assert!(
            matches!(err, OciError::CommandFailed(msg) if msg == "ERROR: Could not find config file at /nope")
        );
    }

    /// `iam region list` output unwraps from its data envelope
    #[test]
    fn test_region_envelope() {
        let json = r#"{"data": [{"key": "PHX", "name": "us-phoenix-1"}, {"key": "IAD", "name": "us-ashburn-1"}]}"#;
        let regions: Envelope<Vec<RegionInfo>> = serde_json::from_str(json).unwrap();
        assert_eq!(regions.data.len(), 2);
        assert_eq!(regions.data[0].name, "us-phoenix-1");
    }

    /// `iam tenancy get` output unwraps from its data envelope
    #[test]
    fn test_tenancy_envelope() {
        let json = r#"{"data": {"id": "ocid1.tenancy.oc1..bbbb", "name": "acme", "home-region-key": "PHX", "description": null, "freeform-tags": {}}}"#;
        let tenancy: Envelope<TenancyInfo> = serde_json::from_str(json).unwrap();
        assert_eq!(tenancy.data.name, "acme");
        assert_eq!(tenancy.data.home_region_key.as_deref(), Some("PHX"));
    }
}
