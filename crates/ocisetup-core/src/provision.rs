//! Provisioning run state machine
//!
//! The [`Provisioner`] never blocks on input. Each call returns a [`Step`]:
//! either the next [`Prompt`] the caller has to answer (optionally with a
//! [`Notice`] explaining why the previous answer was not taken), or a
//! terminal state. The caller owns the input loop, so the same flow works
//! from a terminal, from command line flags, or from tests.
//!
//! ```text
//! ConfirmOverwrite? ─▶ User ─▶ Tenancy ─▶ Region ─▶ Compartment ─▶ KeySource
//!                                                                 │        │
//!                                                          generate      reuse
//!                                                                 ▼        ▼
//!                                                     KeyRegistered  ExistingKeyPath
//!                                                                 └───┬────┘
//!                                                          backup + write ─▶ Provisioned
//! ```

use crate::error::{ProvisionError, Result, ValidationError, ValidationWarning};
use crate::keys::{Fingerprint, KeyMaterial, KeyPaths, KeySource};
use crate::record::ConfigRecord;
use crate::store::{BackupHandle, ConfigStore};
use crate::validator::{
    Identifier, Region, ResourceType, require, validate_identifier, validate_region,
};
use crate::verify::{RecordVerifier, VerificationStatus};
use std::path::PathBuf;

/// Explicit inputs for one run
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    pub config_path: PathBuf,
    pub key_paths: KeyPaths,
    pub key_bits: usize,
    /// Used to expand `~` in key paths typed by the operator
    pub home_dir: Option<PathBuf>,
    /// Relative key paths typed by the operator resolve against this, so the
    /// written `key_file` is always absolute
    pub base_dir: PathBuf,
}

/// A question for the operator
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// A config already exists at `path`; overwrite it (after a backup)?
    ConfirmOverwrite {
        path: PathBuf,
        existing: Option<ConfigRecord>,
    },
    User,
    Tenancy,
    Region,
    /// Optional, empty answer skips it
    Compartment,
    /// Generate a new key pair (yes) or reuse an existing private key (no)?
    KeySource,
    ExistingKeyPath,
    /// The generated public key must be uploaded before continuing
    KeyRegistered {
        public_key_path: PathBuf,
        public_key_pem: String,
        fingerprint: Fingerprint,
    },
}

impl Prompt {
    /// One-line question text
    pub fn question(&self) -> String {
        match self {
            Self::ConfirmOverwrite { path, .. } => {
                format!("{} already exists. Overwrite it? [y/N]", path.display())
            }
            Self::User => "User OCID".to_string(),
            Self::Tenancy => "Tenancy OCID".to_string(),
            Self::Region => "Region (e.g. us-phoenix-1)".to_string(),
            Self::Compartment => "Compartment OCID (optional, Enter to skip)".to_string(),
            Self::KeySource => "Generate a new API key pair? [Y/n]".to_string(),
            Self::ExistingKeyPath => "Path to existing private key".to_string(),
            Self::KeyRegistered { .. } => {
                "Has the public key been added to your user's API keys? [y/N]".to_string()
            }
        }
    }
}

/// Why the previous answer did not advance the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Invalid(ValidationError),
    Warning(ValidationWarning),
    Unrecognized(String),
    RegistrationPending,
    /// Generating would clobber the private key at this path
    KeyExists(PathBuf),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "{}", e),
            Self::Warning(w) => write!(f, "{}", w),
            Self::Unrecognized(answer) => write!(f, "unrecognized answer '{}'", answer),
            Self::RegistrationPending => write!(
                f,
                "upload the public key in the console (User settings > API keys) before continuing"
            ),
            Self::KeyExists(path) => write!(
                f,
                "{} already exists and will not be overwritten; answer n to reuse it",
                path.display()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The operator chose to keep the existing config
    OverwriteDeclined,
    /// The caller stopped the run, e.g. on EOF or `q`
    Cancelled,
}

/// Successful terminal state
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub record: ConfigRecord,
    pub config_path: PathBuf,
    pub backup: BackupHandle,
    pub key: KeyMaterial,
    pub verification: VerificationStatus,
}

impl Provisioned {
    /// Run the optional smoke test. The written record is kept either way.
    pub async fn verify(mut self, verifier: &dyn RecordVerifier) -> Self {
        tracing::debug!(verifier = verifier.name(), "verifying config");
        self.verification = match verifier.verify(&self.record, &self.config_path).await {
            Ok(summary) => VerificationStatus::Passed(summary),
            Err(failure) => {
                tracing::warn!(%failure, "config written but verification failed");
                VerificationStatus::Failed(failure)
            }
        };
        self
    }
}

#[derive(Debug, Clone)]
pub enum Step {
    Input {
        prompt: Prompt,
        notice: Option<Notice>,
    },
    Provisioned(Box<Provisioned>),
    Aborted(AbortReason),
}

impl Step {
    fn ask(prompt: Prompt) -> Self {
        Self::Input {
            prompt,
            notice: None,
        }
    }

    fn retry(prompt: Prompt, notice: Notice) -> Self {
        Self::Input {
            prompt,
            notice: Some(notice),
        }
    }
}

#[derive(Debug, Clone)]
struct Identity {
    user: Identifier,
    tenancy: Identifier,
    region: Region,
    compartment: Option<Identifier>,
}

#[derive(Debug, Clone)]
enum Stage {
    NotStarted,
    ConfirmOverwrite,
    User,
    Tenancy {
        user: Identifier,
    },
    Region {
        user: Identifier,
        tenancy: Identifier,
    },
    Compartment {
        user: Identifier,
        tenancy: Identifier,
        region: Region,
    },
    KeySource(Identity),
    ExistingKeyPath(Identity),
    KeyRegistered(Identity, KeyMaterial),
    Finished,
}

/// Drives one provisioning run
#[derive(Debug)]
pub struct Provisioner {
    options: ProvisionOptions,
    store: ConfigStore,
    stage: Stage,
}

impl Provisioner {
    pub fn new(options: ProvisionOptions) -> Self {
        Self {
            options,
            store: ConfigStore::new(),
            stage: Stage::NotStarted,
        }
    }

    pub fn options(&self) -> &ProvisionOptions {
        &self.options
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Finished)
    }

    /// First prompt of the run. Asks for overwrite confirmation when a
    /// config already exists.
    pub fn start(&mut self) -> Step {
        let path = &self.options.config_path;
        if path.is_file() {
            let existing = match self.store.load(path) {
                Ok(existing) => existing,
                Err(e) => {
                    tracing::warn!(error = %e, "existing config could not be parsed");
                    None
                }
            };
            self.stage = Stage::ConfirmOverwrite;
            return Step::ask(Prompt::ConfirmOverwrite {
                path: path.clone(),
                existing,
            });
        }

        self.stage = Stage::User;
        Step::ask(Prompt::User)
    }

    /// Stop the run without touching anything on disk.
    pub fn cancel(&mut self) -> Step {
        self.stage = Stage::Finished;
        Step::Aborted(AbortReason::Cancelled)
    }

    /// Answer the pending prompt.
    ///
    /// Invalid answers come back as the same prompt with a [`Notice`].
    /// Key and persistence failures end the run with an error.
    pub fn submit(&mut self, answer: &str) -> Result<Step> {
        let answer = answer.trim();
        let stage = std::mem::replace(&mut self.stage, Stage::Finished);

        let (next, step) = match stage {
            Stage::NotStarted => {
                self.stage = Stage::NotStarted;
                return Ok(self.start());
            }
            Stage::Finished => return Err(ProvisionError::Finished),

            Stage::ConfirmOverwrite => {
                if is_yes(answer) {
                    (Stage::User, Step::ask(Prompt::User))
                } else {
                    tracing::info!("keeping existing config");
                    (Stage::Finished, Step::Aborted(AbortReason::OverwriteDeclined))
                }
            }

            Stage::User => match identifier("user", answer, ResourceType::User) {
                Ok(user) => (Stage::Tenancy { user }, Step::ask(Prompt::Tenancy)),
                Err(e) => (Stage::User, Step::retry(Prompt::User, Notice::Invalid(e))),
            },

            Stage::Tenancy { user } => {
                match identifier("tenancy", answer, ResourceType::Tenancy) {
                    Ok(tenancy) => (Stage::Region { user, tenancy }, Step::ask(Prompt::Region)),
                    Err(e) => (
                        Stage::Tenancy { user },
                        Step::retry(Prompt::Tenancy, Notice::Invalid(e)),
                    ),
                }
            }

            Stage::Region { user, tenancy } => match require("region", answer) {
                Ok(value) => {
                    let (region, warning) = validate_region(value);
                    let step = match warning {
                        Some(w) => Step::retry(Prompt::Compartment, Notice::Warning(w)),
                        None => Step::ask(Prompt::Compartment),
                    };
                    (
                        Stage::Compartment {
                            user,
                            tenancy,
                            region,
                        },
                        step,
                    )
                }
                Err(e) => (
                    Stage::Region { user, tenancy },
                    Step::retry(Prompt::Region, Notice::Invalid(e)),
                ),
            },

            Stage::Compartment {
                user,
                tenancy,
                region,
            } => {
                let compartment = if answer.is_empty() {
                    Ok(None)
                } else {
                    validate_identifier(answer, ResourceType::Compartment).map(Some)
                };
                match compartment {
                    Ok(compartment) => (
                        Stage::KeySource(Identity {
                            user,
                            tenancy,
                            region,
                            compartment,
                        }),
                        Step::ask(Prompt::KeySource),
                    ),
                    Err(e) => (
                        Stage::Compartment {
                            user,
                            tenancy,
                            region,
                        },
                        Step::retry(Prompt::Compartment, Notice::Invalid(e)),
                    ),
                }
            }

            Stage::KeySource(identity) => match parse_key_choice(answer) {
                Some(true) if self.options.key_paths.private_key.exists() => {
                    let existing = self.options.key_paths.private_key.clone();
                    tracing::info!(path = %existing.display(), "private key already present");
                    (
                        Stage::KeySource(identity),
                        Step::retry(Prompt::KeySource, Notice::KeyExists(existing)),
                    )
                }
                Some(true) => {
                    let source = KeySource::Generate {
                        paths: self.options.key_paths.clone(),
                        bits: self.options.key_bits,
                    };
                    // Fatal: stage stays Finished
                    let key = source.acquire()?;
                    let prompt = Prompt::KeyRegistered {
                        public_key_path: self.options.key_paths.public_key.clone(),
                        public_key_pem: key.public_key_pem.clone(),
                        fingerprint: key.fingerprint.clone(),
                    };
                    (Stage::KeyRegistered(identity, key), Step::ask(prompt))
                }
                Some(false) => (
                    Stage::ExistingKeyPath(identity),
                    Step::ask(Prompt::ExistingKeyPath),
                ),
                None => (
                    Stage::KeySource(identity),
                    Step::retry(Prompt::KeySource, Notice::Unrecognized(answer.to_string())),
                ),
            },

            Stage::ExistingKeyPath(identity) => match require("key_file", answer) {
                Ok(value) => {
                    let path = ocisetup_config::resolve_path(
                        value,
                        self.options.home_dir.as_deref(),
                        &self.options.base_dir,
                    )
                    .map_err(|_| ProvisionError::KeyFileNotFound(PathBuf::from(value)))?;
                    let key = KeySource::Reuse { path }.acquire()?;
                    (Stage::Finished, self.persist(identity, key)?)
                }
                Err(e) => (
                    Stage::ExistingKeyPath(identity),
                    Step::retry(Prompt::ExistingKeyPath, Notice::Invalid(e)),
                ),
            },

            Stage::KeyRegistered(identity, key) => {
                if is_yes(answer) {
                    (Stage::Finished, self.persist(identity, key)?)
                } else {
                    let prompt = Prompt::KeyRegistered {
                        public_key_path: self.options.key_paths.public_key.clone(),
                        public_key_pem: key.public_key_pem.clone(),
                        fingerprint: key.fingerprint.clone(),
                    };
                    (
                        Stage::KeyRegistered(identity, key),
                        Step::retry(prompt, Notice::RegistrationPending),
                    )
                }
            }
        };

        self.stage = next;
        Ok(step)
    }

    /// Backup first, then write. Losing the previous record without a
    /// backup is unrecoverable, so the order is fixed.
    fn persist(&self, identity: Identity, key: KeyMaterial) -> Result<Step> {
        let record = ConfigRecord {
            user: identity.user,
            fingerprint: key.fingerprint.clone(),
            tenancy: identity.tenancy,
            region: identity.region,
            key_file: key.private_key_path.clone(),
            compartment: identity.compartment,
        };

        let path = &self.options.config_path;
        let backup = self.store.backup(path)?;
        self.store.write(&record, path)?;

        Ok(Step::Provisioned(Box::new(Provisioned {
            record,
            config_path: path.clone(),
            backup,
            key,
            verification: VerificationStatus::Skipped,
        })))
    }
}

fn identifier(
    field: &'static str,
    answer: &str,
    expected: ResourceType,
) -> std::result::Result<Identifier, ValidationError> {
    validate_identifier(require(field, answer)?, expected)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// `Some(true)` for generate, `Some(false)` for reuse
fn parse_key_choice(answer: &str) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "" | "y" | "yes" | "g" | "generate" => Some(true),
        "n" | "no" | "r" | "reuse" => Some(false),
        _ => None,
    }
}
