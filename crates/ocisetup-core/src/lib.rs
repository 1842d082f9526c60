//! OCI API credential provisioning
//!
//! Collects identity material, acquires an RSA signing key and its
//! fingerprint, and writes the `[DEFAULT]` config record used by the OCI
//! CLI and SDKs.
//!
//! # Components
//!
//! - [`validator`]: OCID and region checks
//! - [`keys`]: key generation/reuse and fingerprint derivation
//! - [`store`]: load, backup and atomic write of the config file
//! - [`provision`]: the step-by-step provisioning run
//!
//! # Example
//!
//! ```ignore
//! use ocisetup_core::{Provisioner, Step};
//!
//! let mut run = Provisioner::new(options);
//! let mut step = run.start();
//! while let Step::Input { prompt, notice } = step {
//!     let answer = ask_operator(&prompt, notice.as_ref());
//!     step = run.submit(&answer)?;
//! }
//! ```

pub mod error;
pub mod keys;
pub mod provision;
pub mod record;
pub mod store;
pub mod validator;
pub mod verify;

pub use error::{ProvisionError, Result, ValidationError, ValidationWarning, VerificationFailure};
pub use keys::{Fingerprint, KeyMaterial, KeyPaths, KeySource, fingerprint_file};
pub use provision::{
    AbortReason, Notice, Prompt, ProvisionOptions, Provisioned, Provisioner, Step,
};
pub use record::ConfigRecord;
pub use store::{BackupHandle, ConfigStore};
pub use validator::{
    Identifier, KNOWN_REGIONS, Region, ResourceType, require, validate_identifier,
    validate_region,
};
pub use verify::{RecordVerifier, VerificationStatus};
