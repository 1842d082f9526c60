//! OCI CLI integration for ocisetup
//!
//! Wraps the `oci` command line tool to smoke-test a freshly written
//! config: if the CLI can list regions and read the tenancy with it, the
//! user, key and fingerprint all line up.
//!
//! # Requirements
//!
//! - `oci` CLI must be installed (or its path given explicitly)
//!
//! # Example
//!
//! ```ignore
//! use ocisetup_cloud_oci::OciCli;
//!
//! let cli = OciCli::new("/home/me/.oci/config");
//! let regions = cli.list_regions().await?;
//! ```

pub mod cli;
pub mod error;
pub mod verifier;

pub use cli::{OciCli, RegionInfo, TenancyInfo};
pub use error::{OciError, Result};
pub use verifier::OciVerifier;
