//! Runtime settings for ocisetup
//!
//! Everything that would otherwise be read implicitly from the environment
//! (home directory, config location, key location) is resolved here once
//! and handed to the rest of the program as a plain [`Settings`] value.

pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory under `$HOME` holding the OCI config and keys
pub const OCI_DIR: &str = ".oci";
pub const CONFIG_FILE: &str = "config";
pub const PRIVATE_KEY_FILE: &str = "oci_api_key.pem";
pub const PUBLIC_KEY_FILE: &str = "oci_api_key_public.pem";

pub const MIN_KEY_BITS: usize = 2048;
pub const DEFAULT_KEY_BITS: usize = 2048;
pub const DEFAULT_OCI_BIN: &str = "oci";
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Values supplied on the command line (or via env through clap)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<String>,
    pub key_dir: Option<String>,
    pub key_bits: Option<usize>,
    pub oci_bin: Option<String>,
    pub verify_timeout: Option<Duration>,
}

/// Fully resolved settings for one invocation. Every path is absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub home_dir: Option<PathBuf>,
    /// Relative paths given later (e.g. a typed key path) resolve against this
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
    pub private_key: PathBuf,
    pub public_key: PathBuf,
    pub key_bits: usize,
    pub oci_bin: String,
    pub verify_timeout: Duration,
}

impl Settings {
    /// Resolve against the current user's home and working directories.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let base_dir = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        Self::resolve_with_home(overrides, home_dir(), base_dir)
    }

    /// Resolve against an explicit home directory. Relative overrides are
    /// anchored at `base_dir`.
    ///
    /// The key directory defaults to the directory holding the config file,
    /// which itself defaults to `~/.oci/config`.
    pub fn resolve_with_home(
        overrides: Overrides,
        home_dir: Option<PathBuf>,
        base_dir: PathBuf,
    ) -> Result<Self> {
        let home = home_dir.as_deref();

        let config_file = match &overrides.config_file {
            Some(path) => resolve_path(path, home, &base_dir)?,
            None => absolute_in(
                &home
                    .ok_or(ConfigError::HomeDirNotFound)?
                    .join(OCI_DIR)
                    .join(CONFIG_FILE),
                &base_dir,
            ),
        };

        let key_dir = match &overrides.key_dir {
            Some(dir) => resolve_path(dir, home, &base_dir)?,
            None => config_file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base_dir.clone()),
        };

        let key_bits = overrides.key_bits.unwrap_or(DEFAULT_KEY_BITS);
        if key_bits < MIN_KEY_BITS {
            return Err(ConfigError::KeyTooSmall {
                min: MIN_KEY_BITS,
                got: key_bits,
            });
        }

        Ok(Self {
            config_file,
            private_key: key_dir.join(PRIVATE_KEY_FILE),
            public_key: key_dir.join(PUBLIC_KEY_FILE),
            key_bits,
            oci_bin: overrides
                .oci_bin
                .unwrap_or_else(|| DEFAULT_OCI_BIN.to_string()),
            verify_timeout: overrides.verify_timeout.unwrap_or(DEFAULT_VERIFY_TIMEOUT),
            home_dir,
            base_dir,
        })
    }
}

/// Home directory of the current user, if one can be determined
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Expand `~` and anchor a relative result at `base_dir`.
pub fn resolve_path(input: &str, home: Option<&Path>, base_dir: &Path) -> Result<PathBuf> {
    Ok(absolute_in(&expand_tilde(input, home)?, base_dir))
}

fn absolute_in(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Expand a leading `~` or `~/` to `home`.
///
/// `~user` forms are left untouched.
pub fn expand_tilde(input: &str, home: Option<&Path>) -> Result<PathBuf> {
    if input == "~" {
        return home
            .map(Path::to_path_buf)
            .ok_or_else(|| ConfigError::TildeExpansion(input.to_string()));
    }
    if let Some(rest) = input.strip_prefix("~/") {
        return home
            .map(|h| h.join(rest))
            .ok_or_else(|| ConfigError::TildeExpansion(input.to_string()));
    }
    Ok(PathBuf::from(input))
}
