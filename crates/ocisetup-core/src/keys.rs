//! API signing key material
//!
//! Generates or loads an RSA key pair and derives the fingerprint the
//! identity service uses to match a request signature to an uploaded public
//! key: MD5 over the DER-encoded SubjectPublicKeyInfo, printed as lowercase
//! colon-separated hex (the same value as
//! `openssl rsa -pubout -outform DER | openssl md5 -c`).

use crate::error::{ProvisionError, Result};
use md5::{Digest, Md5};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub use ocisetup_config::MIN_KEY_BITS;

/// Key fingerprint, e.g. `d8:de:a6:75:b1:47:00:53:6a:d9:a1:50:da:68:8b:26`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_trusted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a newly generated pair is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// How the provisioning run obtains its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Create a fresh pair at `paths`
    Generate { paths: KeyPaths, bits: usize },
    /// Use the private key already stored at `path`
    Reuse { path: PathBuf },
}

impl KeySource {
    pub fn acquire(&self) -> Result<KeyMaterial> {
        match self {
            Self::Generate { paths, bits } => generate(paths, *bits),
            Self::Reuse { path } => reuse(path),
        }
    }
}

/// Result of key acquisition, handed to the config record by path.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub private_key_path: PathBuf,
    /// Only set when the public half was written by this run
    pub public_key_path: Option<PathBuf>,
    pub public_key_pem: String,
    pub fingerprint: Fingerprint,
}

impl KeyMaterial {
    pub fn is_generated(&self) -> bool {
        self.public_key_path.is_some()
    }
}

/// Fingerprint of a DER-encoded SubjectPublicKeyInfo.
pub fn fingerprint_public_der(der: &[u8]) -> Fingerprint {
    let digest = Md5::digest(der);
    let hex: Vec<String> = digest.iter().map(|b| format!("{:02x}", b)).collect();
    Fingerprint(hex.join(":"))
}

/// Fingerprint of the public half of `key`.
pub fn fingerprint_of(key: &RsaPrivateKey) -> Result<Fingerprint> {
    let der = RsaPublicKey::from(key)
        .to_public_key_der()
        .map_err(|e| ProvisionError::Fingerprint(e.to_string()))?;
    Ok(fingerprint_public_der(der.as_bytes()))
}

/// Fingerprint of the private key stored at `path`.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint> {
    fingerprint_of(&load_private_key(path)?)
}

/// Load an unencrypted PEM private key, PKCS#8 or PKCS#1.
pub fn load_private_key(path: &Path) -> Result<RsaPrivateKey> {
    if !path.is_file() {
        return Err(ProvisionError::KeyFileNotFound(path.to_path_buf()));
    }
    let pem = fs::read_to_string(path)
        .map_err(|_| ProvisionError::KeyFileNotFound(path.to_path_buf()))?;

    RsaPrivateKey::from_pkcs8_pem(&pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
        .map_err(|e| {
            ProvisionError::Fingerprint(format!(
                "{} is not an RSA private key in PEM format: {}",
                path.display(),
                e
            ))
        })
}

fn public_pem(key: &RsaPrivateKey) -> Result<String> {
    RsaPublicKey::from(key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| ProvisionError::Fingerprint(e.to_string()))
}

fn generate(paths: &KeyPaths, bits: usize) -> Result<KeyMaterial> {
    if bits < MIN_KEY_BITS {
        return Err(ProvisionError::KeyGeneration(format!(
            "{} bit keys are too small, at least {} bits are required",
            bits, MIN_KEY_BITS
        )));
    }
    if paths.private_key.exists() {
        return Err(ProvisionError::KeyGeneration(format!(
            "{} already exists and will not be overwritten",
            paths.private_key.display()
        )));
    }

    tracing::debug!(bits, "generating RSA key pair");
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, bits)
        .map_err(|e| ProvisionError::KeyGeneration(e.to_string()))?;

    let private_pem = key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| ProvisionError::KeyGeneration(e.to_string()))?;
    let public_key_pem = public_pem(&key)?;
    let fingerprint = fingerprint_of(&key)?;

    for path in [&paths.private_key, &paths.public_key] {
        if let Some(parent) = path.parent() {
            create_key_dir(parent).map_err(|e| write_failed(parent, e))?;
        }
    }
    write_key_file(&paths.private_key, private_pem.as_bytes(), 0o600, true)
        .map_err(|e| write_failed(&paths.private_key, e))?;
    write_key_file(&paths.public_key, public_key_pem.as_bytes(), 0o644, false)
        .map_err(|e| write_failed(&paths.public_key, e))?;

    tracing::info!(
        private_key = %paths.private_key.display(),
        public_key = %paths.public_key.display(),
        %fingerprint,
        "generated API key pair"
    );

    Ok(KeyMaterial {
        private_key_path: paths.private_key.clone(),
        public_key_path: Some(paths.public_key.clone()),
        public_key_pem,
        fingerprint,
    })
}

fn reuse(path: &Path) -> Result<KeyMaterial> {
    let key = load_private_key(path)?;
    let bits = key.size() * 8;
    if bits < MIN_KEY_BITS {
        tracing::warn!(bits, path = %path.display(), "existing key is smaller than recommended");
    }

    let fingerprint = fingerprint_of(&key)?;
    tracing::debug!(path = %path.display(), %fingerprint, "reusing existing private key");

    Ok(KeyMaterial {
        private_key_path: path.to_path_buf(),
        public_key_path: None,
        public_key_pem: public_pem(&key)?,
        fingerprint,
    })
}

fn write_failed(path: &Path, err: io::Error) -> ProvisionError {
    ProvisionError::KeyGeneration(format!("cannot write {}: {}", path.display(), err))
}

fn create_key_dir(dir: &Path) -> io::Result<()> {
    if dir.as_os_str().is_empty() || dir.exists() {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

fn write_key_file(path: &Path, contents: &[u8], mode: u32, exclusive: bool) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if exclusive {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;

    // The umask may have stripped bits from the requested mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
