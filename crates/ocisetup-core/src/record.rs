//! The persisted credential record and its flat `[DEFAULT]` file format

use crate::keys::Fingerprint;
use crate::validator::{Identifier, Region};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_SECTION: &str = "DEFAULT";

/// One complete set of API credentials, as written to the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRecord {
    pub user: Identifier,
    pub fingerprint: Fingerprint,
    pub tenancy: Identifier,
    pub region: Region,
    pub key_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compartment: Option<Identifier>,
}

/// Why a config body could not be turned back into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no [DEFAULT] section")]
    MissingSection,

    #[error("missing '{0}' in [DEFAULT]")]
    MissingKey(&'static str),

    #[error("line {0} is not a key=value pair")]
    InvalidLine(usize),
}

impl ConfigRecord {
    /// Serialize to the config file body.
    ///
    /// Key order is fixed; `compartment-id` is omitted entirely when unset.
    pub fn to_config_string(&self) -> String {
        let mut out = format!("[{}]\n", DEFAULT_SECTION);
        out.push_str(&format!("user={}\n", self.user));
        out.push_str(&format!("fingerprint={}\n", self.fingerprint));
        out.push_str(&format!("tenancy={}\n", self.tenancy));
        out.push_str(&format!("region={}\n", self.region));
        out.push_str(&format!("key_file={}\n", self.key_file.display()));
        if let Some(compartment) = &self.compartment {
            out.push_str(&format!("compartment-id={}\n", compartment));
        }
        out
    }

    /// Parse the `[DEFAULT]` section of a config body.
    ///
    /// Values are trusted as written; only the shape of the file is checked.
    /// Other sections are skipped.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut section: Option<&str> = None;
        let mut seen_default = false;
        let mut values: HashMap<&str, &str> = HashMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim();
                seen_default |= name == DEFAULT_SECTION;
                section = Some(name);
                continue;
            }
            if section != Some(DEFAULT_SECTION) {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or(ParseError::InvalidLine(idx + 1))?;
            values.insert(key.trim(), value.trim());
        }

        if !seen_default {
            return Err(ParseError::MissingSection);
        }

        let get = |key: &'static str| {
            values
                .get(key)
                .copied()
                .filter(|v| !v.is_empty())
                .ok_or(ParseError::MissingKey(key))
        };

        Ok(Self {
            user: Identifier::from_trusted(get("user")?),
            fingerprint: Fingerprint::from_trusted(get("fingerprint")?),
            tenancy: Identifier::from_trusted(get("tenancy")?),
            region: Region::from_trusted(get("region")?),
            key_file: PathBuf::from(get("key_file")?),
            compartment: get("compartment-id").ok().map(Identifier::from_trusted),
        })
    }
}
