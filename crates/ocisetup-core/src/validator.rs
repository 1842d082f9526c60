//! Identifier and region validation
//!
//! Pure string checks, no I/O. Identifiers are OCIDs of the form
//! `ocid1.<type>.oc1.<rest>`; regions are checked against a static list but
//! unknown ones are still accepted so new regions keep working.

use crate::error::{ValidationError, ValidationWarning};
use serde::Serialize;
use std::fmt;

/// Public commercial regions known at release time.
pub const KNOWN_REGIONS: &[&str] = &[
    "af-johannesburg-1",
    "ap-batam-1",
    "ap-chuncheon-1",
    "ap-hyderabad-1",
    "ap-melbourne-1",
    "ap-mumbai-1",
    "ap-osaka-1",
    "ap-seoul-1",
    "ap-singapore-1",
    "ap-singapore-2",
    "ap-sydney-1",
    "ap-tokyo-1",
    "ca-montreal-1",
    "ca-toronto-1",
    "eu-amsterdam-1",
    "eu-frankfurt-1",
    "eu-madrid-1",
    "eu-marseille-1",
    "eu-milan-1",
    "eu-paris-1",
    "eu-stockholm-1",
    "eu-zurich-1",
    "il-jerusalem-1",
    "me-abudhabi-1",
    "me-dubai-1",
    "me-jeddah-1",
    "me-riyadh-1",
    "mx-monterrey-1",
    "mx-queretaro-1",
    "sa-bogota-1",
    "sa-santiago-1",
    "sa-saopaulo-1",
    "sa-valparaiso-1",
    "sa-vinhedo-1",
    "uk-cardiff-1",
    "uk-london-1",
    "us-ashburn-1",
    "us-chicago-1",
    "us-phoenix-1",
    "us-sanjose-1",
];

/// Resource type segment of an OCID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    User,
    Tenancy,
    Compartment,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Tenancy => "tenancy",
            Self::Compartment => "compartment",
        }
    }

    /// Expected OCID prefix, e.g. `ocid1.user.oc1.`
    pub fn prefix(&self) -> String {
        format!("ocid1.{}.oc1.", self.as_str())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated OCID. Only constructed through [`validate_identifier`] or by
/// loading a previously written config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub(crate) fn from_trusted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deployment region name such as `us-phoenix-1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    pub(crate) fn from_trusted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        KNOWN_REGIONS.contains(&self.0.as_str())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reject empty or whitespace-only input for a required field.
pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(value)
}

/// Check that `value` is an OCID of the expected resource type.
///
/// The value is returned unchanged on success.
pub fn validate_identifier(
    value: &str,
    expected: ResourceType,
) -> Result<Identifier, ValidationError> {
    if !value.starts_with(&expected.prefix()) {
        return Err(ValidationError::InvalidFormat {
            expected,
            value: value.to_string(),
        });
    }
    Ok(Identifier(value.to_string()))
}

/// Accept any region, flagging ones outside [`KNOWN_REGIONS`].
pub fn validate_region(value: &str) -> (Region, Option<ValidationWarning>) {
    let region = Region(value.to_string());
    if region.is_known() {
        (region, None)
    } else {
        tracing::warn!(region = value, "unknown region");
        (region, Some(ValidationWarning::UnknownRegion(value.to_string())))
    }
}
