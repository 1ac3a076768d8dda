//! Image platform constraints.

use std::fmt;
use std::str::FromStr;

use capsule_common::{CapsuleError, CapsuleResult};
use serde::{Deserialize, Serialize};

/// Platform specification used to select an image variant when pulling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub architecture: String,
    /// Architecture variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Platform {
    /// Create a platform for linux/amd64.
    #[must_use]
    pub fn linux_amd64() -> Self {
        Self {
            os: "linux".to_string(),
            architecture: "amd64".to_string(),
            variant: None,
        }
    }

    /// Create a platform for linux/arm64.
    #[must_use]
    pub fn linux_arm64() -> Self {
        Self {
            os: "linux".to_string(),
            architecture: "arm64".to_string(),
            variant: None,
        }
    }

    /// Parse `os/architecture[/variant]`, e.g. `linux/arm64/v8`.
    ///
    /// # Errors
    ///
    /// Returns [`CapsuleError::InvalidPlatform`] when a segment is missing,
    /// empty or not lowercase alphanumeric.
    pub fn parse(value: &str) -> CapsuleResult<Self> {
        let invalid = || CapsuleError::InvalidPlatform {
            value: value.to_string(),
        };

        let segments: Vec<&str> = value.split('/').collect();
        if !(2..=3).contains(&segments.len()) {
            return Err(invalid());
        }

        let valid_segment = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        };
        if !segments.iter().all(|s| valid_segment(s)) {
            return Err(invalid());
        }

        Ok(Self {
            os: segments[0].to_string(),
            architecture: segments[1].to_string(),
            variant: segments.get(2).map(ToString::to_string),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

impl FromStr for Platform {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_os_and_architecture() {
        assert_eq!(Platform::parse("linux/amd64").unwrap(), Platform::linux_amd64());
        assert_eq!(Platform::parse("linux/arm64").unwrap(), Platform::linux_arm64());
    }

    #[test]
    fn parse_variant() {
        let platform = Platform::parse("linux/arm/v7").unwrap();
        assert_eq!(platform.architecture, "arm");
        assert_eq!(platform.variant.as_deref(), Some("v7"));
        assert_eq!(platform.to_string(), "linux/arm/v7");
    }

    #[test]
    fn rejects_malformed_platforms() {
        for value in ["", "linux", "linux/", "/amd64", "Linux/amd64", "a/b/c/d"] {
            assert!(Platform::parse(value).is_err(), "{value} should not parse");
        }
    }
}
