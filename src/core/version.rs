//! LLVM release versions.

use std::cmp::Ordering;
use std::fmt;

use semver::Version;

use crate::core::errors::ConfigError;

/// Oldest release whose monorepo layout this tool understands.
pub const MIN_SUPPORTED_VERSION: &str = "18.1.6";

/// A parsed LLVM release version, e.g. `18.1.8` or `19.1.0-rc3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlvmVersion {
    raw: String,
    version: Version,
}

impl LlvmVersion {
    /// Parse a version string, padding missing minor/patch components.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let (core, pre) = match raw.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (raw, None),
        };

        let mut parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::InvalidVersion(raw.to_string()));
        }
        while parts.len() < 3 {
            parts.push("0");
        }

        let mut normalized = parts.join(".");
        if let Some(pre) = pre {
            normalized.push('-');
            normalized.push_str(pre);
        }

        let version =
            Version::parse(&normalized).map_err(|_| ConfigError::InvalidVersion(raw.to_string()))?;

        Ok(LlvmVersion {
            raw: raw.to_string(),
            version,
        })
    }

    /// Parse and reject releases older than [`MIN_SUPPORTED_VERSION`].
    pub fn parse_supported(raw: &str) -> Result<Self, ConfigError> {
        let version = Self::parse(raw)?;
        let minimum = Self::parse(MIN_SUPPORTED_VERSION)?;
        if version < minimum {
            return Err(ConfigError::UnsupportedVersion {
                version: version.raw,
                minimum: MIN_SUPPORTED_VERSION.to_string(),
            });
        }
        Ok(version)
    }

    /// Major release number, used for the Clang resource directory.
    pub fn major(&self) -> u64 {
        self.version.major
    }

    /// The version exactly as written in the recipe.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for LlvmVersion {
    /// Release order; spellings of the same release order by text.
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for LlvmVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LlvmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
