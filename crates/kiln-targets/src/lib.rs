//! Target framework labels and their package monikers.
//!
//! Staged output is partitioned by a human-readable framework label such as
//! `net-4.0`, while package manifests address the same framework by a compact
//! moniker such as `net40`.

use std::fmt;

/// A target runtime/platform variant that output is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Framework {
    /// Staging label, e.g. `net-4.0`. Used as the output subdirectory name.
    pub label: String,
    /// Package moniker, e.g. `net40`. Used under `lib/` inside packages.
    pub moniker: String,
}

impl Framework {
    /// Parse a staging label of the form `<family>-<version>`.
    ///
    /// The moniker is the family followed by the version with its dots
    /// removed: `net-4.0` → `net40`, `netstandard-2.0` → `netstandard20`,
    /// `net-4.5.1` → `net451`.
    ///
    /// # Errors
    /// Returns an error if the label has no `-`, the family is empty or not
    /// alphabetic, or the version is not dotted digits.
    pub fn parse(label: &str) -> Result<Self, TargetError> {
        let invalid = |reason: &str| TargetError::InvalidLabel {
            label: label.to_owned(),
            reason: reason.to_owned(),
        };

        let Some((family, version)) = label.split_once('-') else {
            return Err(invalid("expected `<family>-<version>`, e.g. `net-4.0`"));
        };
        if family.is_empty() || !family.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid("family must be non-empty and alphabetic"));
        }
        if version.is_empty()
            || version
                .split('.')
                .any(|part| part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(invalid("version must be dot-separated digits"));
        }

        let digits: String = version.chars().filter(|c| *c != '.').collect();
        Ok(Self {
            label: label.to_owned(),
            moniker: format!("{}{digits}", family.to_ascii_lowercase()),
        })
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// The framework used when a project or package does not name one.
pub const DEFAULT_FRAMEWORK_LABEL: &str = "net-4.0";

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("invalid framework label `{label}`: {reason}")]
    InvalidLabel { label: String, reason: String },
}
