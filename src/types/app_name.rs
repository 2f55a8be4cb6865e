// ABOUTME: Validated app names, unique per owner.
// ABOUTME: Names are lowercased and restricted to DNS-label characters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("app name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("app name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("app name must be alphanumeric (hyphens allowed), found '{0}'")]
    InvalidChar(char),
}

/// Name of an app. Appears in workspace paths, image tags, and container names,
/// so the character set is kept to lowercase ASCII alphanumerics and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppName(String);

impl AppName {
    /// Normalise to lowercase, then validate.
    pub fn parse(input: &str) -> Result<Self, AppNameError> {
        let value = input.trim().to_ascii_lowercase();

        if value.is_empty() {
            return Err(AppNameError::Empty);
        }
        if value.len() > 63 {
            return Err(AppNameError::TooLong);
        }
        if value.starts_with('-') {
            return Err(AppNameError::StartsWithHyphen);
        }
        if value.ends_with('-') {
            return Err(AppNameError::EndsWithHyphen);
        }
        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && *c != '-')
        {
            return Err(AppNameError::InvalidChar(c));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for AppName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AppName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AppName::parse(&s).map_err(serde::de::Error::custom)
    }
}
