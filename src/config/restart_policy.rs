// ABOUTME: Text form of container restart policies in cloudnest.yml.
// ABOUTME: Accepts no, always, unless-stopped, on-failure and on-failure:<retries>.

use crate::runtime::RestartPolicyConfig;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

impl FromStr for RestartPolicyConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, retries) = match s.split_once(':') {
            Some((name, retries)) => (name, Some(retries)),
            None => (s, None),
        };

        match (name, retries) {
            ("no", None) => Ok(Self::No),
            ("always", None) => Ok(Self::Always),
            ("unless-stopped", None) => Ok(Self::UnlessStopped),
            ("on-failure", None) => Ok(Self::OnFailure { max_retries: None }),
            ("on-failure", Some(n)) => n
                .parse()
                .map(|n| Self::OnFailure {
                    max_retries: Some(n),
                })
                .map_err(|_| format!("invalid max retries in restart policy: {n:?}")),
            _ => Err(format!("unknown restart policy: {s:?}")),
        }
    }
}

impl fmt::Display for RestartPolicyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::No => f.write_str("no"),
            Self::Always => f.write_str("always"),
            Self::UnlessStopped => f.write_str("unless-stopped"),
            Self::OnFailure { max_retries: None } => f.write_str("on-failure"),
            Self::OnFailure {
                max_retries: Some(n),
            } => write!(f, "on-failure:{n}"),
        }
    }
}

/// `deserialize_with` hook for the `restart` key.
pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<RestartPolicyConfig, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}
