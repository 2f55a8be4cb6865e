// ABOUTME: Container image reference parsing and the per-app tag convention.
// ABOUTME: Handles formats like nginx, cloudnest/demo:latest, registry:5000/img:tag.

use super::AppName;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),
}

/// A `name[:tag]` image reference. The tag defaults to `latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    name: String,
    tag: String,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_'))
        {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        // A colon followed by a slash belongs to a registry port, not a tag.
        match input.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') && !tag.is_empty() => Ok(Self {
                name: name.to_string(),
                tag: tag.to_string(),
            }),
            _ => Ok(Self {
                name: input.to_string(),
                tag: "latest".to_string(),
            }),
        }
    }

    /// Image tag built for an app: `{namespace}/{name}:latest`.
    pub fn for_app(namespace: &str, app: &AppName) -> Self {
        Self {
            name: format!("{}/{}", namespace, app),
            tag: "latest".to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}
