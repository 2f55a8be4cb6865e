// ABOUTME: Runtime type detected from a fetched workspace.
// ABOUTME: Selects the build strategy used for an app.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a fetched workspace should be built and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeKind {
    #[serde(rename = "docker")]
    ContainerImage,
    #[serde(rename = "nodejs")]
    NodeRuntime,
    #[serde(rename = "python")]
    PythonRuntime,
    #[serde(rename = "telegram-bot")]
    PythonBot,
    #[serde(rename = "static")]
    StaticSite,
    #[serde(rename = "unknown")]
    Unknown,
}

impl RuntimeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::ContainerImage => "docker",
            RuntimeKind::NodeRuntime => "nodejs",
            RuntimeKind::PythonRuntime => "python",
            RuntimeKind::PythonBot => "telegram-bot",
            RuntimeKind::StaticSite => "static",
            RuntimeKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
