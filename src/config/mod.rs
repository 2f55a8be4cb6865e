// ABOUTME: Configuration types and parsing for cloudnest.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and defaults for every field.

mod env_value;
mod init;
mod restart_policy;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;

use crate::build::BuildSettings;
use crate::deploy::DeploySettings;
use crate::error::{Error, Result};
use crate::runtime::{RestartPolicyConfig, RuntimeConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "cloudnest.yml";
pub const CONFIG_FILENAME_ALT: &str = "cloudnest.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".cloudnest/config.yml";

/// Variable consulted for the deploy root when the config does not set one.
pub const DEPLOY_ROOT_VAR: &str = "CLOUDNEST_DEPLOY_ROOT";
pub const DEFAULT_DEPLOY_ROOT: &str = "/var/cloudnest/apps";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_deploy_root")]
    pub deploy_root: EnvValue,

    /// Defaults to `apps.json` under the deploy root.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    #[serde(default = "default_image_namespace")]
    pub image_namespace: String,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,

    #[serde(default, deserialize_with = "restart_policy::deserialize")]
    pub restart: RestartPolicyConfig,

    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,

    #[serde(default = "default_build_timeout", with = "humantime_serde")]
    pub build_timeout: Duration,

    #[serde(default = "default_stop_timeout", with = "humantime_serde")]
    pub stop_timeout: Duration,

    #[serde(default = "default_log_tail")]
    pub log_tail: u64,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// Environment every app container starts with.
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
}

/// Commands used by the interpreted-language builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_pip")]
    pub pip: String,
    #[serde(default = "default_npm")]
    pub npm: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            pip: default_pip(),
            npm: default_npm(),
        }
    }
}

fn default_deploy_root() -> EnvValue {
    EnvValue::FromEnv {
        var: DEPLOY_ROOT_VAR.to_string(),
        default: Some(DEFAULT_DEPLOY_ROOT.to_string()),
    }
}

fn default_image_namespace() -> String {
    "cloudnest".to_string()
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_build_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_stop_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_log_tail() -> u64 {
    100
}

fn default_pip() -> String {
    "pip".to_string()
}

fn default_npm() -> String {
    "npm".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deploy_root: default_deploy_root(),
            state_file: None,
            image_namespace: default_image_namespace(),
            runtime: RuntimeConfig::default(),
            restart: RestartPolicyConfig::default(),
            fetch_timeout: default_fetch_timeout(),
            build_timeout: default_build_timeout(),
            stop_timeout: default_stop_timeout(),
            log_tail: default_log_tail(),
            tools: ToolsConfig::default(),
            env: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find a config file in `dir` or the nearest ancestor that has one.
    pub fn discover(dir: &Path) -> Result<Self> {
        for ancestor in dir.ancestors() {
            let candidates = [
                ancestor.join(CONFIG_FILENAME),
                ancestor.join(CONFIG_FILENAME_ALT),
                ancestor.join(CONFIG_FILENAME_DIR),
            ];

            for path in &candidates {
                if path.is_file() {
                    tracing::debug!(path = %path.display(), "loading config");
                    return Self::load(path);
                }
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Like [`discover`](Self::discover), falling back to defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::discover(dir) {
            Err(Error::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.image_namespace.is_empty()
            || !self
                .image_namespace
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::InvalidConfig(format!(
                "image_namespace must be lowercase alphanumerics and hyphens: {:?}",
                self.image_namespace
            )));
        }
        if self.tools.pip.trim().is_empty() || self.tools.npm.trim().is_empty() {
            return Err(Error::InvalidConfig("tools entries cannot be empty".into()));
        }
        Ok(())
    }

    pub fn deploy_root(&self) -> Result<PathBuf> {
        let root = self.deploy_root.resolve()?;
        if root.trim().is_empty() {
            return Err(Error::InvalidConfig("deploy_root cannot be empty".into()));
        }
        Ok(PathBuf::from(root))
    }

    pub fn state_file(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => Ok(self.deploy_root()?.join("apps.json")),
        }
    }

    pub fn build_settings(&self) -> Result<BuildSettings> {
        Ok(BuildSettings {
            image_namespace: self.image_namespace.clone(),
            default_env: resolve_env_map(&self.env)?,
            restart: self.restart.clone(),
            pip: self.tools.pip.clone(),
            npm: self.tools.npm.clone(),
        })
    }

    pub fn deploy_settings(&self) -> Result<DeploySettings> {
        Ok(DeploySettings {
            deploy_root: self.deploy_root()?,
            fetch_timeout: self.fetch_timeout,
            build_timeout: self.build_timeout,
            log_tail: self.log_tail,
        })
    }
}
