// ABOUTME: Config scaffolding for new installations.
// ABOUTME: Writes a commented cloudnest.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, DEFAULT_DEPLOY_ROOT, DEPLOY_ROOT_VAR};

pub fn init_config(dir: &Path, deploy_root: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    std::fs::write(&config_path, template_yaml(deploy_root))?;
    Ok(())
}

fn template_yaml(deploy_root: Option<&str>) -> String {
    let deploy_root = match deploy_root {
        Some(root) => format!("deploy_root: {root}"),
        None => format!(
            "deploy_root:\n  env: {DEPLOY_ROOT_VAR}\n  default: {DEFAULT_DEPLOY_ROOT}"
        ),
    };

    format!(
        r#"{deploy_root}
# state_file: /var/cloudnest/apps/apps.json
image_namespace: cloudnest

# Container runtime (auto-detected when unset)
# runtime: podman
# socket: /run/podman/podman.sock
restart: unless-stopped

fetch_timeout: 5m
build_timeout: 30m
stop_timeout: 10s
log_tail: 100

tools:
  pip: pip
  npm: npm

# Environment for every app container
env: {{}}
"#
    )
}
