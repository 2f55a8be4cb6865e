// ABOUTME: Runtime type detection from marker files in a workspace.
// ABOUTME: Pure filesystem inspection with a fixed precedence order.

use crate::app::RuntimeKind;
use std::path::Path;

/// Classify a workspace by the marker files at its root. First match wins:
///
/// 1. `Dockerfile`
/// 2. `package.json`
/// 3. `requirements.txt` or `app.py` (a bot if `bot.py` is also present)
/// 4. `index.html`
pub fn detect_app_type(path: &Path) -> RuntimeKind {
    let has = |file: &str| path.join(file).is_file();

    if has("Dockerfile") {
        RuntimeKind::ContainerImage
    } else if has("package.json") {
        RuntimeKind::NodeRuntime
    } else if has("requirements.txt") || has("app.py") {
        if has("bot.py") {
            RuntimeKind::PythonBot
        } else {
            RuntimeKind::PythonRuntime
        }
    } else if has("index.html") {
        RuntimeKind::StaticSite
    } else {
        RuntimeKind::Unknown
    }
}
