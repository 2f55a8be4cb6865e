// ABOUTME: App deployment orchestration using the type state pattern.
// ABOUTME: Exports the orchestrator, pipeline states, locks and errors.

mod deployment;
mod error;
mod lock;
mod orchestrator;
mod settings;
mod state;
mod transitions;

pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind};
pub use lock::{DeployGuard, DeployLocks, LockInfo, Operation};
pub use orchestrator::{ControlOutcome, DeployHandle, Orchestrator};
pub use settings::DeploySettings;
pub use state::{Detected, Fetched, Pending};
