// ABOUTME: Container runtime layer for Docker and Podman.
// ABOUTME: Capability traits, the bollard implementation, detection, and the supervisor.

mod bollard;
mod build_context;
mod detection;
mod error;
mod supervisor;
mod traits;
mod types;

pub use self::bollard::BollardRuntime;
pub use build_context::build_context;
pub use detection::{DetectionError, detect_runtime};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use supervisor::{ContainerSupervisor, RunSpec, SupervisorError};
pub use traits::*;
pub use types::{RuntimeConfig, RuntimeEndpoint, RuntimeType};
