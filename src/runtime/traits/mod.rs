// ABOUTME: Capability traits a container runtime provides to the supervisor.
// ABOUTME: ImageOps, ContainerOps, LogOps and RuntimeInfo, plus their union.

mod container;
mod image;
mod logs;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use image::{ImageError, ImageOps};
pub use logs::{LogError, LogLine, LogLineStream, LogOps, LogOptions, LogStream};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the supervisor needs from a runtime.
pub trait ContainerRuntime: ImageOps + ContainerOps + LogOps + RuntimeInfo {}

impl<T: ImageOps + ContainerOps + LogOps + RuntimeInfo> ContainerRuntime for T {}
