// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to keep app, owner, and container IDs apart.

mod app_name;
mod id;
mod image_ref;

pub use app_name::{AppName, AppNameError};
pub use id::{AppId, ContainerId, Id, OwnerId};
pub use image_ref::{ImageRef, ParseImageRefError};
