// ABOUTME: App record model: spec, runtime fields, and the status state machine.
// ABOUTME: Records only change through AppUpdate values that keep invariants intact.

mod kind;
mod record;
mod status;

pub use kind::RuntimeKind;
pub use record::{AppRecord, AppSpec, AppUpdate, ContainerDescriptor, RecordError};
pub use status::AppStatus;
