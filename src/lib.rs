// ABOUTME: Library root for cloudnest - the build/deploy orchestration core.
// ABOUTME: The CLI binary in main.rs drives the same API the platform uses.

pub mod app;
pub mod build;
pub mod config;
pub mod deploy;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod runtime;
pub mod source;
pub mod store;
pub mod types;
