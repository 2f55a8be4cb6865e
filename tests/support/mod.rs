// ABOUTME: Test support utilities.
// ABOUTME: Provides fake runtime and fetcher, a git fixture, and an orchestrator harness.

use std::sync::Once;

// Each test binary only uses some of these modules, so allow dead_code.
#[allow(dead_code)]
pub mod fake_fetcher;
#[allow(dead_code)]
pub mod fake_runtime;
#[allow(dead_code)]
pub mod git_fixture;
#[allow(dead_code)]
pub mod harness;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("cloudnest=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}
