//! Shared helpers for `saltdag` tests: task builders, a fake executor
//! backend, tracing setup and a hang guard.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use saltdag::logging::LOG_ENV_VAR;
use tracing_subscriber::EnvFilter;

/// Upper bound on any single test run; a scheduler bug shows up as a hang.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

static INIT: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// Reads `SALTDAG_LOG`, then `RUST_LOG`, defaulting to `info`. Output only
/// shows for failing tests unless run with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        // Another harness may have installed a subscriber first; keep it.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(out) => out,
        Err(_) => panic!("test did not finish within {TEST_TIMEOUT:?}; scheduler hung?"),
    }
}
