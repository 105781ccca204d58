pub mod builders;
pub mod fakes;

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Uses the same variable as the binary, e.g.:
/// `COMPOSE_WATCH_LOG=compose_watch=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(compose_watch::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .try_init()
            .ok();
    });
}

/// Run a future with a 5-second timeout.
///
/// Under a paused clock the timeout elapses in virtual time, so a stuck
/// pipeline fails fast instead of hanging the test run.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
