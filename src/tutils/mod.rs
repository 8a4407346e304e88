//! Test helpers: a recording canvas and logging setup.

pub mod canvas;

pub use canvas::{Op, TestCanvas};

use std::sync::Once;

static LOG_INIT: Once = Once::new();

/// Initialize tracing output for tests. Safe to call from every test.
pub fn log_init() {
    LOG_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    });
}
