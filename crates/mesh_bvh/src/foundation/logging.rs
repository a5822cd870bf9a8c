//! Logging utilities and structured logging support
//!
//! The library only emits records through the `log` facade. Binaries decide
//! whether to install a logger; [`init`] is the one-line way to do it.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from the `RUST_LOG` environment variable
pub fn init() {
    env_logger::init();
}

/// Initialize logging, ignoring the error if a logger is already installed
///
/// Useful in tests and demos that may be started more than once per process.
pub fn try_init() {
    let _ = env_logger::builder().is_test(cfg!(test)).try_init();
}
