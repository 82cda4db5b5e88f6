//! Tracing subscriber setup.

mod logging;

pub use logging::setup_logging;
