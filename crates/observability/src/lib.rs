//! Shared logging setup for the tradepost crates.

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls become no-ops, so test
/// harnesses can call it per test without coordination.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filter and output format).
pub mod tracing;
