//! Tracing/logging initialization.
//!
//! Every service span in the engine carries `tenant_id` and `invoice_id`
//! fields, so JSON output is queryable per tenant out of the box.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is not set. Query logging from the
/// database driver is noisy at `info`, so it is held back to warnings.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    init_with_filter(filter);
}

/// Initialize with explicit directives, ignoring `RUST_LOG`. Used by tools
/// and tests that need a fixed verbosity.
pub fn init_with_directives(directives: &str) {
    init_with_filter(EnvFilter::new(directives));
}

fn init_with_filter(filter: EnvFilter) {
    // JSON lines with timestamps; spans carry the tenant/invoice fields.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init();
        init_with_directives("debug");
        init();
    }
}
