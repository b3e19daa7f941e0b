use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "ledger_scenarios=warn";

/// Installs the fmt subscriber. `RUST_LOG` overrides the default filter.
///
/// Calling it more than once is fine, later calls leave the first
/// subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
