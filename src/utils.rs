//! Logging setup

/// Filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a `pretty_env_logger` logger configured from `RUST_LOG`
pub fn init_logger() -> Result<(), log::SetLoggerError> {
    install(false)
}

/// Installs a logger whose output is captured by the test harness.
///
/// Safe to call from every test; only the first call takes effect.
pub fn init_test_logger() {
    let _ = install(true);
}

fn install(is_test: bool) -> Result<(), log::SetLoggerError> {
    let filters =
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());

    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .is_test(is_test)
        .try_init()
}
