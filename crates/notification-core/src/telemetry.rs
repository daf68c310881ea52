//! Tracing setup shared by the services.

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Map a `--log-level` string to a tracing level. Unknown values fall back
/// to `INFO`.
pub fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install a JSON subscriber as the global default.
///
/// `verbose` raises the level to at least `DEBUG` so decoded payloads are
/// logged.
pub fn init_tracing(log_level: &str, verbose: bool) -> Result<(), SetGlobalDefaultError> {
    let mut level = parse_level(log_level);
    if verbose && level < Level::DEBUG {
        level = Level::DEBUG;
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }
}
