//! Logging configuration for the prism compiler
//!
//! Thin helpers over `log` + `env_logger`. The pipeline logs phase
//! progress at `info!`, per-entity detail at `debug!`, and per-node detail
//! at `trace!`; set `RUST_LOG` to control output at runtime:
//!
//! ```bash
//! RUST_LOG=info prism demo      # show resolution phases
//! RUST_LOG=compiler::resolver=trace prism demo
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging with sensible defaults (Warn level).
///
/// Only initializes once; subsequent calls are no-ops.
pub fn init() {
    init_with_level(LevelFilter::Warn);
}

/// Initialize logging with a specific level.
pub fn init_with_level(level: LevelFilter) {
    INIT.call_once(|| {
        Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{:5}] {} - {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            })
            .init();
    });
}

/// Initialize logging from the RUST_LOG environment variable, defaulting
/// to Warn when unset.
pub fn init_from_env() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    });
}

/// Test-friendly initialization; never panics when called repeatedly.
pub fn init_test() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_test();
        init_test();
        log::debug!("still alive");
    }
}
