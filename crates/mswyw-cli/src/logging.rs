use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

pub const LOG_ENV: &str = "MSWYW_LOG";

/// Installs the global subscriber, writing to stderr so stdout carries only
/// the report.
///
/// `MSWYW_LOG` takes `EnvFilter` directives, e.g.
/// `MSWYW_LOG=mswyw_providers=debug`. Without it the level is `info` for the
/// mswyw crates under `--verbose` and `warn` otherwise. Safe to call twice.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init();
    });
}

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,mswyw=info,mswyw_core=info,mswyw_providers=info,mswyw_cli=info"
    } else {
        "warn"
    }
}
