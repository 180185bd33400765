//! Logging setup. Diagnostics and warnings go to standard error so they
//! never mix with query output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used when `RUST_LOG` is not set: `-v` raises it, `-q` lowers it.
pub fn default_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over flags.
pub fn init(verbose: u8, quiet: bool) {
    let level = default_level(verbose, quiet);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rowql={level},rowql_core={level}").into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
