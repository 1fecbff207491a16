//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter directives for a `-v` verbosity level.
///
/// `RUST_LOG`, when set, takes precedence over this.
pub fn default_directives(level: u8) -> &'static str {
    match level {
        0 => "info",
        1 => "info,scalebridge=debug",
        _ => "info,scalebridge=trace",
    }
}

/// Install the global subscriber. Call once, from `main`.
pub fn init(level: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
