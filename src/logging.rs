//! Diagnostic logging.
//!
//! User-facing output goes through the console macros in the crate root. This
//! module wires up `tracing` for everything else: structured events written to
//! stderr so they never interleave with the per-track report on stdout.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise only warnings are shown, or debug
/// events of this crate when `verbose` is requested. Calling it twice is
/// harmless (the second install is ignored).
pub fn init(verbose: bool) {
    let default_directives = if verbose {
        "plexport=debug"
    } else {
        "plexport=warn"
    };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_directives));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
