//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "content_downloader=debug"
    } else {
        "content_downloader=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
