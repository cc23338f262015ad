//! `tracing` subscriber setup.

/// Install a `fmt` subscriber. `RUST_LOG` is honored if set; otherwise
/// verbosity defaults to `info`, or `debug` when the caller passes
/// `verbose` (the pipeline's own `--debug` flag).
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
