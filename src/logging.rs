use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbose` switches the fixity crates
/// from `info` to `debug`.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "info,fixity=debug,fixity_core=debug,fixity_scan=debug,fixity_store=debug,fixity_verify=debug"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
