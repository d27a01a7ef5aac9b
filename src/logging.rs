use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins, then `-v` flags, then the configured `LOG_LEVEL`.
pub fn init_logging(verbosity: Option<&str>, log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.unwrap_or(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
