use tracing_subscriber::EnvFilter;

/// Init tracing from MC_LOG, else RUST_LOG, else "info". Logs go to stderr.
pub fn init() {
    let filter = std::env::var("MC_LOG")
        .unwrap_or_else(|_| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
