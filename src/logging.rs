use anyhow::{Context, Result};

/// Diagnostics go to stderr so they never interleave with the command's
/// output on stdout. `RUST_LOG` overrides the default `warn` filter.
pub fn init_tracing() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter_layer = EnvFilter::try_new(filter).context("invalid RUST_LOG filter")?;
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // A second init (tests) is a no-op.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();

    Ok(())
}
