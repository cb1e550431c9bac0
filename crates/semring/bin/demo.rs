//! Runs the letter pipeline: `a`..`h` in, `A`..`H` out.
//!
//! Run with: `cargo run -p semring --bin semring-demo`
//!
//! Item lines go to stdout. Set `RUST_LOG=semring=debug` (or `trace` for a
//! log line per item) to see thread lifecycle on stderr.

use semring::{run_letters, StdoutReporter, DEMO_CONFIG};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = run_letters(DEMO_CONFIG, StdoutReporter)?;
    tracing::info!(
        items = output.consumed.len(),
        elapsed = ?output.elapsed,
        "pipeline complete"
    );
    Ok(())
}
