use std::io::{self, BufWriter, Write};

use order_book::protocol::{run_session, write_book};
use order_book::{BookConfig, OrderBook};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), anyhow::Error> {
    let config = BookConfig::from_env();

    // Logs go to stderr so protocol output on stdout stays clean
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    tracing::info!(display_depth = config.display_depth, "Starting order book");

    let mut book = OrderBook::with_config(config);
    let mut out = BufWriter::new(io::stdout().lock());

    let processed = run_session(&mut book, io::stdin().lock(), &mut out)?;

    write_book(&book, &mut out)?;
    out.flush()?;

    tracing::info!(processed, "Input exhausted");
    Ok(())
}
