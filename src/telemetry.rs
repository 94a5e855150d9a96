use std::fs::OpenOptions;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log lines go to stdout by default; `LOG_FILE` redirects them to a file
/// and `LOG_FORMAT=json` switches to JSON output. Filtering follows
/// `RUST_LOG`.
pub fn init_telemetry() -> Result<()> {
    if let Ok(log_file_path) = std::env::var("LOG_FILE") {
        return init_file(&log_file_path);
    }

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => init_json(),
        _ => init_stdout(),
    }
}

fn init_stdout() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    Ok(())
}

fn init_json() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    Ok(())
}

fn init_file(log_file_path: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    eprintln!("Logging to file: {}", log_file_path);

    Ok(())
}
