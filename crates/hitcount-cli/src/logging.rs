//! Log setup for the binary.
//!
//! The control draws in the terminal, so logs only ever go to a file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::{CliError, Result};

/// Installs a subscriber appending to `log_file`.
///
/// `RUST_LOG` wins over `default_filter`. Without a file nothing is
/// installed and every event is dropped.
///
/// # Errors
///
/// Returns [`CliError::Io`] when the file cannot be opened.
pub fn init(log_file: Option<&Path>, default_filter: &str) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CliError::io(path, source))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
