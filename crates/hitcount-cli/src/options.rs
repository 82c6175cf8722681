//! Loading [`WidgetOptions`] from a TOML file.
//!
//! ```toml
//! debounce_ms = 300
//! show_sync_status = true
//! services = ["ms.vss-work-web.work-item-form-service"]
//!
//! [retry]
//! max_attempts = 5
//! backoff = { kind = "fixed", step_ms = 500 }
//! ```

use std::fs;
use std::path::Path;

use hitcount::WidgetOptions;
use tracing::debug;

use crate::error::{CliError, Result};

/// Reads options from `path`, or returns the defaults when there is none.
///
/// # Errors
///
/// Returns [`CliError::Io`] when the file cannot be read and
/// [`CliError::Options`] when it does not parse.
pub fn load(path: Option<&Path>) -> Result<WidgetOptions> {
    let Some(path) = path else {
        return Ok(WidgetOptions::default());
    };
    let text = fs::read_to_string(path).map_err(|source| CliError::io(path, source))?;
    let options = parse(&text).map_err(|source| CliError::Options {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), ?options, "loaded widget options");
    Ok(options)
}

/// Parses options from TOML text; absent keys keep their defaults.
///
/// # Errors
///
/// Returns the TOML error when the text does not match the options shape.
pub fn parse(text: &str) -> std::result::Result<WidgetOptions, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hitcount::host::Backoff;

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(load(None).unwrap(), WidgetOptions::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let options = parse("debounce_ms = 300\nshow_sync_status = true\n").unwrap();
        assert_eq!(options.debounce_ms, 300);
        assert!(options.show_sync_status);
        assert_eq!(options.retry, WidgetOptions::default().retry);
        assert_eq!(options.services, WidgetOptions::default().services);
    }

    #[test]
    fn retry_table_is_read() {
        let options = parse(
            "[retry]\nmax_attempts = 5\nbackoff = { kind = \"fixed\", step_ms = 500 }\n",
        )
        .unwrap();
        assert_eq!(options.retry.max_attempts, 5);
        assert_eq!(options.retry.backoff, Backoff::Fixed(500));
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(parse("debounce_ms = \"soon\"").is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load(Some(Path::new("/nonexistent/hitcount.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }
}
