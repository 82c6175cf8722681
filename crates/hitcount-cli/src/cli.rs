//! Command-line interface for `hitcount`.
//!
//! # Examples
//!
//! ```bash
//! # Edit Custom.HitCount of the work item in bug.json
//! hitcount --work-item bug.json --field Custom.HitCount
//!
//! # Print the current count and exit
//! hitcount --work-item bug.json --field Custom.HitCount show
//!
//! # Exercise the retry path, logging to a file
//! hitcount --work-item bug.json --unavailable-for 2 --log-file hitcount.log -vv
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hit count control for a work item stored as JSON.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hitcount",
    author,
    version,
    about = "Hit count control for a work item stored as JSON",
    long_about = "Runs the hit count control in the terminal, bound to one field of a \
                  work item file. Edits are written back to the file, and changes made \
                  to the file by other programs are picked up while running."
)]
pub struct Cli {
    /// Work item file
    ///
    /// JSON of the form {"id": 1, "fields": {"Custom.HitCount": 3}}
    #[arg(long, short = 'w', env = "HITCOUNT_WORK_ITEM")]
    pub work_item: PathBuf,

    /// Reference name of the bound field
    ///
    /// Leaving it empty shows the configuration error surface
    #[arg(long, short = 'f', env = "HITCOUNT_FIELD", default_value = "")]
    pub field: String,

    /// Widget options file (TOML)
    #[arg(long, env = "HITCOUNT_OPTIONS")]
    pub options: Option<PathBuf>,

    /// Write logs to this file
    ///
    /// Nothing is logged without it, since the control owns the terminal
    #[arg(long, env = "HITCOUNT_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Refuse to hand out the form service
    #[arg(long)]
    pub offline: bool,

    /// Refuse the first N form service requests
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub unavailable_for: u32,

    /// Optional subcommand
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the control interactively (default)
    Run,

    /// Print the bound field's current count and exit
    Show,
}

impl Cli {
    /// Parse command line arguments.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create CLI from iterator (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if argument parsing fails.
    pub fn try_parse_from<I, T>(iter: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// The subcommand to run.
    #[must_use]
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }

    /// Default log filter for the verbosity, used when `RUST_LOG` is unset.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
