#![forbid(unsafe_code)]

//! # Hitcount CLI
//!
//! A terminal host for the hit count control. It plays the part of the work
//! item form: the work item lives in a JSON file, the control edits one of its
//! fields, and edits made to the file elsewhere show up live.

pub mod app;
pub mod cli;
pub mod error;
pub mod logging;
pub mod options;
pub mod workitem;

pub use app::App;
pub use cli::{Cli, Command};
pub use error::CliError;
pub use workitem::{FileHost, WorkItem};
