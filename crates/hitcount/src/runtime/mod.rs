//! Elm Architecture runtime for the widget.
//!
//! A model owns state, `update` turns messages into state changes plus
//! optional [`Cmd`]s, and `view` renders the state as a string. Commands are
//! the only place side effects (host calls, timers) happen.

mod command;
mod key;
mod message;
mod program;
mod simulator;

use std::io;

pub use command::{Cmd, batch, quit, tick};
pub use key::{KeyMsg, KeyType, from_crossterm_key};
pub use message::{BlurMsg, FocusMsg, InterruptMsg, Message, QuitMsg};
pub use program::{Program, ProgramOptions};
pub use simulator::{ProgramSimulator, SimulationStats};

/// Errors that can occur while running a [`Program`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O error during terminal operations.
    #[error("terminal io error: {0}")]
    Io(#[from] io::Error),

    /// Failed to enable or disable raw mode.
    ///
    /// Usually means stdin is not a TTY.
    #[error("failed to {action} raw mode: {source}")]
    RawModeFailure {
        /// Whether we were trying to enable or disable raw mode.
        action: &'static str,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Failed to poll for terminal events.
    #[error("failed to poll terminal events: {0}")]
    EventPoll(io::Error),

    /// Failed to render the view to the terminal.
    #[error("failed to render view: {0}")]
    Render(io::Error),
}

/// A specialized [`Result`] type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The Model trait for widgets driven by a [`Program`].
///
/// # Example
///
/// ```rust
/// use hitcount::runtime::{Cmd, Message, Model};
///
/// struct Hits { value: i64 }
///
/// impl Model for Hits {
///     fn init(&self) -> Option<Cmd> { None }
///
///     fn update(&mut self, msg: Message) -> Option<Cmd> {
///         if let Some(n) = msg.downcast::<i64>() {
///             self.value += n;
///         }
///         None
///     }
///
///     fn view(&self) -> String {
///         format!("Hits: {}", self.value)
///     }
/// }
/// ```
pub trait Model: Send + 'static {
    /// Initialize the model and return an optional startup command.
    ///
    /// This is called once when the program starts.
    fn init(&self) -> Option<Cmd>;

    /// Process a message and return a new command.
    fn update(&mut self, msg: Message) -> Option<Cmd>;

    /// Render the model as a string for display.
    fn view(&self) -> String;
}
