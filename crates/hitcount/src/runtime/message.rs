//! Message types for the Elm Architecture.
//!
//! Messages are the only way to update a model. Key presses, terminal focus
//! changes, timer ticks, host notifications and host call results all arrive
//! as messages.

use std::any::Any;
use std::fmt;

/// A type-erased message container.
///
/// Any `Send + 'static` value can travel as a message. The payload's type
/// name is kept alongside it so logs can say what was delivered.
///
/// # Example
///
/// ```rust
/// use hitcount::runtime::Message;
///
/// struct StepMsg(i64);
///
/// let msg = Message::new(StepMsg(1));
/// if let Some(step) = msg.downcast::<StepMsg>() {
///     assert_eq!(step.0, 1);
/// }
/// ```
pub struct Message {
    inner: Box<dyn Any + Send>,
    name: &'static str,
}

impl Message {
    /// Wraps any sendable value.
    pub fn new<M: Any + Send + 'static>(msg: M) -> Self {
        Self {
            inner: Box::new(msg),
            name: std::any::type_name::<M>(),
        }
    }

    /// Takes the payload out if it is an `M`.
    pub fn downcast<M: Any + Send + 'static>(self) -> Option<M> {
        self.inner.downcast::<M>().ok().map(|b| *b)
    }

    /// Borrows the payload if it is an `M`.
    pub fn downcast_ref<M: Any + Send + 'static>(&self) -> Option<&M> {
        self.inner.downcast_ref::<M>()
    }

    /// Whether the payload is an `M`.
    pub fn is<M: Any + Send + 'static>(&self) -> bool {
        self.inner.is::<M>()
    }

    /// Type name of the payload, for logs.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Message").field(&self.name).finish()
    }
}

/// Message to quit the program gracefully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuitMsg;

/// Message for Ctrl+C interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptMsg;

/// Message when the terminal gains focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusMsg;

/// Message when the terminal loses focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurMsg;

/// Internal message for batch command execution.
pub(crate) struct BatchMsg(pub Vec<super::Cmd>);
