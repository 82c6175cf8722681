//! Commands for side effects.
//!
//! Commands represent IO operations that produce messages. They are the only
//! way to perform side effects: host calls, debounce timers and retry delays
//! are all commands. The program runs each command off the update thread and
//! feeds the produced message back into `update`.

use std::time::{Duration, Instant};

use crate::runtime::message::{BatchMsg, Message, QuitMsg};

/// A command that produces a message when executed.
///
/// Commands are lazy - they don't execute until the program runs them.
/// This keeps update functions pure: they return commands instead of
/// performing side effects.
///
/// # Example
///
/// ```rust
/// use hitcount::runtime::{Cmd, Message};
///
/// struct Loaded(i64);
///
/// let cmd = Cmd::new(|| Message::new(Loaded(7)));
/// let msg = cmd.execute().unwrap();
/// assert_eq!(msg.downcast::<Loaded>().unwrap().0, 7);
/// ```
pub struct Cmd(Box<dyn FnOnce() -> Option<Message> + Send + 'static>);

impl Cmd {
    /// Create a new command from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Message + Send + 'static,
    {
        Self(Box::new(move || Some(f())))
    }

    /// Create a command that may not produce a message.
    pub fn new_optional<F>(f: F) -> Self
    where
        F: FnOnce() -> Option<Message> + Send + 'static,
    {
        Self(Box::new(f))
    }

    /// Execute the command and return the resulting message.
    pub fn execute(self) -> Option<Message> {
        (self.0)()
    }
}

impl std::fmt::Debug for Cmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cmd").finish_non_exhaustive()
    }
}

/// Batch multiple commands to run concurrently.
///
/// Commands in a batch run in parallel with no ordering guarantees.
pub fn batch(cmds: Vec<Option<Cmd>>) -> Option<Cmd> {
    let valid_cmds: Vec<Cmd> = cmds.into_iter().flatten().collect();

    match valid_cmds.len() {
        0 => None,
        1 => valid_cmds.into_iter().next(),
        _ => Some(Cmd::new_optional(move || {
            Some(Message::new(BatchMsg(valid_cmds)))
        })),
    }
}

/// Command that signals the program to quit.
pub fn quit() -> Cmd {
    Cmd::new(|| Message::new(QuitMsg))
}

/// Command that ticks after a duration.
///
/// A zero duration delivers the message without sleeping, which is what
/// tests use to drive debounce and retry timers synchronously.
///
/// # Example
///
/// ```rust
/// use hitcount::runtime::{tick, Message};
/// use std::time::Duration;
///
/// struct RetryMsg(u32);
///
/// let cmd = tick(Duration::ZERO, |_| Message::new(RetryMsg(2)));
/// assert!(cmd.execute().unwrap().is::<RetryMsg>());
/// ```
pub fn tick<F>(duration: Duration, f: F) -> Cmd
where
    F: FnOnce(Instant) -> Message + Send + 'static,
{
    Cmd::new(move || {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
        f(Instant::now())
    })
}

/// Expand a message produced by a command into the messages it stands for.
///
/// Batches are executed in place, in order; any other message
/// is returned as-is. Used by the simulator, which has no thread pool.
pub(crate) fn flatten(msg: Message, out: &mut Vec<Message>) {
    if msg.is::<BatchMsg>() {
        if let Some(batch) = msg.downcast::<BatchMsg>() {
            for cmd in batch.0 {
                if let Some(inner) = cmd.execute() {
                    flatten(inner, out);
                }
            }
        }
    } else {
        out.push(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_new() {
        let cmd = Cmd::new(|| Message::new(42i64));
        let msg = cmd.execute().unwrap();
        assert_eq!(msg.downcast::<i64>().unwrap(), 42);
    }

    #[test]
    fn test_cmd_optional_none() {
        let cmd = Cmd::new_optional(|| None);
        assert!(cmd.execute().is_none());
    }

    #[test]
    fn test_batch_empty_and_single() {
        assert!(batch(vec![]).is_none());
        assert!(batch(vec![None, None]).is_none());

        let single = batch(vec![None, Some(Cmd::new(|| Message::new(1i64)))]).unwrap();
        // A single command is passed through rather than wrapped.
        assert_eq!(single.execute().unwrap().downcast::<i64>(), Some(1));
    }

    #[test]
    fn test_batch_flattens_in_order() {
        let cmd = batch(vec![
            Some(Cmd::new(|| Message::new(1i64))),
            Some(Cmd::new(|| Message::new(2i64))),
        ])
        .unwrap();

        let mut out = Vec::new();
        flatten(cmd.execute().unwrap(), &mut out);
        let values: Vec<i64> = out.into_iter().filter_map(Message::downcast).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_nested_batches_flatten() {
        let inner = batch(vec![
            Some(Cmd::new(|| Message::new(10i64))),
            Some(Cmd::new(|| Message::new(20i64))),
        ]);
        let cmd = batch(vec![inner, Some(Cmd::new(|| Message::new(30i64)))]).unwrap();

        let mut out = Vec::new();
        flatten(cmd.execute().unwrap(), &mut out);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_quit() {
        let msg = quit().execute().unwrap();
        assert!(msg.is::<QuitMsg>());
    }

    #[test]
    fn test_zero_tick_is_immediate() {
        struct Fired;
        let msg = tick(Duration::ZERO, |_| Message::new(Fired)).execute().unwrap();
        assert!(msg.is::<Fired>());
    }
}
