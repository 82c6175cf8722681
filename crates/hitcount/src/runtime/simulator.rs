//! Program simulator for driving models without a terminal.
//!
//! The simulator plays the part of the program loop: it queues messages,
//! calls `update` and `view`, and executes returned commands synchronously on
//! the calling thread, feeding their messages back into the queue. Batches are
//! expanded in order, so a run is deterministic as long as the
//! commands themselves are (zero-length ticks, fake hosts).

use std::collections::VecDeque;

use crate::runtime::command::{self, Cmd};
use crate::runtime::message::{InterruptMsg, Message, QuitMsg};
use crate::runtime::Model;

/// Statistics tracked during simulation.
#[derive(Debug, Clone, Default)]
pub struct SimulationStats {
    /// Number of times init() was called.
    pub init_calls: usize,
    /// Number of times update() was called.
    pub update_calls: usize,
    /// Number of times view() was called.
    pub view_calls: usize,
    /// Commands that were returned from init/update.
    pub commands_returned: usize,
    /// Commands the simulator executed.
    pub commands_executed: usize,
    /// Whether quit was requested.
    pub quit_requested: bool,
}

/// A simulator for testing Model implementations without a terminal.
///
/// # Example
///
/// ```rust
/// use hitcount::runtime::{Cmd, Message, Model, ProgramSimulator};
///
/// struct Hits { value: i64 }
///
/// impl Model for Hits {
///     fn init(&self) -> Option<Cmd> { None }
///     fn update(&mut self, msg: Message) -> Option<Cmd> {
///         if let Some(n) = msg.downcast::<i64>() {
///             self.value += n;
///         }
///         None
///     }
///     fn view(&self) -> String {
///         format!("Hits: {}", self.value)
///     }
/// }
///
/// let mut sim = ProgramSimulator::new(Hits { value: 0 });
/// sim.send(Message::new(5i64));
/// sim.send(Message::new(3i64));
/// sim.run_until_empty();
///
/// assert_eq!(sim.model().value, 8);
/// assert_eq!(sim.last_view(), Some("Hits: 8"));
/// ```
pub struct ProgramSimulator<M: Model> {
    model: M,
    input_queue: VecDeque<Message>,
    output_views: Vec<String>,
    stats: SimulationStats,
    initialized: bool,
}

impl<M: Model> ProgramSimulator<M> {
    /// Create a new simulator with the given model.
    pub fn new(model: M) -> Self {
        Self {
            model,
            input_queue: VecDeque::new(),
            output_views: Vec::new(),
            stats: SimulationStats::default(),
            initialized: false,
        }
    }

    /// Initialize the model, calling init() and returning its command.
    ///
    /// The command is not executed; pass it to [`dispatch`](Self::dispatch)
    /// or use [`start`](Self::start).
    pub fn init(&mut self) -> Option<Cmd> {
        if self.initialized {
            return None;
        }
        self.initialized = true;
        self.stats.init_calls += 1;

        let cmd = self.model.init();
        if cmd.is_some() {
            self.stats.commands_returned += 1;
        }

        self.stats.view_calls += 1;
        self.output_views.push(self.model.view());

        cmd
    }

    /// Initialize the model and execute its startup command.
    pub fn start(&mut self) {
        let cmd = self.init();
        self.dispatch(cmd);
    }

    /// Queue a message for processing.
    pub fn send(&mut self, msg: Message) {
        self.input_queue.push_back(msg);
    }

    /// Execute a command now and queue whatever messages it produces.
    pub fn dispatch(&mut self, cmd: Option<Cmd>) {
        let Some(cmd) = cmd else {
            return;
        };
        self.stats.commands_executed += 1;
        if let Some(msg) = cmd.execute() {
            let mut out = Vec::new();
            command::flatten(msg, &mut out);
            self.input_queue.extend(out);
        }
    }

    /// Process one message from the queue, calling update and view.
    ///
    /// Returns the command returned by update, if any, without executing it.
    pub fn step(&mut self) -> Option<Cmd> {
        if !self.initialized {
            // The startup command is dropped here; call `start` to run it.
            let _ = self.init();
        }

        let msg = self.input_queue.pop_front()?;

        if msg.is::<QuitMsg>() || msg.is::<InterruptMsg>() {
            self.stats.quit_requested = true;
            return None;
        }

        self.stats.update_calls += 1;
        let cmd = self.model.update(msg);
        if cmd.is_some() {
            self.stats.commands_returned += 1;
        }

        self.stats.view_calls += 1;
        self.output_views.push(self.model.view());

        cmd
    }

    /// Process all pending messages until the queue is empty or quit is requested,
    /// executing every command returned along the way.
    ///
    /// Returns the number of messages processed.
    pub fn run_until_empty(&mut self) -> usize {
        self.run_until_quit(usize::MAX)
    }

    /// Run until quit is received, the queue drains, or `max_steps` is reached.
    ///
    /// Returns the number of steps processed.
    pub fn run_until_quit(&mut self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && !self.stats.quit_requested {
            if self.input_queue.is_empty() {
                break;
            }
            let cmd = self.step();
            self.dispatch(cmd);
            steps += 1;
        }
        steps
    }

    /// Get a reference to the current model state.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get a mutable reference to the current model state.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Consume the simulator and return the final model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Get the simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get all captured view outputs.
    pub fn views(&self) -> &[String] {
        &self.output_views
    }

    /// Get the most recent view output.
    pub fn last_view(&self) -> Option<&str> {
        self.output_views.last().map(String::as_str)
    }

    /// Check if quit has been requested.
    pub fn is_quit(&self) -> bool {
        self.stats.quit_requested
    }

    /// Get the number of pending messages.
    pub fn pending_count(&self) -> usize {
        self.input_queue.len()
    }
}
