//! Terminal program loop.
//!
//! [`Program`] owns a [`Model`], reads terminal events, runs commands on
//! background threads and re-renders the view when it changes. The widget is
//! always rendered inline, the way a form control occupies a slot of its host
//! page.

use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveToColumn, MoveUp, Show},
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode},
};
use tracing::{debug, trace};

use crate::runtime::command::Cmd;
use crate::runtime::key::{KeyType, from_crossterm_key};
use crate::runtime::message::{BatchMsg, BlurMsg, FocusMsg, InterruptMsg, Message, QuitMsg};
use crate::runtime::{Model, Result};

/// Program options.
#[derive(Debug, Clone)]
pub struct ProgramOptions {
    /// Report terminal focus gained/lost as [`FocusMsg`]/[`BlurMsg`].
    pub report_focus: bool,
    /// Target frames per second for event polling.
    pub fps: u32,
    /// Skip raw mode and terminal polling; input comes only from the
    /// receiver given to [`Program::with_input_receiver`].
    pub custom_io: bool,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            report_focus: true,
            fps: 60,
            custom_io: false,
        }
    }
}

/// A running widget program.
///
/// # Example
///
/// ```rust,ignore
/// use hitcount::runtime::Program;
///
/// let final_model = Program::new(control).run()?;
/// ```
pub struct Program<M: Model> {
    model: M,
    options: ProgramOptions,
    external_rx: Option<Receiver<Message>>,
    output: Option<Box<dyn Write + Send>>,
}

impl<M: Model> Program<M> {
    /// Create a new program with the given model.
    pub fn new(model: M) -> Self {
        Self {
            model,
            options: ProgramOptions::default(),
            external_rx: None,
            output: None,
        }
    }

    /// Feed messages from an external source (host notifications) into the program.
    #[must_use]
    pub fn with_input_receiver(mut self, rx: Receiver<Message>) -> Self {
        self.external_rx = Some(rx);
        self
    }

    /// Render into a host-supplied output instead of creating one on stdout.
    #[must_use]
    pub fn with_output<W: Write + Send + 'static>(mut self, output: W) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Set the polling frame rate.
    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.options.fps = fps.clamp(1, 120);
        self
    }

    /// Do not touch the terminal; all input arrives via the input receiver.
    #[must_use]
    pub fn with_custom_io(mut self) -> Self {
        self.options.custom_io = true;
        self
    }

    /// Run the program and return the final model state.
    pub fn run(mut self) -> Result<M> {
        match self.output.take() {
            Some(output) => self.run_with_writer(output),
            None => self.run_with_writer(io::stdout()),
        }
    }

    /// Run the program with a custom writer.
    pub fn run_with_writer<W: Write>(self, mut writer: W) -> Result<M> {
        let options = self.options.clone();

        if !options.custom_io {
            enable_raw_mode().map_err(|source| crate::runtime::Error::RawModeFailure {
                action: "enable",
                source,
            })?;
            execute!(writer, Hide)?;
            if options.report_focus {
                execute!(writer, event::EnableFocusChange)?;
            }
        }

        let result = self.event_loop(&mut writer);

        if !options.custom_io {
            if options.report_focus {
                let _ = execute!(writer, event::DisableFocusChange);
            }
            let _ = execute!(writer, Show);
            let _ = writeln!(writer, "\r");
            let _ = disable_raw_mode();
        }

        result
    }

    fn event_loop<W: Write>(mut self, writer: &mut W) -> Result<M> {
        let (tx, rx): (Sender<Message>, Receiver<Message>) = mpsc::channel();

        if let Some(ext_rx) = self.external_rx.take() {
            let tx_clone = tx.clone();
            thread::spawn(move || {
                while let Ok(msg) = ext_rx.recv() {
                    if tx_clone.send(msg).is_err() {
                        break;
                    }
                }
            });
        }

        if let Some(cmd) = self.model.init() {
            Self::handle_command(cmd, tx.clone());
        }

        let mut last_view = String::new();
        self.render(writer, &mut last_view)?;

        let frame_duration = Duration::from_secs_f64(1.0 / f64::from(self.options.fps));

        loop {
            if !self.options.custom_io
                && event::poll(frame_duration).map_err(crate::runtime::Error::EventPoll)?
            {
                match event::read().map_err(crate::runtime::Error::EventPoll)? {
                    Event::Key(key_event) => {
                        if key_event.kind == KeyEventKind::Press {
                            let key_msg = from_crossterm_key(key_event.code, key_event.modifiers);
                            if key_msg.key_type == KeyType::CtrlC {
                                let _ = tx.send(Message::new(InterruptMsg));
                            } else {
                                let _ = tx.send(Message::new(key_msg));
                            }
                        }
                    }
                    Event::FocusGained => {
                        let _ = tx.send(Message::new(FocusMsg));
                    }
                    Event::FocusLost => {
                        let _ = tx.send(Message::new(BlurMsg));
                    }
                    Event::Paste(text) => {
                        let key_msg =
                            crate::runtime::KeyMsg::from_runes(text.chars().collect()).with_paste();
                        let _ = tx.send(Message::new(key_msg));
                    }
                    Event::Mouse(_) | Event::Resize(..) => {}
                }
            }

            let mut needs_render = false;
            while let Ok(msg) = rx.try_recv() {
                if msg.is::<QuitMsg>() || msg.is::<InterruptMsg>() {
                    debug!(msg = msg.type_name(), "program exiting");
                    return Ok(self.model);
                }

                trace!(msg = msg.type_name(), "update");
                if let Some(cmd) = self.model.update(msg) {
                    Self::handle_command(cmd, tx.clone());
                }
                needs_render = true;
            }

            if needs_render {
                self.render(writer, &mut last_view)?;
            }

            if self.options.custom_io {
                thread::sleep(frame_duration);
            }
        }
    }

    fn handle_command(cmd: Cmd, tx: Sender<Message>) {
        thread::spawn(move || {
            let Some(msg) = cmd.execute() else {
                return;
            };
            if msg.is::<BatchMsg>() {
                if let Some(batch) = msg.downcast::<BatchMsg>() {
                    for cmd in batch.0 {
                        Self::handle_command(cmd, tx.clone());
                    }
                }
            } else {
                let _ = tx.send(msg);
            }
        });
    }

    fn render<W: Write>(&self, writer: &mut W, last_view: &mut String) -> Result<()> {
        let view = self.model.view();

        if view == *last_view {
            return Ok(());
        }

        // Rewind over the previous frame so the widget redraws in place.
        let previous_lines = last_view.lines().count();
        let render = |writer: &mut W| -> io::Result<()> {
            if previous_lines > 1 {
                let up = u16::try_from(previous_lines - 1).unwrap_or(u16::MAX);
                execute!(writer, MoveUp(up))?;
            }
            execute!(writer, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
            // Raw mode needs explicit carriage returns.
            write!(writer, "{}", view.replace('\n', "\r\n"))?;
            writer.flush()
        };
        render(writer).map_err(crate::runtime::Error::Render)?;

        *last_view = view;
        Ok(())
    }
}

impl<M: Model> std::fmt::Debug for Program<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        value: i64,
    }

    impl Model for Counter {
        fn init(&self) -> Option<Cmd> {
            None
        }

        fn update(&mut self, msg: Message) -> Option<Cmd> {
            if let Some(n) = msg.downcast::<i64>() {
                self.value += n;
            }
            None
        }

        fn view(&self) -> String {
            format!("value {}", self.value)
        }
    }

    #[test]
    fn test_custom_io_program_processes_external_messages() {
        let (tx, rx) = mpsc::channel();
        tx.send(Message::new(2i64)).unwrap();
        tx.send(Message::new(3i64)).unwrap();
        tx.send(Message::new(QuitMsg)).unwrap();

        let model = Program::new(Counter { value: 0 })
            .with_custom_io()
            .with_fps(120)
            .with_input_receiver(rx)
            .run_with_writer(Vec::new())
            .unwrap();

        assert_eq!(model.value, 5);
    }

    #[test]
    fn test_fps_is_clamped() {
        let program = Program::new(Counter { value: 0 }).with_fps(0);
        assert_eq!(program.options.fps, 1);
    }
}
