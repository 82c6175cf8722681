//! The terminal application: the form control plus key hints and quitting.

use hitcount::FormControl;
use hitcount::runtime::{Cmd, KeyMsg, KeyType, Message, Model, quit};

/// Wraps the form control the way a host page wraps an embedded control.
#[derive(Debug)]
pub struct App {
    form: FormControl,
    title: String,
}

impl App {
    /// Creates the app for the work item called `title`.
    pub fn new(form: FormControl, title: impl Into<String>) -> Self {
        Self {
            form,
            title: title.into(),
        }
    }

    /// The hosted form control.
    #[must_use]
    pub const fn form(&self) -> &FormControl {
        &self.form
    }

    /// Mutable access to the hosted form control.
    pub fn form_mut(&mut self) -> &mut FormControl {
        &mut self.form
    }
}

impl Model for App {
    fn init(&self) -> Option<Cmd> {
        self.form.init()
    }

    fn update(&mut self, msg: Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            if key.key_type == KeyType::Runes && key.runes == ['q'] && !key.paste {
                return Some(quit());
            }
        }
        self.form.update(msg)
    }

    fn view(&self) -> String {
        let body = self.form.view();
        if body.is_empty() {
            return format!("{}\nloading…", self.title);
        }
        format!(
            "{}\n{}\n↑/↓ +/- step • digits edit • enter commit • q quit",
            self.title, body
        )
    }
}
