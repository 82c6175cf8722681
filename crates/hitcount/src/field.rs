//! Number entry field with increment and decrement affordances.
//!
//! The field owns only presentation state: the text being edited, focus and
//! the debounce timer. It never changes the [`Model`]; instead `update`
//! reports what the user asked for as a [`FieldEvent`] and the owner decides.
//!
//! # Keys
//!
//! | Key | Effect |
//! |-----|--------|
//! | digits | edit (focused) |
//! | `-` | leading sign when negatives are allowed, otherwise step down |
//! | `+`, `PgUp` | step up |
//! | `PgDown` | step down |
//! | `Up` / `Down` | step up / down (focused) |
//! | `Backspace`, `Ctrl+U` | delete last digit, clear (focused) |
//! | `Enter` | commit (focused), focus (blurred) |
//! | `Esc`, `Tab` | commit and blur |
//!
//! # Example
//!
//! ```rust
//! use hitcount::field::{FieldEvent, FieldOptions, NumberField};
//! use hitcount::runtime::{KeyMsg, KeyType, Message};
//! use hitcount::Model;
//!
//! let mut field = NumberField::new(&Model::new(3), FieldOptions::default());
//! let (event, _) = field.update(&Message::new(KeyMsg::from_type(KeyType::Up)));
//! assert_eq!(event, Some(FieldEvent::StepUp));
//! // The field does not change its own value for steps.
//! assert_eq!(field.value(), 3);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossterm::style::{Stylize, style};
use unicode_width::UnicodeWidthStr;

use crate::config::WidgetOptions;
use crate::model::Model;
use crate::runtime::{BlurMsg, Cmd, FocusMsg, KeyMsg, KeyType, Message, tick};

/// Global ID counter for field instances.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Longest text accepted, sign included (`i64::MIN` has 20 characters).
const MAX_LEN: usize = 20;

/// What the user asked the field to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    /// A typed value was committed.
    Changed(i64),
    /// Increment requested (button or arrow key).
    StepUp,
    /// Decrement requested (button or arrow key).
    StepDown,
}

/// Sent when the debounce interval after the last edit elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceMsg {
    id: u64,
    tag: u64,
}

impl DebounceMsg {
    /// Creates a debounce message for field `id` carrying `tag`.
    #[must_use]
    pub const fn new(id: u64, tag: u64) -> Self {
        Self { id, tag }
    }
}

/// Presentation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOptions {
    /// Idle time before typed text is committed.
    pub debounce: Duration,
    /// Whether a leading minus sign may be typed.
    pub allow_negative: bool,
    /// Minimum width of the input box in columns.
    pub width: usize,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            allow_negative: false,
            width: 8,
        }
    }
}

impl From<&WidgetOptions> for FieldOptions {
    fn from(options: &WidgetOptions) -> Self {
        Self {
            debounce: options.debounce(),
            allow_negative: options.allow_negative,
            ..Self::default()
        }
    }
}

/// The number entry field.
#[derive(Debug, Clone)]
pub struct NumberField {
    id: u64,
    /// Debounce generation; ticks carrying an older tag are stale.
    tag: u64,
    text: String,
    /// Last value rendered or committed.
    value: i64,
    /// Text differs from `value` and is waiting to be committed.
    dirty: bool,
    focused: bool,
    options: FieldOptions,
}

impl NumberField {
    /// Creates a focused field showing the model's value.
    #[must_use]
    pub fn new(model: &Model, options: FieldOptions) -> Self {
        Self {
            id: next_id(),
            tag: 0,
            text: model.value().to_string(),
            value: model.value(),
            dirty: false,
            focused: true,
            options,
        }
    }

    /// Discards all presentation state and shows `model` again.
    pub fn reset(&mut self, model: &Model) {
        self.tag += 1;
        self.text = model.value().to_string();
        self.value = model.value();
        self.dirty = false;
        self.focused = true;
    }

    /// The field's unique ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The value currently rendered.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// The text in the input, including uncommitted edits.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the input has keyboard focus.
    #[must_use]
    pub const fn focused(&self) -> bool {
        self.focused
    }

    /// Whether typed text is waiting for the debounce timer.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.dirty
    }

    /// Shows `value` without reporting an event.
    ///
    /// Any uncommitted edit is dropped and its timer cancelled, so an
    /// externally-sourced value is never echoed back as a change.
    pub fn set_value(&mut self, value: i64) {
        self.cancel_pending();
        self.value = value;
        self.text = value.to_string();
    }

    /// Cancels the debounce timer, keeping the text as typed.
    pub fn cancel_pending(&mut self) {
        self.tag += 1;
        self.dirty = false;
    }

    /// Gives the input keyboard focus.
    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Takes focus away, committing any pending edit.
    pub fn blur(&mut self) -> Option<FieldEvent> {
        self.focused = false;
        self.commit()
    }

    /// Handles a message.
    ///
    /// Returns the event the user triggered, if any, and a command to run
    /// (the debounce timer).
    pub fn update(&mut self, msg: &Message) -> (Option<FieldEvent>, Option<Cmd>) {
        if let Some(debounce) = msg.downcast_ref::<DebounceMsg>() {
            if debounce.id != self.id || debounce.tag != self.tag || !self.dirty {
                return (None, None);
            }
            return (self.commit(), None);
        }

        if msg.is::<FocusMsg>() {
            self.focus();
            return (None, None);
        }

        if msg.is::<BlurMsg>() {
            return (self.blur(), None);
        }

        match msg.downcast_ref::<KeyMsg>() {
            Some(key) => self.handle_key(key),
            None => (None, None),
        }
    }

    fn handle_key(&mut self, key: &KeyMsg) -> (Option<FieldEvent>, Option<Cmd>) {
        match key.key_type {
            KeyType::PgUp => return (self.step(FieldEvent::StepUp), None),
            KeyType::PgDown => return (self.step(FieldEvent::StepDown), None),
            KeyType::Runes if !key.paste && key.runes == ['+'] => {
                return (self.step(FieldEvent::StepUp), None);
            }
            KeyType::Runes if !key.paste && key.runes == ['-'] && !self.options.allow_negative => {
                return (self.step(FieldEvent::StepDown), None);
            }
            _ => {}
        }

        if !self.focused {
            if matches!(key.key_type, KeyType::Enter | KeyType::Tab) {
                self.focus();
            }
            return (None, None);
        }

        match key.key_type {
            KeyType::Up => (self.step(FieldEvent::StepUp), None),
            KeyType::Down => (self.step(FieldEvent::StepDown), None),
            KeyType::Enter => (self.commit(), None),
            KeyType::Esc | KeyType::Tab | KeyType::ShiftTab => (self.blur(), None),
            KeyType::Backspace => {
                let edited = self.text.pop().is_some();
                (None, self.edited(edited))
            }
            KeyType::CtrlU => {
                let edited = !self.text.is_empty();
                self.text.clear();
                (None, self.edited(edited))
            }
            KeyType::Runes if !key.alt => {
                let edited = self.insert(&key.runes);
                (None, self.edited(edited))
            }
            _ => (None, None),
        }
    }

    /// A step replaces whatever is being typed.
    fn step(&mut self, event: FieldEvent) -> Option<FieldEvent> {
        if self.dirty {
            self.set_value(self.value);
        }
        Some(event)
    }

    /// Inserts the acceptable characters of `runes`; returns whether anything changed.
    fn insert(&mut self, runes: &[char]) -> bool {
        let mut changed = false;
        for &c in runes {
            if self.text.len() >= MAX_LEN {
                break;
            }
            if c.is_ascii_digit() {
                self.text.push(c);
                changed = true;
            } else if c == '-' && self.options.allow_negative && !self.text.starts_with('-') {
                self.text.insert(0, '-');
                changed = true;
            }
        }
        changed
    }

    /// Restarts the debounce timer after an edit.
    fn edited(&mut self, changed: bool) -> Option<Cmd> {
        if !changed {
            return None;
        }
        self.dirty = true;
        self.tag += 1;

        let id = self.id;
        let tag = self.tag;
        Some(tick(self.options.debounce, move |_| {
            Message::new(DebounceMsg { id, tag })
        }))
    }

    /// Parses the text; reports a change only when the value differs.
    fn commit(&mut self) -> Option<FieldEvent> {
        self.cancel_pending();

        let parsed = if self.text.is_empty() {
            Some(0)
        } else {
            self.text.parse::<i64>().ok()
        };

        match parsed {
            Some(value) if value != self.value => {
                self.value = value;
                self.text = value.to_string();
                Some(FieldEvent::Changed(value))
            }
            _ => {
                self.text = self.value.to_string();
                None
            }
        }
    }

    /// Renders the field as `[-] [ value ] [+]`.
    #[must_use]
    pub fn view(&self) -> String {
        let shown = if self.focused {
            format!("{}\u{258f}", self.text)
        } else {
            self.text.clone()
        };
        let pad = self.options.width.saturating_sub(shown.width());
        let body = format!(" {shown}{} ", " ".repeat(pad));

        let input = if self.focused {
            style(body).reverse().to_string()
        } else {
            style(body).underlined().to_string()
        };

        format!(
            "{} {} {}",
            style("[-]").bold(),
            input,
            style("[+]").bold()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(value: i64) -> NumberField {
        NumberField::new(&Model::new(value), FieldOptions::default())
    }

    fn key(key_type: KeyType) -> Message {
        Message::new(KeyMsg::from_type(key_type))
    }

    fn chars(s: &str) -> Message {
        Message::new(KeyMsg::from_runes(s.chars().collect()))
    }

    #[test]
    fn renders_model_value_at_construction() {
        let f = field(42);
        assert_eq!(f.text(), "42");
        assert!(f.view().contains("42"));
        assert!(f.view().contains("[+]"));
        assert!(f.view().contains("[-]"));
    }

    #[test]
    fn arrows_step_without_editing() {
        let mut f = field(5);
        assert_eq!(f.update(&key(KeyType::Up)).0, Some(FieldEvent::StepUp));
        assert_eq!(f.update(&key(KeyType::Down)).0, Some(FieldEvent::StepDown));
        assert_eq!(f.text(), "5");
    }

    #[test]
    fn buttons_step_even_when_blurred() {
        let mut f = field(5);
        f.blur();
        assert_eq!(f.update(&chars("+")).0, Some(FieldEvent::StepUp));
        assert_eq!(f.update(&chars("-")).0, Some(FieldEvent::StepDown));
        assert_eq!(f.update(&key(KeyType::PgUp)).0, Some(FieldEvent::StepUp));
        // Arrow keys need focus.
        assert_eq!(f.update(&key(KeyType::Up)).0, None);
    }

    #[test]
    fn typing_filters_non_digits_and_starts_timer() {
        let mut f = field(0);
        f.update(&key(KeyType::Backspace));
        let (event, cmd) = f.update(&chars("1a2"));
        assert_eq!(event, None);
        assert!(cmd.is_some());
        assert_eq!(f.text(), "12");
        assert!(f.is_pending());
    }

    #[test]
    fn debounce_commits_latest_text_only() {
        let mut f = field(0);
        f.update(&key(KeyType::Backspace));
        let (_, first) = f.update(&chars("1"));
        let (_, second) = f.update(&chars("5"));

        // The first timer is stale once a newer keystroke restarted it.
        let stale = first.unwrap().execute().unwrap();
        assert_eq!(f.update(&stale).0, None);
        assert!(f.is_pending());

        let fresh = second.unwrap().execute().unwrap();
        assert_eq!(f.update(&fresh).0, Some(FieldEvent::Changed(15)));
        assert!(!f.is_pending());
        assert_eq!(f.value(), 15);
    }

    #[test]
    fn enter_commits_immediately_and_cancels_timer() {
        let mut f = field(3);
        f.update(&key(KeyType::CtrlU));
        let (_, timer) = f.update(&chars("9"));
        assert_eq!(f.update(&key(KeyType::Enter)).0, Some(FieldEvent::Changed(9)));

        let tick = timer.unwrap().execute().unwrap();
        assert_eq!(f.update(&tick).0, None);
    }

    #[test]
    fn unchanged_commit_reports_nothing() {
        let mut f = field(7);
        f.update(&key(KeyType::Backspace));
        f.update(&chars("7"));
        assert_eq!(f.update(&key(KeyType::Enter)).0, None);
    }

    #[test]
    fn empty_commit_is_zero() {
        let mut f = field(7);
        f.update(&key(KeyType::Backspace));
        assert_eq!(f.text(), "");
        assert_eq!(f.blur(), Some(FieldEvent::Changed(0)));
        assert!(!f.focused());
    }

    #[test]
    fn leading_zeros_are_normalized() {
        let mut f = field(0);
        f.update(&chars("07"));
        assert_eq!(f.update(&key(KeyType::Enter)).0, Some(FieldEvent::Changed(7)));
        assert_eq!(f.text(), "7");
    }

    #[test]
    fn minus_is_a_sign_only_when_allowed() {
        let options = FieldOptions {
            allow_negative: true,
            ..FieldOptions::default()
        };
        let mut f = NumberField::new(&Model::new(0), options);
        f.update(&key(KeyType::CtrlU));
        f.update(&chars("4"));
        f.update(&chars("-"));
        f.update(&chars("-"));
        assert_eq!(f.text(), "-4");
        assert_eq!(f.update(&key(KeyType::Enter)).0, Some(FieldEvent::Changed(-4)));
    }

    #[test]
    fn lone_minus_restores_value() {
        let options = FieldOptions {
            allow_negative: true,
            ..FieldOptions::default()
        };
        let mut f = NumberField::new(&Model::new(6), options);
        f.update(&key(KeyType::CtrlU));
        f.update(&chars("-"));
        assert_eq!(f.update(&key(KeyType::Enter)).0, None);
        assert_eq!(f.text(), "6");
    }

    #[test]
    fn set_value_cancels_pending_edit() {
        let mut f = field(1);
        let (_, timer) = f.update(&chars("2"));
        f.set_value(30);
        assert_eq!(f.text(), "30");
        assert!(!f.is_pending());

        let tick = timer.unwrap().execute().unwrap();
        assert_eq!(f.update(&tick).0, None);
    }

    #[test]
    fn step_discards_uncommitted_text() {
        let mut f = field(1);
        f.update(&chars("9"));
        assert_eq!(f.update(&key(KeyType::Up)).0, Some(FieldEvent::StepUp));
        assert_eq!(f.text(), "1");
        assert!(!f.is_pending());
    }

    #[test]
    fn terminal_focus_messages() {
        let mut f = field(2);
        f.update(&chars("5"));
        assert_eq!(f.update(&Message::new(BlurMsg)).0, Some(FieldEvent::Changed(25)));
        assert!(!f.focused());
        f.update(&Message::new(FocusMsg));
        assert!(f.focused());
    }

    #[test]
    fn blurred_field_ignores_typing_until_focused() {
        let mut f = field(2);
        f.blur();
        assert!(f.update(&chars("3")).1.is_none());
        assert_eq!(f.text(), "2");
        f.update(&key(KeyType::Enter));
        assert!(f.focused());
    }

    #[test]
    fn debounce_for_other_field_is_ignored() {
        let mut a = field(0);
        let b = field(0);
        a.update(&chars("1"));
        let foreign = Message::new(DebounceMsg::new(b.id(), 1));
        assert_eq!(a.update(&foreign).0, None);
        assert!(a.is_pending());
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut f = field(0);
        f.update(&chars("8"));
        f.blur();
        f.reset(&Model::new(11));
        assert_eq!(f.text(), "11");
        assert!(f.focused());
        assert!(!f.is_pending());
    }

    #[test]
    fn input_length_is_bounded() {
        let mut f = field(0);
        f.update(&chars(&"9".repeat(40)));
        assert_eq!(f.text().len(), MAX_LEN);
        // Too large for i64: the commit is rejected and the value restored.
        assert_eq!(f.update(&key(KeyType::Enter)).0, None);
        assert_eq!(f.text(), "0");
    }
}
