//! Keyboard input handling.
//!
//! Only the keys a numeric field editor reacts to get their own [`KeyType`];
//! everything printable arrives as [`KeyType::Runes`].

use std::fmt;

/// Keyboard key event message.
///
/// # Example
///
/// ```rust
/// use hitcount::runtime::{KeyMsg, KeyType};
///
/// let key = KeyMsg::from_char('7');
/// assert_eq!(key.key_type, KeyType::Runes);
/// assert_eq!(key.to_string(), "7");
/// assert_eq!(KeyMsg::from_type(KeyType::Up).to_string(), "up");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMsg {
    /// The type of key pressed.
    pub key_type: KeyType,
    /// For `KeyType::Runes`, the characters typed.
    pub runes: Vec<char>,
    /// Whether Alt was held.
    pub alt: bool,
    /// Whether this came from a paste operation.
    pub paste: bool,
}

impl KeyMsg {
    /// Create a new key message from a key type.
    pub fn from_type(key_type: KeyType) -> Self {
        Self {
            key_type,
            runes: Vec::new(),
            alt: false,
            paste: false,
        }
    }

    /// Create a new key message from a character.
    pub fn from_char(c: char) -> Self {
        Self::from_runes(vec![c])
    }

    /// Create a new key message from multiple characters (e.g., from IME).
    pub fn from_runes(runes: Vec<char>) -> Self {
        Self {
            key_type: KeyType::Runes,
            runes,
            alt: false,
            paste: false,
        }
    }

    /// Set the alt modifier.
    #[must_use]
    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Set the paste flag.
    #[must_use]
    pub fn with_paste(mut self) -> Self {
        self.paste = true;
        self
    }
}

impl fmt::Display for KeyMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alt {
            write!(f, "alt+")?;
        }
        if self.key_type == KeyType::Runes {
            if self.paste {
                write!(f, "[")?;
            }
            for c in &self.runes {
                write!(f, "{c}")?;
            }
            if self.paste {
                write!(f, "]")?;
            }
        } else {
            write!(f, "{}", self.key_type)?;
        }
        Ok(())
    }
}

/// Key type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Printable characters (see [`KeyMsg::runes`]).
    Runes,
    /// Enter / Return.
    Enter,
    /// Tab.
    Tab,
    /// Shift+Tab.
    ShiftTab,
    /// Escape.
    Esc,
    /// Backspace.
    Backspace,
    /// Delete.
    Delete,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Page Up.
    PgUp,
    /// Page Down.
    PgDown,
    /// Home.
    Home,
    /// End.
    End,
    /// Break/Interrupt (Ctrl+C).
    CtrlC,
    /// Ctrl+U (clear line).
    CtrlU,
    /// Any other key the widget does not distinguish.
    Other,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Runes => "runes",
            Self::Enter => "enter",
            Self::Tab => "tab",
            Self::ShiftTab => "shift+tab",
            Self::Esc => "esc",
            Self::Backspace => "backspace",
            Self::Delete => "delete",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::PgUp => "pgup",
            Self::PgDown => "pgdown",
            Self::Home => "home",
            Self::End => "end",
            Self::CtrlC => "ctrl+c",
            Self::CtrlU => "ctrl+u",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Convert a crossterm key event into a [`KeyMsg`].
pub fn from_crossterm_key(
    code: crossterm::event::KeyCode,
    modifiers: crossterm::event::KeyModifiers,
) -> KeyMsg {
    use crossterm::event::{KeyCode, KeyModifiers};

    let ctrl = modifiers.contains(KeyModifiers::CONTROL);
    let shift = modifiers.contains(KeyModifiers::SHIFT);
    let alt = modifiers.contains(KeyModifiers::ALT);

    let key_type = match code {
        KeyCode::Char(c) if ctrl => match c.to_ascii_lowercase() {
            'c' => KeyType::CtrlC,
            'u' => KeyType::CtrlU,
            'm' => KeyType::Enter,
            'i' => KeyType::Tab,
            'h' => KeyType::Backspace,
            _ => KeyType::Other,
        },
        KeyCode::Char(c) => {
            let msg = KeyMsg::from_char(c);
            return if alt { msg.with_alt() } else { msg };
        }
        KeyCode::Enter => KeyType::Enter,
        KeyCode::Tab if shift => KeyType::ShiftTab,
        KeyCode::Tab => KeyType::Tab,
        KeyCode::BackTab => KeyType::ShiftTab,
        KeyCode::Esc => KeyType::Esc,
        KeyCode::Backspace => KeyType::Backspace,
        KeyCode::Delete => KeyType::Delete,
        KeyCode::Up => KeyType::Up,
        KeyCode::Down => KeyType::Down,
        KeyCode::Left => KeyType::Left,
        KeyCode::Right => KeyType::Right,
        KeyCode::PageUp => KeyType::PgUp,
        KeyCode::PageDown => KeyType::PgDown,
        KeyCode::Home => KeyType::Home,
        KeyCode::End => KeyType::End,
        _ => KeyType::Other,
    };

    let msg = KeyMsg::from_type(key_type);
    if alt { msg.with_alt() } else { msg }
}
