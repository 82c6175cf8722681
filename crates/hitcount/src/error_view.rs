//! Terminal error notice shown in place of the control.

use std::fmt;

use crossterm::style::{Stylize, style};

use crate::config::DEFAULT_HELP_URL;

/// A static notice: the error text and a link to documentation.
///
/// Once rendered the control shows nothing else and accepts no input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    message: String,
    help_url: String,
}

impl ErrorView {
    /// Creates a notice for `error`, which may be a message or an error value.
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            message: error.to_string(),
            help_url: DEFAULT_HELP_URL.to_string(),
        }
    }

    /// Points the documentation link somewhere else.
    #[must_use]
    pub fn with_help_url(mut self, url: impl Into<String>) -> Self {
        self.help_url = url.into();
        self
    }

    /// The error text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The documentation link.
    #[must_use]
    pub fn help_url(&self) -> &str {
        &self.help_url
    }

    /// Renders the notice.
    #[must_use]
    pub fn view(&self) -> String {
        format!(
            "{}\nSee {} {}",
            style(&self.message).red(),
            style("Documentation:").bold(),
            style(&self.help_url).underlined()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;

    #[test]
    fn renders_message_and_link() {
        let view = ErrorView::new("FieldName input is required").view();
        assert!(view.contains("FieldName input is required"));
        assert!(view.contains("Documentation:"));
        assert!(view.contains(DEFAULT_HELP_URL));
    }

    #[test]
    fn accepts_structured_errors() {
        let err = ControlError::configuration("no field");
        let view = ErrorView::new(&err);
        assert_eq!(view.message(), "configuration error: no field");
    }

    #[test]
    fn custom_help_url() {
        let view = ErrorView::new("boom").with_help_url("https://example.test/help");
        assert_eq!(view.help_url(), "https://example.test/help");
        assert!(view.view().contains("https://example.test/help"));
    }
}
