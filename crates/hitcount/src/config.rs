//! Control configuration.
//!
//! Two layers: [`ControlConfig`] is what the host passes at load time (the
//! contribution inputs, which name the bound field), and [`WidgetOptions`]
//! tunes behavior (timers, retry policy, acquisition order, rendering).
//! Every option has a default so a partial options file is enough.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};
use crate::host::{RetryPolicy, WORK_ITEM_FORM_SERVICE};

/// Input that names the bound field.
pub const FIELD_NAME_INPUT: &str = "FieldName";

/// Documentation shown by the error surface.
pub const DEFAULT_HELP_URL: &str = "https://docs.microsoft.com/en-us/azure/devops/extend/";

/// Configuration supplied by the host when it loads the control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Contribution inputs, keyed by input id.
    pub inputs: BTreeMap<String, String>,
}

impl ControlConfig {
    /// Wraps a set of inputs.
    #[must_use]
    pub const fn new(inputs: BTreeMap<String, String>) -> Self {
        Self { inputs }
    }

    /// Configuration binding `field`.
    #[must_use]
    pub fn for_field(field: impl Into<String>) -> Self {
        let mut inputs = BTreeMap::new();
        inputs.insert(FIELD_NAME_INPUT.to_string(), field.into());
        Self { inputs }
    }

    /// Reads the field binding.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Configuration`] when the `FieldName` input is
    /// missing or blank.
    pub fn binding(&self) -> Result<Binding> {
        let name = self
            .inputs
            .get(FIELD_NAME_INPUT)
            .map(|s| s.trim())
            .unwrap_or_default();
        if name.is_empty() {
            return Err(ControlError::configuration(
                "FieldName input is required. Make sure the extension is configured with a field.",
            ));
        }
        Ok(Binding(name.to_string()))
    }
}

/// Reference name of the host field the control edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Binding(String);

impl Binding {
    /// The field reference name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Behavior options for the control.
///
/// # Example
///
/// ```rust
/// use hitcount::WidgetOptions;
///
/// let options: WidgetOptions = serde_json::from_str(r#"{ "debounce_ms": 250 }"#).unwrap();
/// assert_eq!(options.debounce_ms, 250);
/// assert_eq!(options.retry.max_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetOptions {
    /// Idle time after the last keystroke before typed text is committed.
    pub debounce_ms: u64,
    /// Accept a leading minus sign in typed input.
    pub allow_negative: bool,
    /// Show a line telling whether the control is synced with the host.
    pub show_sync_status: bool,
    /// Link rendered by the error surface.
    pub help_url: String,
    /// Service identifiers to try, in priority order.
    pub services: Vec<String>,
    /// Acquisition retry policy.
    pub retry: RetryPolicy,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            allow_negative: false,
            show_sync_status: false,
            help_url: DEFAULT_HELP_URL.to_string(),
            services: vec![WORK_ITEM_FORM_SERVICE.to_string()],
            retry: RetryPolicy::default(),
        }
    }
}

impl WidgetOptions {
    /// Debounce interval as a duration.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Options with every timer at zero, for driving the control synchronously.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            debounce_ms: 0,
            retry: RetryPolicy::immediate(3),
            ..Self::default()
        }
    }
}
