//! The numeric model behind the control.

use crate::error::{ControlError, Result};

/// Holds the hit count.
///
/// Decrement stops at zero; increment and direct sets are not clamped, so a
/// negative value can only arrive through [`set_value`](Self::set_value).
///
/// # Example
///
/// ```rust
/// use hitcount::Model;
///
/// let mut model = Model::new(20);
/// model.decrement();
/// model.decrement();
/// assert_eq!(model.value(), 18);
///
/// assert!(model.set_value(None).is_err());
/// assert_eq!(model.value(), 18);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Model {
    value: i64,
}

impl Model {
    /// Creates a model holding `initial`.
    #[must_use]
    pub const fn new(initial: i64) -> Self {
        Self { value: initial }
    }

    /// Replaces the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidValue`] when `value` is `None`; the stored
    /// value is left unchanged.
    pub fn set_value(&mut self, value: Option<i64>) -> Result<()> {
        let value = value.ok_or(ControlError::InvalidValue)?;
        self.set(value);
        Ok(())
    }

    /// Replaces the stored value with one that is known to be present.
    pub fn set(&mut self, value: i64) {
        self.value = value;
    }

    /// Adds one.
    pub fn increment(&mut self) {
        self.value = self.value.saturating_add(1);
    }

    /// Subtracts one unless the value is already at or below zero.
    pub fn decrement(&mut self) {
        if self.value > 0 {
            self.value -= 1;
        }
    }

    /// Returns the current value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.value
    }
}
