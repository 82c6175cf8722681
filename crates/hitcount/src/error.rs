//! Error types for the hit count control.
//!
//! Only [`ControlError::Configuration`] ever reaches the user (through the
//! error surface). Host failures are recovered locally and logged, and
//! [`ControlError::InvalidValue`] is kept from happening by the field's input
//! filtering.
//!
//! # Recovery Strategies
//!
//! | Error Variant | Recovery Strategy |
//! |--------------|-------------------|
//! | [`Configuration`](ControlError::Configuration) | Fatal, render the error surface |
//! | [`ServiceAcquisition`](ControlError::ServiceAcquisition) | Continue in local-only mode |
//! | [`HostWrite`](ControlError::HostWrite) | Keep the local value, log |
//! | [`HostRead`](ControlError::HostRead) | Start from 0 |
//! | [`InvalidValue`](ControlError::InvalidValue) | Reject the write, value unchanged |

use thiserror::Error;

/// Failures reported by the host's form services.
///
/// Stores messages as `String`s so the type stays `Clone` and `PartialEq`
/// and can travel inside messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host did not provide the requested service.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The host did not answer in time.
    #[error("host call timed out")]
    Timeout,

    /// The service handle is no longer valid and must be acquired again.
    #[error("service handle is no longer valid")]
    InvalidHandle,

    /// The host refused the operation.
    #[error("host rejected the request: {0}")]
    Rejected(String),
}

impl HostError {
    /// Creates an unavailable error with the given message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates a rejection error with the given message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Returns true if the handle should be re-acquired before retrying.
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, Self::InvalidHandle)
    }
}

/// Errors raised by the control and its model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The control was loaded without a usable field binding.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No acquisition strategy produced a form service.
    #[error("form service unavailable after {attempts} attempt(s): {last}")]
    ServiceAcquisition {
        /// Number of attempts made.
        attempts: u32,
        /// The last failure observed.
        last: HostError,
    },

    /// Writing the field value to the host failed.
    #[error("failed to write field {field}: {source}")]
    HostWrite {
        /// Reference name of the bound field.
        field: String,
        /// The host failure.
        #[source]
        source: HostError,
    },

    /// Reading the field value from the host failed.
    #[error("failed to read field value: {0}")]
    HostRead(#[source] HostError),

    /// The model was asked to store an absent value.
    #[error("value cannot be undefined or null")]
    InvalidValue,
}

impl ControlError {
    /// Creates a configuration error with the given message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns true for the one error class that disables the control.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// A specialized [`Result`] type for control operations.
pub type Result<T> = std::result::Result<T, ControlError>;
