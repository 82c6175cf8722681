#![forbid(unsafe_code)]
// Allow pedantic lints for early-stage API ergonomics.
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

//! # Hitcount
//!
//! A numeric "hit count" control for work item forms.
//!
//! The control shows one integer with increment and decrement buttons and an
//! editable input, and keeps it in sync with a field of the work item open in
//! the host form.
//!
//! - **model** - The integer value and its rules
//! - **field** - The number input with stepper buttons
//! - **error_view** - Notice shown when the control cannot start
//! - **control** - Synchronization with the host form
//! - **host** - Host traits, service acquisition and retry policy
//! - **config** - Binding and behavior options
//! - **runtime** - The Elm Architecture runtime driving the widget
//! - **testing** - An in-memory host
//!
//! ## Example
//!
//! ```rust
//! use hitcount::prelude::*;
//! use hitcount::runtime::{KeyMsg, KeyType, Message, ProgramSimulator};
//! use hitcount::testing::FakeHost;
//!
//! let host = FakeHost::new("Custom.Hits").shared();
//! let control = HitCountControl::new(host.clone(), WidgetOptions::immediate());
//!
//! let mut sim = ProgramSimulator::new(control);
//! sim.start();
//! sim.send(Message::new(KeyMsg::from_type(KeyType::Up)));
//! sim.run_until_empty();
//!
//! assert_eq!(sim.model().value(), Some(1));
//! assert_eq!(host.writes(), vec![1]);
//! ```

pub mod config;
pub mod control;
pub mod error;
pub mod error_view;
pub mod field;
pub mod host;
pub mod model;
pub mod runtime;
pub mod testing;

pub use config::{Binding, ControlConfig, WidgetOptions};
pub use control::{FieldChangedMsg, FormControl, HitCountControl, LoadedMsg, SyncState, UnloadedMsg};
pub use error::{ControlError, HostError, Result};
pub use model::Model;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{Binding, ControlConfig, WidgetOptions};
    pub use crate::control::{
        FieldChangedMsg, FormControl, HitCountControl, LoadedMsg, SyncState, UnloadedMsg,
    };
    pub use crate::error::{ControlError, HostError};
    pub use crate::error_view::ErrorView;
    pub use crate::field::{FieldEvent, NumberField};
    pub use crate::host::{FieldService, FormHost, RetryPolicy, ServiceAcquirer};
    pub use crate::model::Model;
}
