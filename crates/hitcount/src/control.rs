//! The synchronization controller.
//!
//! [`HitCountControl`] binds the numeric [`Model`] and its [`NumberField`] to
//! a field of the work item open in the host form:
//!
//! ```text
//! ConfigLoaded ──► ServiceResolving ──► Synced
//!      │                 │   ▲             ▲ │
//!      │                 └───┘ retry       │ │ write re-acquires
//!      │                 │                 │ ▼
//!      │                 └──────────────► LocalOnly
//!      ▼
//!    Error (missing binding)
//! ```
//!
//! Local edits are applied to the model and field synchronously; the host
//! write follows as a command. Writes are serialized: one in flight, and the
//! newest value waiting behind it replaces any older waiting value.
//!
//! [`FormControl`] is what the host registers: it creates the controller on
//! load, drops it on unload and routes field-change notifications to it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossterm::style::{Stylize, style};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::{Binding, WidgetOptions};
use crate::error::ControlError;
use crate::error_view::ErrorView;
use crate::field::{FieldEvent, FieldOptions, NumberField};
use crate::host::{
    ChangedFields, FieldService, FormHost, ServiceAcquirer, WriteOutcome, coerce_field_value,
};
use crate::model::Model;
use crate::runtime::{self, Cmd, Message, batch, tick};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not loaded by the host yet.
    Uninitialized,
    /// Binding read; the field is live but no host service yet.
    ConfigLoaded,
    /// Acquiring the form service; `attempt` is 1-based.
    ServiceResolving {
        /// Current attempt.
        attempt: u32,
    },
    /// Connected: edits are written to the host.
    Synced,
    /// The host service could not be obtained; edits stay local.
    LocalOnly,
    /// Configuration failed; only the error surface is shown.
    Error,
    /// The host unloaded the control.
    Unloaded,
}

// -----------------------------------------------------------------------------
// Host notifications
// -----------------------------------------------------------------------------

/// The host opened a work item and the control should start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedMsg;

/// The host is tearing the control down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnloadedMsg;

/// Fields of the open work item changed outside the control.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChangedMsg {
    /// New values keyed by field reference name.
    pub changed_fields: ChangedFields,
}

impl FieldChangedMsg {
    /// Notification for a single field.
    pub fn single(field: impl Into<String>, value: Value) -> Self {
        let mut changed_fields = ChangedFields::new();
        changed_fields.insert(field.into(), value);
        Self { changed_fields }
    }
}

// -----------------------------------------------------------------------------
// Internal messages
// -----------------------------------------------------------------------------

/// Starts acquisition attempt `attempt`.
#[derive(Debug, Clone, Copy)]
struct ResolveMsg {
    control: u64,
    attempt: u32,
}

/// Result of one acquisition attempt.
struct ResolvedMsg {
    control: u64,
    attempt: u32,
    outcome: Result<(Arc<dyn FieldService>, Value), ControlError>,
}

/// Result of one host write.
struct WrittenMsg {
    control: u64,
    value: i64,
    outcome: WriteOutcome,
}

// -----------------------------------------------------------------------------
// Controller
// -----------------------------------------------------------------------------

/// Model, field and host handle of a control with a valid binding.
struct Editor {
    binding: Binding,
    model: Model,
    field: NumberField,
    service: Option<Arc<dyn FieldService>>,
    /// A write command is running.
    in_flight: bool,
    /// Newest value waiting for the in-flight write to finish.
    queued: Option<i64>,
    /// Newest local value edited before the first resolution finished.
    deferred: Option<i64>,
}

enum Surface {
    Failed(ErrorView),
    Active(Box<Editor>),
}

/// Hit count control bound to one host field.
pub struct HitCountControl {
    id: u64,
    state: SyncState,
    options: WidgetOptions,
    acquirer: ServiceAcquirer,
    surface: Surface,
    last_error: Option<ControlError>,
}

impl HitCountControl {
    /// Creates a control for `host`, acquiring services by the identifiers in
    /// `options.services`.
    pub fn new(host: Arc<dyn FormHost>, options: WidgetOptions) -> Self {
        let acquirer = ServiceAcquirer::from_service_ids(host, options.services.iter().cloned());
        Self::with_acquirer(acquirer, options)
    }

    /// Creates a control with a custom acquisition strategy list.
    pub fn with_acquirer(acquirer: ServiceAcquirer, options: WidgetOptions) -> Self {
        let id = next_id();
        let config = acquirer.host().configuration();

        let (state, surface, last_error) = match config.binding() {
            Ok(binding) => {
                info!(control = id, field = %binding, "hit count control loaded");
                let model = Model::new(0);
                let field = NumberField::new(&model, FieldOptions::from(&options));
                let editor = Editor {
                    binding,
                    model,
                    field,
                    service: None,
                    in_flight: false,
                    queued: None,
                    deferred: None,
                };
                (SyncState::ConfigLoaded, Surface::Active(Box::new(editor)), None)
            }
            Err(err) => {
                error!(control = id, error = %err, "hit count control cannot start");
                let view = ErrorView::new(&err).with_help_url(options.help_url.clone());
                (SyncState::Error, Surface::Failed(view), Some(err))
            }
        };

        Self {
            id,
            state,
            options,
            acquirer,
            surface,
            last_error,
        }
    }

    /// The control's unique ID.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SyncState {
        self.state
    }

    /// The bound field, unless configuration failed.
    #[must_use]
    pub fn binding(&self) -> Option<&Binding> {
        self.editor().map(|e| &e.binding)
    }

    /// The model value, unless configuration failed.
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        self.editor().map(|e| e.model.value())
    }

    /// The number field, unless configuration failed.
    #[must_use]
    pub fn field(&self) -> Option<&NumberField> {
        self.editor().map(|e| &e.field)
    }

    /// The error surface, when configuration failed.
    #[must_use]
    pub const fn error_view(&self) -> Option<&ErrorView> {
        match &self.surface {
            Surface::Failed(view) => Some(view),
            Surface::Active(_) => None,
        }
    }

    /// The most recent error, fatal or not.
    #[must_use]
    pub const fn last_error(&self) -> Option<&ControlError> {
        self.last_error.as_ref()
    }

    /// Whether a host write is running.
    #[must_use]
    pub fn write_in_flight(&self) -> bool {
        self.editor().is_some_and(|e| e.in_flight)
    }

    fn editor(&self) -> Option<&Editor> {
        match &self.surface {
            Surface::Active(editor) => Some(editor),
            Surface::Failed(_) => None,
        }
    }

    fn is_live(&self) -> bool {
        !matches!(self.state, SyncState::Error | SyncState::Unloaded)
    }

    /// Applies a value that changed on the host side.
    ///
    /// Overwrites the model and field and drops any write still waiting to be
    /// sent. Nothing is written back.
    pub fn update_external(&mut self, value: &Value) {
        if !self.is_live() {
            return;
        }
        let id = self.id;
        let Surface::Active(editor) = &mut self.surface else {
            return;
        };
        let n = coerce_field_value(value);
        editor.model.set(n);
        editor.field.set_value(n);
        editor.queued = None;
        editor.deferred = None;
        debug!(control = id, field = %editor.binding, value = n, "external field update applied");
    }

    /// Redraws the field from the model after the host mounts the control
    /// again. The debounce timer is cancelled and uncommitted text dropped;
    /// the host handle and any write in flight are kept.
    pub fn remount(&mut self) {
        if !self.is_live() {
            return;
        }
        let id = self.id;
        if let Surface::Active(editor) = &mut self.surface {
            editor.field.reset(&editor.model);
            debug!(control = id, field = %editor.binding, "hit count control re-mounted");
        }
    }

    /// Stops the control: cancels the debounce timer and drops the host handle.
    pub fn unload(&mut self) {
        if let Surface::Active(editor) = &mut self.surface {
            editor.field.cancel_pending();
            editor.service = None;
            editor.queued = None;
            editor.deferred = None;
        }
        self.state = SyncState::Unloaded;
        info!(control = self.id, "hit count control unloaded");
    }

    fn resolve_cmd(&self, attempt: u32) -> Option<Cmd> {
        let editor = self.editor()?;
        let acquirer = self.acquirer.clone();
        let field = editor.binding.as_str().to_string();
        let control = self.id;
        Some(Cmd::new(move || {
            Message::new(ResolvedMsg {
                control,
                attempt,
                outcome: acquirer.resolve(&field),
            })
        }))
    }

    fn write_cmd(&self, value: i64) -> Option<Cmd> {
        let editor = self.editor()?;
        let acquirer = self.acquirer.clone();
        let service = editor.service.clone();
        let field = editor.binding.as_str().to_string();
        let control = self.id;
        Some(Cmd::new(move || {
            Message::new(WrittenMsg {
                control,
                value,
                outcome: acquirer.write(service, &field, value),
            })
        }))
    }

    /// Routes `value` to the host: deferred while resolving, queued behind an
    /// in-flight write, or written now.
    fn push(&mut self, value: i64) -> Option<Cmd> {
        let state = self.state;
        let Surface::Active(editor) = &mut self.surface else {
            return None;
        };
        match state {
            SyncState::ConfigLoaded | SyncState::ServiceResolving { .. } => {
                editor.deferred = Some(value);
                None
            }
            SyncState::Synced | SyncState::LocalOnly => {
                if editor.in_flight {
                    editor.queued = Some(value);
                    None
                } else {
                    editor.in_flight = true;
                    self.write_cmd(value)
                }
            }
            SyncState::Uninitialized | SyncState::Error | SyncState::Unloaded => None,
        }
    }

    fn apply_event(&mut self, event: FieldEvent) -> Option<Cmd> {
        let Surface::Active(editor) = &mut self.surface else {
            return None;
        };
        let before = editor.model.value();
        match event {
            FieldEvent::Changed(v) => {
                editor.model.set(v);
            }
            FieldEvent::StepUp => editor.model.increment(),
            FieldEvent::StepDown => editor.model.decrement(),
        }
        let after = editor.model.value();
        editor.field.set_value(after);

        if after == before {
            return None;
        }
        debug!(control = self.id, ?event, value = after, "local edit");
        self.push(after)
    }

    fn handle_resolved(&mut self, msg: ResolvedMsg) -> Option<Cmd> {
        let ResolvedMsg {
            attempt, outcome, ..
        } = msg;

        match outcome {
            Ok((service, value)) => {
                self.state = SyncState::Synced;
                let id = self.id;
                let Surface::Active(editor) = &mut self.surface else {
                    return None;
                };
                editor.service = Some(service);

                if let Some(local) = editor.deferred.take() {
                    info!(control = id, field = %editor.binding, value = local, "form service acquired, keeping local edit");
                    return self.push(local);
                }

                let n = coerce_field_value(&value);
                editor.model.set(n);
                editor.field.set_value(n);
                info!(control = id, field = %editor.binding, value = n, attempt, "loaded current field value");
                None
            }
            Err(err) => {
                warn!(control = self.id, attempt, error = %err, "form service initialization attempt failed");
                let policy = self.options.retry;
                if policy.should_retry(attempt) {
                    let control = self.id;
                    let next = attempt + 1;
                    return Some(tick(policy.delay_after(attempt), move |_| {
                        Message::new(ResolveMsg {
                            control,
                            attempt: next,
                        })
                    }));
                }

                let failure = match err {
                    ControlError::ServiceAcquisition { last, .. } => {
                        ControlError::ServiceAcquisition {
                            attempts: policy.attempts(),
                            last,
                        }
                    }
                    other => other,
                };
                warn!(control = self.id, error = %failure, "working in local-only mode");
                self.last_error = Some(failure);
                self.state = SyncState::LocalOnly;

                let deferred = match &mut self.surface {
                    Surface::Active(editor) => editor.deferred.take(),
                    Surface::Failed(_) => None,
                };
                deferred.and_then(|v| self.push(v))
            }
        }
    }

    fn handle_written(&mut self, msg: WrittenMsg) -> Option<Cmd> {
        let WrittenMsg { value, outcome, .. } = msg;
        let id = self.id;
        let Surface::Active(editor) = &mut self.surface else {
            return None;
        };
        editor.in_flight = false;

        if let Some(service) = outcome.acquired {
            editor.service = Some(service);
            if self.state == SyncState::LocalOnly {
                info!(control = id, "form service re-acquired");
                self.state = SyncState::Synced;
            }
        }

        match outcome.result {
            Ok(()) => {
                debug!(control = id, field = %editor.binding, value, "field updated");
            }
            Err(err) => {
                if matches!(err, ControlError::ServiceAcquisition { .. }) {
                    editor.service = None;
                    self.state = SyncState::LocalOnly;
                }
                warn!(control = id, value, error = %err, "failed to update field, keeping local change");
                self.last_error = Some(err);
            }
        }

        let next = editor.queued.take()?;
        editor.in_flight = true;
        self.write_cmd(next)
    }

    fn status_line(&self) -> String {
        let text = match self.state {
            SyncState::Synced => "synced".to_string(),
            SyncState::LocalOnly => "local only".to_string(),
            SyncState::ServiceResolving { attempt } => format!("connecting (attempt {attempt})"),
            SyncState::ConfigLoaded => "connecting".to_string(),
            SyncState::Uninitialized | SyncState::Error | SyncState::Unloaded => String::new(),
        };
        style(text).dim().to_string()
    }
}

impl runtime::Model for HitCountControl {
    fn init(&self) -> Option<Cmd> {
        if self.state != SyncState::ConfigLoaded {
            return None;
        }
        let control = self.id;
        Some(tick(self.options.retry.settle_delay(), move |_| {
            Message::new(ResolveMsg {
                control,
                attempt: 1,
            })
        }))
    }

    fn update(&mut self, msg: Message) -> Option<Cmd> {
        if !self.is_live() {
            return None;
        }

        if let Some(resolve) = msg.downcast_ref::<ResolveMsg>() {
            if resolve.control != self.id {
                return None;
            }
            self.state = SyncState::ServiceResolving {
                attempt: resolve.attempt,
            };
            debug!(control = self.id, attempt = resolve.attempt, "acquiring form service");
            return self.resolve_cmd(resolve.attempt);
        }

        if msg.is::<ResolvedMsg>() {
            let resolved = msg.downcast::<ResolvedMsg>()?;
            if resolved.control != self.id {
                return None;
            }
            return self.handle_resolved(resolved);
        }

        if msg.is::<WrittenMsg>() {
            let written = msg.downcast::<WrittenMsg>()?;
            if written.control != self.id {
                return None;
            }
            return self.handle_written(written);
        }

        if let Some(changed) = msg.downcast_ref::<FieldChangedMsg>() {
            let value = self
                .binding()
                .and_then(|b| changed.changed_fields.get(b.as_str()))
                .cloned();
            if let Some(value) = value {
                self.update_external(&value);
            }
            return None;
        }

        let Surface::Active(editor) = &mut self.surface else {
            return None;
        };
        let (event, cmd) = editor.field.update(&msg);
        let write = event.and_then(|event| self.apply_event(event));
        batch(vec![cmd, write])
    }

    fn view(&self) -> String {
        match &self.surface {
            Surface::Failed(view) => view.view(),
            Surface::Active(_) if self.state == SyncState::Unloaded => String::new(),
            Surface::Active(editor) => {
                if self.options.show_sync_status {
                    format!("{}\n{}", editor.field.view(), self.status_line())
                } else {
                    editor.field.view()
                }
            }
        }
    }
}

impl fmt::Debug for HitCountControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HitCountControl")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("binding", &self.binding())
            .field("value", &self.value())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Form control adapter
// -----------------------------------------------------------------------------

/// The object a host registers for its work item form.
///
/// Owns at most one [`HitCountControl`]: created on [`LoadedMsg`], dropped on
/// [`UnloadedMsg`]. A repeated [`LoadedMsg`] for the same field re-mounts the
/// live control instead of replacing it. Everything else is forwarded to it.
pub struct FormControl {
    host: Arc<dyn FormHost>,
    options: WidgetOptions,
    control: Option<HitCountControl>,
}

impl FormControl {
    /// Registers a form control for `host`.
    pub fn new(host: Arc<dyn FormHost>, options: WidgetOptions) -> Self {
        Self {
            host,
            options,
            control: None,
        }
    }

    /// The live control, if the host has loaded one.
    #[must_use]
    pub const fn control(&self) -> Option<&HitCountControl> {
        self.control.as_ref()
    }

    /// State of the live control, or `Uninitialized`.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.control
            .as_ref()
            .map_or(SyncState::Uninitialized, HitCountControl::state)
    }
}

impl runtime::Model for FormControl {
    fn init(&self) -> Option<Cmd> {
        None
    }

    fn update(&mut self, msg: Message) -> Option<Cmd> {
        if msg.is::<LoadedMsg>() {
            let binding = self.host.configuration().binding().ok();
            if let Some(control) = self.control.as_mut() {
                if control.is_live() && binding.is_some() && control.binding() == binding.as_ref() {
                    control.remount();
                    return None;
                }
            }
            if let Some(mut old) = self.control.take() {
                old.unload();
            }
            let control = HitCountControl::new(Arc::clone(&self.host), self.options.clone());
            let cmd = runtime::Model::init(&control);
            self.control = Some(control);
            return cmd;
        }

        if msg.is::<UnloadedMsg>() {
            if let Some(mut control) = self.control.take() {
                control.unload();
            }
            return None;
        }

        self.control.as_mut()?.update(msg)
    }

    fn view(&self) -> String {
        self.control
            .as_ref()
            .map(runtime::Model::view)
            .unwrap_or_default()
    }
}

impl fmt::Debug for FormControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormControl")
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{KeyMsg, KeyType, Model as _, ProgramSimulator};
    use crate::testing::FakeHost;
    use serde_json::json;

    fn started(host: &Arc<FakeHost>) -> ProgramSimulator<HitCountControl> {
        let control = HitCountControl::new(host.clone(), WidgetOptions::immediate());
        let mut sim = ProgramSimulator::new(control);
        sim.start();
        sim.run_until_empty();
        sim
    }

    fn up() -> Message {
        Message::new(KeyMsg::from_type(KeyType::Up))
    }

    #[test]
    fn missing_binding_renders_error_surface() {
        let host = FakeHost::without_binding().shared();
        let control = HitCountControl::new(host.clone(), WidgetOptions::immediate());

        assert_eq!(control.state(), SyncState::Error);
        assert!(control.value().is_none());
        assert!(control.field().is_none());
        assert!(control.error_view().is_some());
        assert!(control.init().is_none());
        assert!(control.view().contains("FieldName"));
        assert!(host.requested_services().is_empty());
    }

    #[test]
    fn error_state_ignores_input() {
        let host = FakeHost::without_binding().shared();
        let mut control = HitCountControl::new(host, WidgetOptions::immediate());
        assert!(control.update(up()).is_none());
        assert_eq!(control.state(), SyncState::Error);
    }

    #[test]
    fn field_is_live_before_sync() {
        let host = FakeHost::new("Custom.Hits").shared();
        let control = HitCountControl::new(host, WidgetOptions::immediate());
        assert_eq!(control.state(), SyncState::ConfigLoaded);
        assert_eq!(control.value(), Some(0));
        assert!(control.view().contains('0'));
    }

    #[test]
    fn seeds_from_host_value() {
        let host = FakeHost::new("Custom.Hits")
            .with_field("Custom.Hits", json!("12"))
            .shared();
        let sim = started(&host);

        assert_eq!(sim.model().state(), SyncState::Synced);
        assert_eq!(sim.model().value(), Some(12));
        assert_eq!(sim.model().field().unwrap().value(), 12);
    }

    #[test]
    fn retries_then_syncs() {
        let host = FakeHost::new("Custom.Hits")
            .with_field("Custom.Hits", json!(4))
            .unavailable_for(2)
            .shared();
        let sim = started(&host);

        assert_eq!(sim.model().state(), SyncState::Synced);
        assert_eq!(sim.model().value(), Some(4));
        assert_eq!(host.requested_services().len(), 3);
    }

    #[test]
    fn falls_back_to_local_only() {
        let host = FakeHost::new("Custom.Hits").shared();
        host.set_offline(true);
        let mut sim = started(&host);

        assert_eq!(sim.model().state(), SyncState::LocalOnly);
        assert!(matches!(
            sim.model().last_error(),
            Some(ControlError::ServiceAcquisition { attempts: 3, .. })
        ));

        sim.send(up());
        sim.send(up());
        sim.run_until_empty();
        assert_eq!(sim.model().value(), Some(2));
        assert!(sim.last_view().unwrap().contains('2'));
        assert!(host.writes().is_empty());
    }

    #[test]
    fn read_failure_counts_as_failed_attempt() {
        let host = FakeHost::new("Custom.Hits")
            .with_field("Custom.Hits", json!(9))
            .shared();
        host.fail_reads(true);
        let sim = started(&host);

        assert_eq!(sim.model().state(), SyncState::LocalOnly);
        assert_eq!(sim.model().value(), Some(0));
        assert_eq!(
            sim.model().last_error(),
            Some(&ControlError::HostRead(crate::error::HostError::Timeout))
        );
    }

    #[test]
    fn local_only_write_reacquires_service() {
        let host = FakeHost::new("Custom.Hits").shared();
        host.set_offline(true);
        let mut sim = started(&host);
        assert_eq!(sim.model().state(), SyncState::LocalOnly);

        host.set_offline(false);
        sim.send(up());
        sim.run_until_empty();

        assert_eq!(sim.model().state(), SyncState::Synced);
        assert_eq!(host.writes(), vec![1]);
    }

    #[test]
    fn step_updates_locally_before_write() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);

        sim.send(up());
        let write = sim.step();
        // The view already shows the new value while the write is pending.
        assert_eq!(sim.model().value(), Some(1));
        assert!(sim.last_view().unwrap().contains('1'));
        assert!(sim.model().write_in_flight());
        assert!(host.writes().is_empty());

        sim.dispatch(write);
        sim.run_until_empty();
        assert_eq!(host.writes(), vec![1]);
        assert!(!sim.model().write_in_flight());
    }

    #[test]
    fn overlapping_writes_are_serialized_with_supersession() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);

        sim.send(up());
        let first = sim.step();
        sim.send(up());
        assert!(sim.step().is_none());
        sim.send(up());
        assert!(sim.step().is_none());
        assert_eq!(sim.model().value(), Some(3));

        sim.dispatch(first);
        sim.run_until_empty();
        // 2 was superseded by 3 while 1 was in flight.
        assert_eq!(host.writes(), vec![1, 3]);
        assert_eq!(host.field_value(), json!(3));
    }

    #[test]
    fn write_failure_keeps_local_value() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);
        host.fail_writes(true);

        sim.send(up());
        sim.run_until_empty();

        assert_eq!(sim.model().value(), Some(1));
        assert_eq!(sim.model().state(), SyncState::Synced);
        assert!(matches!(
            sim.model().last_error(),
            Some(ControlError::HostWrite { .. })
        ));
    }

    #[test]
    fn stale_handle_is_reacquired_on_write() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);
        host.invalidate_handles();

        sim.send(up());
        sim.run_until_empty();

        assert_eq!(host.writes(), vec![1]);
        assert_eq!(sim.model().state(), SyncState::Synced);
    }

    #[test]
    fn stale_handle_with_failed_reacquire_falls_back_to_local_only() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);
        host.invalidate_handles();
        host.set_offline(true);

        sim.send(up());
        sim.run_until_empty();

        assert_eq!(sim.model().state(), SyncState::LocalOnly);
        assert_eq!(sim.model().value(), Some(1));
        assert!(matches!(
            sim.model().last_error(),
            Some(ControlError::ServiceAcquisition { .. })
        ));
        assert!(host.writes().is_empty());
    }

    #[test]
    fn external_update_drops_queued_write() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);

        sim.send(up());
        let first = sim.step();
        sim.send(up());
        assert!(sim.step().is_none());
        sim.send(up());
        assert!(sim.step().is_none());

        sim.send(Message::new(FieldChangedMsg::single("Custom.Hits", json!(40))));
        assert!(sim.step().is_none());
        assert_eq!(sim.model().value(), Some(40));

        sim.dispatch(first);
        sim.run_until_empty();
        assert_eq!(host.writes(), vec![1]);
        assert_eq!(sim.model().value(), Some(40));
        assert!(!sim.model().write_in_flight());
    }

    #[test]
    fn external_update_is_not_echoed() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);

        sim.send(Message::new(FieldChangedMsg::single("Custom.Hits", json!(40))));
        sim.send(Message::new(FieldChangedMsg::single("System.Title", json!("x"))));
        sim.run_until_empty();

        assert_eq!(sim.model().value(), Some(40));
        assert!(sim.last_view().unwrap().contains("40"));
        assert!(host.writes().is_empty());
    }

    #[test]
    fn decrement_at_zero_writes_nothing() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);

        sim.send(Message::new(KeyMsg::from_type(KeyType::Down)));
        sim.run_until_empty();

        assert_eq!(sim.model().value(), Some(0));
        assert!(host.writes().is_empty());
    }

    #[test]
    fn edits_during_resolution_survive() {
        let host = FakeHost::new("Custom.Hits")
            .with_field("Custom.Hits", json!(50))
            .shared();
        let control = HitCountControl::new(host.clone(), WidgetOptions::immediate());
        let mut sim = ProgramSimulator::new(control);
        let init = sim.init();

        sim.send(up());
        sim.run_until_empty();
        assert_eq!(sim.model().value(), Some(1));
        assert!(host.writes().is_empty());

        sim.dispatch(init);
        sim.run_until_empty();
        assert_eq!(sim.model().state(), SyncState::Synced);
        assert_eq!(sim.model().value(), Some(1));
        assert_eq!(host.writes(), vec![1]);
    }

    #[test]
    fn typed_value_is_debounced_and_written() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);

        sim.send(Message::new(KeyMsg::from_type(KeyType::Backspace)));
        sim.send(Message::new(KeyMsg::from_runes(vec!['2', '5'])));
        sim.run_until_empty();

        assert_eq!(sim.model().value(), Some(25));
        assert_eq!(host.writes(), vec![25]);
    }

    #[test]
    fn unload_stops_processing() {
        let host = FakeHost::new("Custom.Hits").shared();
        let mut sim = started(&host);
        sim.model_mut().unload();

        sim.send(up());
        sim.run_until_empty();
        assert_eq!(sim.model().state(), SyncState::Unloaded);
        assert_eq!(sim.model().value(), Some(0));
        assert_eq!(sim.last_view(), Some(""));
    }

    #[test]
    fn status_line_is_optional() {
        let host = FakeHost::new("Custom.Hits").shared();
        let options = WidgetOptions {
            show_sync_status: true,
            ..WidgetOptions::immediate()
        };
        let mut sim = ProgramSimulator::new(HitCountControl::new(host, options));
        sim.start();
        sim.run_until_empty();
        assert!(sim.last_view().unwrap().contains("synced"));
    }

    #[test]
    fn form_control_lifecycle() {
        let host = FakeHost::new("Custom.Hits")
            .with_field("Custom.Hits", json!(3))
            .shared();
        let mut sim = ProgramSimulator::new(FormControl::new(host, WidgetOptions::immediate()));
        sim.start();
        assert_eq!(sim.model().state(), SyncState::Uninitialized);
        assert_eq!(sim.last_view(), Some(""));

        sim.send(Message::new(LoadedMsg));
        sim.run_until_empty();
        assert_eq!(sim.model().state(), SyncState::Synced);
        assert_eq!(sim.model().control().unwrap().value(), Some(3));

        sim.send(Message::new(FieldChangedMsg::single("Custom.Hits", json!(8))));
        sim.run_until_empty();
        assert_eq!(sim.model().control().unwrap().value(), Some(8));

        sim.send(Message::new(UnloadedMsg));
        sim.run_until_empty();
        assert!(sim.model().control().is_none());
        assert_eq!(sim.model().state(), SyncState::Uninitialized);
    }
}
