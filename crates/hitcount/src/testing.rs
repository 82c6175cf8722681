//! A scriptable in-memory host for tests and demos.
//!
//! [`FakeHost`] records every service request and field write, and can be
//! told to refuse services, fail reads or writes, or invalidate the handles
//! it has handed out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::{ControlConfig, FIELD_NAME_INPUT};
use crate::error::HostError;
use crate::host::{FieldService, FormHost, WORK_ITEM_FORM_SERVICE};

#[derive(Debug)]
struct FakeState {
    fields: Mutex<BTreeMap<String, Value>>,
    writes: Mutex<Vec<i64>>,
    requested: Mutex<Vec<String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    generation: AtomicU64,
}

/// In-memory [`FormHost`] with a single work item.
#[derive(Debug)]
pub struct FakeHost {
    inputs: BTreeMap<String, String>,
    service_ids: Vec<String>,
    unavailable_for: AtomicU32,
    offline: AtomicBool,
    state: Arc<FakeState>,
}

impl FakeHost {
    /// A host configured to bind `field`, answering the work item form service.
    pub fn new(field: &str) -> Self {
        let mut inputs = BTreeMap::new();
        inputs.insert(FIELD_NAME_INPUT.to_string(), field.to_string());
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), Value::Null);
        Self {
            inputs,
            service_ids: vec![WORK_ITEM_FORM_SERVICE.to_string()],
            unavailable_for: AtomicU32::new(0),
            offline: AtomicBool::new(false),
            state: Arc::new(FakeState {
                fields: Mutex::new(fields),
                writes: Mutex::new(Vec::new()),
                requested: Mutex::new(Vec::new()),
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// A host whose configuration carries no field binding.
    pub fn without_binding() -> Self {
        let mut host = Self::new("");
        host.inputs.clear();
        host
    }

    /// Replaces the configuration inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: BTreeMap<String, String>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Service identifiers the host answers; anything else is unavailable.
    #[must_use]
    pub fn with_service_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Seeds the value of a field.
    #[must_use]
    pub fn with_field(self, field: &str, value: Value) -> Self {
        self.state.fields.lock().insert(field.to_string(), value);
        self
    }

    /// Refuses the first `n` service requests.
    #[must_use]
    pub fn unavailable_for(self, n: u32) -> Self {
        self.unavailable_for.store(n, Ordering::SeqCst);
        self
    }

    /// Wraps the host for sharing with a control.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Refuses every service request while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes field reads fail while set.
    pub fn fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes field writes fail while set.
    pub fn fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Invalidates every handle handed out so far.
    pub fn invalidate_handles(&self) {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Values written through any handle, in order.
    pub fn writes(&self) -> Vec<i64> {
        self.state.writes.lock().clone()
    }

    /// Service identifiers requested so far, in order.
    pub fn requested_services(&self) -> Vec<String> {
        self.state.requested.lock().clone()
    }

    /// Current value of the bound field.
    pub fn field_value(&self) -> Value {
        let field = self.inputs.get(FIELD_NAME_INPUT).cloned().unwrap_or_default();
        self.value_of(&field)
    }

    /// Current value of any field.
    pub fn value_of(&self, field: &str) -> Value {
        self.state.fields.lock().get(field).cloned().unwrap_or(Value::Null)
    }
}

impl FormHost for FakeHost {
    fn configuration(&self) -> ControlConfig {
        ControlConfig::new(self.inputs.clone())
    }

    fn service(&self, id: &str) -> Result<Arc<dyn FieldService>, HostError> {
        self.state.requested.lock().push(id.to_string());

        if self.offline.load(Ordering::SeqCst) {
            return Err(HostError::unavailable(id));
        }
        let refused = self
            .unavailable_for
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused || !self.service_ids.iter().any(|s| s == id) {
            return Err(HostError::unavailable(id));
        }

        Ok(Arc::new(FakeService {
            state: Arc::clone(&self.state),
            generation: self.state.generation.load(Ordering::SeqCst),
        }))
    }
}

struct FakeService {
    state: Arc<FakeState>,
    generation: u64,
}

impl FakeService {
    fn check_handle(&self) -> Result<(), HostError> {
        if self.generation == self.state.generation.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HostError::InvalidHandle)
        }
    }
}

impl FieldService for FakeService {
    fn get_field_value(&self, field: &str) -> Result<Value, HostError> {
        self.check_handle()?;
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(HostError::Timeout);
        }
        Ok(self.state.fields.lock().get(field).cloned().unwrap_or(Value::Null))
    }

    fn set_field_value(&self, field: &str, value: &Value) -> Result<(), HostError> {
        self.check_handle()?;
        if self.state.fail_writes.load(Ordering::SeqCst) {
            return Err(HostError::rejected("field is read-only"));
        }
        self.state.fields.lock().insert(field.to_string(), value.clone());
        if let Some(n) = value.as_i64() {
            self.state.writes.lock().push(n);
        }
        Ok(())
    }
}
