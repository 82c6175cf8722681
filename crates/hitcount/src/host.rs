//! The host side of the control: form services and how to acquire them.
//!
//! The host hands out an opaque [`FieldService`] through one of several
//! service identifiers, and which one works depends on the host context.
//! Acquisition is therefore data: an ordered list of [`AcquisitionStrategy`]s
//! tried one after another, repeated under a [`RetryPolicy`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ControlConfig;
use crate::error::{ControlError, HostError};

/// Service identifier of the work item form service.
pub const WORK_ITEM_FORM_SERVICE: &str = "ms.vss-work-web.work-item-form-service";

/// Reads and writes fields of the work item open in the host form.
///
/// Implementations are called from command threads, never from `update`.
pub trait FieldService: Send + Sync {
    /// Returns the current value of `field`.
    fn get_field_value(&self, field: &str) -> Result<Value, HostError>;

    /// Sets `field` to `value` on the open work item.
    fn set_field_value(&self, field: &str, value: &Value) -> Result<(), HostError>;
}

/// The surrounding form application.
pub trait FormHost: Send + Sync {
    /// Configuration the control was registered with.
    fn configuration(&self) -> ControlConfig;

    /// Looks up a service by identifier.
    fn service(&self, id: &str) -> Result<Arc<dyn FieldService>, HostError>;
}

/// One way of obtaining a [`FieldService`] from the host.
pub trait AcquisitionStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Attempts to obtain a service handle.
    fn acquire(&self, host: &dyn FormHost) -> Result<Arc<dyn FieldService>, HostError>;
}

/// Asks the host for a service by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceById(pub String);

impl AcquisitionStrategy for ServiceById {
    fn name(&self) -> &str {
        &self.0
    }

    fn acquire(&self, host: &dyn FormHost) -> Result<Arc<dyn FieldService>, HostError> {
        host.service(&self.0)
    }
}

/// How the delay between acquisition attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "step_ms")]
pub enum Backoff {
    /// The same delay after every failed attempt.
    Fixed(u64),
    /// `attempt × step` after the n-th failed attempt.
    Incremental(u64),
}

/// Bounds and pacing for service acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts before falling back to local-only mode. Zero behaves as one.
    pub max_attempts: u32,
    /// Delay before the first attempt, letting the host form finish loading.
    pub settle_delay_ms: u64,
    /// Delay between attempts.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            settle_delay_ms: 1000,
            backoff: Backoff::Incremental(2000),
        }
    }
}

impl RetryPolicy {
    /// A policy with no delays, for tests and scripted hosts.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            settle_delay_ms: 0,
            backoff: Backoff::Fixed(0),
        }
    }

    /// Effective number of attempts.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the first attempt.
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let ms = match self.backoff {
            Backoff::Fixed(step) => step,
            Backoff::Incremental(step) => step.saturating_mul(u64::from(attempt)),
        };
        Duration::from_millis(ms)
    }

    /// Whether another attempt follows attempt number `attempt`.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }
}

/// Walks the strategy list against a host.
#[derive(Clone)]
pub struct ServiceAcquirer {
    host: Arc<dyn FormHost>,
    strategies: Arc<Vec<Box<dyn AcquisitionStrategy>>>,
}

impl ServiceAcquirer {
    /// Creates an acquirer trying `strategies` in order.
    pub fn new(host: Arc<dyn FormHost>, strategies: Vec<Box<dyn AcquisitionStrategy>>) -> Self {
        Self {
            host,
            strategies: Arc::new(strategies),
        }
    }

    /// Creates an acquirer asking for each service identifier in order.
    pub fn from_service_ids<I, S>(host: Arc<dyn FormHost>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let strategies = ids
            .into_iter()
            .map(|id| Box::new(ServiceById(id.into())) as Box<dyn AcquisitionStrategy>)
            .collect();
        Self::new(host, strategies)
    }

    /// The host this acquirer talks to.
    pub fn host(&self) -> &Arc<dyn FormHost> {
        &self.host
    }

    /// One pass over the strategies; the first handle wins.
    ///
    /// # Errors
    ///
    /// Returns the last strategy's failure when none succeeds, or
    /// [`HostError::Unavailable`] when the list is empty.
    pub fn acquire(&self) -> Result<Arc<dyn FieldService>, HostError> {
        let mut last = HostError::unavailable("no acquisition strategies configured");
        for strategy in self.strategies.iter() {
            match strategy.acquire(self.host.as_ref()) {
                Ok(service) => {
                    debug!(strategy = strategy.name(), "form service acquired");
                    return Ok(service);
                }
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "form service acquisition failed");
                    last = err;
                }
            }
        }
        Err(last)
    }

    /// Acquires a handle and reads `field` through it.
    ///
    /// This is one resolution attempt: failing either step fails the attempt.
    ///
    /// # Errors
    ///
    /// [`ControlError::ServiceAcquisition`] when no handle was obtained, or
    /// [`ControlError::HostRead`] when the read failed.
    pub fn resolve(&self, field: &str) -> Result<(Arc<dyn FieldService>, Value), ControlError> {
        let service = self
            .acquire()
            .map_err(|last| ControlError::ServiceAcquisition { attempts: 1, last })?;
        let value = service
            .get_field_value(field)
            .map_err(ControlError::HostRead)?;
        Ok((service, value))
    }

    /// Writes `value` to `field`, acquiring a handle first when there is none
    /// and re-acquiring once when the host reports the handle as stale.
    ///
    /// Returns the handle acquired along the way, if any, so the caller can
    /// keep it.
    pub fn write(
        &self,
        service: Option<Arc<dyn FieldService>>,
        field: &str,
        value: i64,
    ) -> WriteOutcome {
        let payload = Value::from(value);
        let mut acquired = None;

        let service = match service {
            Some(service) => service,
            None => match self.acquire() {
                Ok(service) => {
                    acquired = Some(Arc::clone(&service));
                    service
                }
                Err(last) => {
                    return WriteOutcome {
                        result: Err(ControlError::ServiceAcquisition { attempts: 1, last }),
                        acquired: None,
                    };
                }
            },
        };

        let mut result = service.set_field_value(field, &payload);
        if matches!(&result, Err(err) if err.is_invalid_handle()) {
            debug!(field, "form service handle went stale, re-acquiring");
            match self.acquire() {
                Ok(fresh) => {
                    result = fresh.set_field_value(field, &payload);
                    acquired = Some(fresh);
                }
                Err(last) => {
                    return WriteOutcome {
                        result: Err(ControlError::ServiceAcquisition { attempts: 1, last }),
                        acquired: None,
                    };
                }
            }
        }

        WriteOutcome {
            result: result.map_err(|source| ControlError::HostWrite {
                field: field.to_string(),
                source,
            }),
            acquired,
        }
    }
}

impl fmt::Debug for ServiceAcquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ServiceAcquirer")
            .field("strategies", &names)
            .finish_non_exhaustive()
    }
}

/// Result of [`ServiceAcquirer::write`].
pub struct WriteOutcome {
    /// Whether the host accepted the value.
    pub result: Result<(), ControlError>,
    /// A handle obtained while writing, to replace the caller's.
    pub acquired: Option<Arc<dyn FieldService>>,
}

impl fmt::Debug for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteOutcome")
            .field("result", &self.result)
            .field("acquired", &self.acquired.is_some())
            .finish()
    }
}

/// Converts a host field value to the model's integer.
///
/// Anything that is not a number, or a string holding one, becomes 0.
/// Fractions are truncated toward zero.
///
/// ```rust
/// use hitcount::host::coerce_field_value;
/// use serde_json::json;
///
/// assert_eq!(coerce_field_value(&json!(12)), 12);
/// assert_eq!(coerce_field_value(&json!(" 7 ")), 7);
/// assert_eq!(coerce_field_value(&json!(2.9)), 2);
/// assert_eq!(coerce_field_value(&json!("n/a")), 0);
/// assert_eq!(coerce_field_value(&json!(null)), 0);
/// ```
#[must_use]
pub fn coerce_field_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
                .unwrap_or(0)
        }
        Value::Bool(b) => i64::from(*b),
        Value::Null | Value::Array(_) | Value::Object(_) => 0,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let t = f.trunc();
    (t.is_finite() && t >= -LIMIT && t < LIMIT).then_some(t as i64)
}

/// Field values keyed by reference name, as reported in change notifications.
pub type ChangedFields = BTreeMap<String, Value>;
