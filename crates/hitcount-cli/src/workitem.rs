//! A work item stored as JSON, served to the control as its host form.
//!
//! The file holds `{"id": 7, "fields": {"Custom.HitCount": 3}}`. Writes from
//! the control go straight back to the file. [`watch`] polls the file and
//! reports fields that other programs changed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hitcount::host::{ChangedFields, FieldService, FormHost};
use hitcount::runtime::Message;
use hitcount::{ControlConfig, FieldChangedMsg, HostError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{CliError, Result};

/// Contents of a work item file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Work item ID.
    #[serde(default)]
    pub id: u64,
    /// Field values keyed by reference name.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl WorkItem {
    /// Reads and parses a work item file.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Io`] or [`CliError::WorkItem`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| CliError::io(path, source))?;
        serde_json::from_str(&text).map_err(|source| CliError::WorkItem {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the work item as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Io`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut text = serde_json::to_string_pretty(self).map_err(|source| CliError::WorkItem {
            path: path.to_path_buf(),
            source,
        })?;
        text.push('\n');
        fs::write(path, text).map_err(|source| CliError::io(path, source))
    }

    /// Value of `field`, `Null` when absent.
    #[must_use]
    pub fn value(&self, field: &str) -> Value {
        self.fields.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Fields whose value differs in `newer`, including ones it removed.
    #[must_use]
    pub fn changes(&self, newer: &Self) -> ChangedFields {
        let mut changed: ChangedFields = newer
            .fields
            .iter()
            .filter(|(name, value)| self.fields.get(*name) != Some(*value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for name in self.fields.keys() {
            if !newer.fields.contains_key(name) {
                changed.insert(name.clone(), Value::Null);
            }
        }
        changed
    }
}

/// Shared between the host, its service handles and the watcher. The lock
/// is held across each file read or write so the watcher never mistakes
/// the control's own write for an external change.
#[derive(Debug)]
struct Shared {
    path: PathBuf,
    item: Mutex<WorkItem>,
}

/// [`FormHost`] over a work item file.
#[derive(Debug)]
pub struct FileHost {
    config: ControlConfig,
    shared: Arc<Shared>,
    offline: AtomicBool,
    unavailable_for: AtomicU32,
}

impl FileHost {
    /// Opens the work item at `path`, binding `field`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>, field: &str) -> Result<Self> {
        let path = path.into();
        let item = WorkItem::load(&path)?;
        info!(path = %path.display(), id = item.id, fields = item.fields.len(), "work item opened");

        let config = if field.trim().is_empty() {
            ControlConfig::default()
        } else {
            ControlConfig::for_field(field)
        };

        Ok(Self {
            config,
            shared: Arc::new(Shared {
                path,
                item: Mutex::new(item),
            }),
            offline: AtomicBool::new(false),
            unavailable_for: AtomicU32::new(0),
        })
    }

    /// Refuses every service request.
    #[must_use]
    pub fn offline(self, offline: bool) -> Self {
        self.offline.store(offline, Ordering::SeqCst);
        self
    }

    /// Refuses the first `n` service requests.
    #[must_use]
    pub fn unavailable_for(self, n: u32) -> Self {
        self.unavailable_for.store(n, Ordering::SeqCst);
        self
    }

    /// The work item as last read or written.
    #[must_use]
    pub fn work_item(&self) -> WorkItem {
        self.shared.item.lock().clone()
    }

    /// Re-reads the file and returns the fields that changed since the last
    /// read or write.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn poll(&self) -> Result<ChangedFields> {
        let mut item = self.shared.item.lock();
        let newer = WorkItem::load(&self.shared.path)?;
        let changed = item.changes(&newer);
        if !changed.is_empty() {
            debug!(fields = ?changed.keys().collect::<Vec<_>>(), "work item changed on disk");
            *item = newer;
        }
        Ok(changed)
    }
}

impl FormHost for FileHost {
    fn configuration(&self) -> ControlConfig {
        self.config.clone()
    }

    fn service(&self, id: &str) -> std::result::Result<Arc<dyn FieldService>, HostError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(HostError::unavailable(format!("{id} (offline)")));
        }
        if self
            .unavailable_for
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(HostError::unavailable(id));
        }
        Ok(Arc::new(FileFieldService {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FileFieldService {
    shared: Arc<Shared>,
}

impl FieldService for FileFieldService {
    fn get_field_value(&self, field: &str) -> std::result::Result<Value, HostError> {
        Ok(self.shared.item.lock().value(field))
    }

    fn set_field_value(&self, field: &str, value: &Value) -> std::result::Result<(), HostError> {
        let mut item = self.shared.item.lock();
        let mut on_disk =
            WorkItem::load(&self.shared.path).map_err(|err| HostError::rejected(err.to_string()))?;
        on_disk.fields.insert(field.to_string(), value.clone());
        on_disk
            .save(&self.shared.path)
            .map_err(|err| HostError::rejected(err.to_string()))?;
        // Only this field is marked seen; other edits on disk stay pending
        // for the next poll.
        item.fields.insert(field.to_string(), value.clone());
        Ok(())
    }
}

/// Handle to a running [`watch`] thread.
#[derive(Debug)]
pub struct Watcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Stops polling and waits for the thread to finish.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Polls the work item every `interval` and sends a [`FieldChangedMsg`] for
/// each batch of external changes.
///
/// Unreadable snapshots (a half-written file, say) are logged and skipped.
pub fn watch(host: Arc<FileHost>, interval: Duration, tx: Sender<Message>) -> Watcher {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let handle = thread::spawn(move || {
        while !flag.load(Ordering::SeqCst) {
            thread::sleep(interval);
            match host.poll() {
                Ok(changed) if changed.is_empty() => {}
                Ok(changed_fields) => {
                    if tx.send(Message::new(FieldChangedMsg { changed_fields })).is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "could not re-read work item"),
            }
        }
    });

    Watcher {
        stop,
        handle: Some(handle),
    }
}
