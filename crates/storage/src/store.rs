// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The watcher store: read-your-writes CRUD over materialized state with
//! optional WAL + snapshot durability.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::{MaterializedState, StoreOp};
use crate::wal::{Wal, WalError};
use jw_core::{
    JobId, StoredMetric, WatcherDefinition, WatcherEvent, WatcherId, WatcherInstance,
    WatcherVariables,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const SNAPSHOT_FILE: &str = "snapshot.json";
const WAL_FILE: &str = "wal.jsonl";

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wal: {0}")]
    Wal(#[from] WalError),
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
}

struct Durable {
    wal: Wal,
    snapshot_path: PathBuf,
}

struct StoreInner {
    state: MaterializedState,
    durable: Option<Durable>,
}

impl StoreInner {
    /// Log the op (when durable), then apply it. A failed log write leaves
    /// the in-memory state untouched.
    ///
    /// Ops that do not need their own sync stay buffered until the next one
    /// that does, or until the group flush is due.
    fn commit(&mut self, op: StoreOp) -> Result<(), StoreError> {
        if let Some(durable) = &mut self.durable {
            durable.wal.append(&op)?;
            if op.needs_sync() || durable.wal.needs_flush() {
                durable.wal.flush()?;
            }
        }
        self.state.apply_op(&op);
        Ok(())
    }
}

/// Shared handle to the watcher store.
///
/// All reads and writes go through one lock, so a read always observes
/// every write that completed before it.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
}

impl Store {
    /// A store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state: MaterializedState::default(),
                durable: None,
            })),
        }
    }

    /// Open (or create) a durable store in `dir`, recovering state from the
    /// snapshot and the WAL entries written after it.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let snapshot_path = dir.join(SNAPSHOT_FILE);
        let wal = Wal::open(&dir.join(WAL_FILE))?;

        let (mut state, snapshot_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (MaterializedState::default(), 0),
        };

        let entries = wal.entries_after(snapshot_seq)?;
        let replayed = entries.len();
        for entry in entries {
            state.apply_op(&entry.op);
        }

        tracing::info!(
            dir = %dir.display(),
            snapshot_seq,
            replayed,
            instances = state.instances.len(),
            "store recovered"
        );

        Ok(Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state,
                durable: Some(Durable { wal, snapshot_path }),
            })),
        })
    }

    /// Write buffered WAL entries to disk. No-op for in-memory stores.
    pub fn flush(&self) -> Result<(), StoreError> {
        if let Some(durable) = &mut self.inner.lock().durable {
            durable.wal.flush()?;
        }
        Ok(())
    }

    /// Buffered WAL entries are due for the group flush
    pub fn needs_flush(&self) -> bool {
        self.inner
            .lock()
            .durable
            .as_ref()
            .is_some_and(|durable| durable.wal.needs_flush())
    }

    /// Entries written to the WAL but not yet flushed
    pub fn pending_writes(&self) -> usize {
        self.inner
            .lock()
            .durable
            .as_ref()
            .map_or(0, |durable| durable.wal.pending())
    }

    /// Save a snapshot of the current state and drop the WAL entries it
    /// covers. No-op for in-memory stores.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let StoreInner { state, durable } = &mut *inner;
        let Some(durable) = durable else {
            return Ok(());
        };

        durable.wal.flush()?;
        let seq = durable.wal.write_seq();
        Snapshot::new(seq, state.clone()).save(&durable.snapshot_path)?;
        durable.wal.truncate_before(seq + 1)?;
        tracing::debug!(seq, "checkpoint saved");
        Ok(())
    }

    // -- definitions --------------------------------------------------------

    pub fn get_definition(&self, id: &str) -> Option<WatcherDefinition> {
        self.inner.lock().state.definitions.get(id).cloned()
    }

    pub fn put_definition(&self, definition: WatcherDefinition) -> Result<(), StoreError> {
        self.inner
            .lock()
            .commit(StoreOp::DefinitionSaved { definition })
    }

    /// Remove a definition unless an instance still refers to it.
    /// Returns whether it was removed.
    pub fn delete_definition_if_unused(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.definitions.contains_key(id) || inner.state.definition_in_use(id) {
            return Ok(false);
        }
        inner.commit(StoreOp::DefinitionDeleted { id: id.to_string() })?;
        Ok(true)
    }

    // -- instances ----------------------------------------------------------

    pub fn get_instance(&self, id: &WatcherId) -> Option<WatcherInstance> {
        self.inner.lock().state.instances.get(id.as_str()).cloned()
    }

    pub fn put_instance(&self, instance: WatcherInstance) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::InstanceSaved { instance })
    }

    /// Atomically read, modify and write an instance.
    ///
    /// Returns the instance after `f` ran, or `None` if it does not exist.
    /// Nothing is written when `f` leaves the instance unchanged.
    pub fn update_instance<F>(
        &self,
        id: &WatcherId,
        f: F,
    ) -> Result<Option<WatcherInstance>, StoreError>
    where
        F: FnOnce(&mut WatcherInstance),
    {
        let mut inner = self.inner.lock();
        let Some(current) = inner.state.instances.get(id.as_str()) else {
            return Ok(None);
        };
        let mut updated = current.clone();
        f(&mut updated);
        if updated != *current {
            inner.commit(StoreOp::InstanceSaved {
                instance: updated.clone(),
            })?;
        }
        Ok(Some(updated))
    }

    /// Remove an instance with its variables, events and metrics
    pub fn delete_instance(&self, id: &WatcherId) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        if !inner.state.instances.contains_key(id.as_str()) {
            return Ok(false);
        }
        inner.commit(StoreOp::InstanceDeleted { id: id.to_string() })?;
        Ok(true)
    }

    /// All instances, ordered by creation time then id
    pub fn list_instances(&self) -> Vec<WatcherInstance> {
        let mut instances: Vec<_> = self.inner.lock().state.instances.values().cloned().collect();
        instances.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        instances
    }

    pub fn list_instances_for_job(&self, job_id: &JobId, host: &str) -> Vec<WatcherInstance> {
        self.list_instances()
            .into_iter()
            .filter(|i| i.job_id == *job_id && i.host == host)
            .collect()
    }

    // -- variables ----------------------------------------------------------

    pub fn get_variables(&self, id: &WatcherId) -> Option<WatcherVariables> {
        self.inner.lock().state.variables.get(id.as_str()).cloned()
    }

    pub fn put_variables(&self, variables: WatcherVariables) -> Result<(), StoreError> {
        self.inner
            .lock()
            .commit(StoreOp::VariablesSaved { variables })
    }

    // -- events & metrics ---------------------------------------------------

    pub fn append_event(&self, event: WatcherEvent) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::EventAppended { event })
    }

    /// The `limit` most recent events for an instance, oldest first
    pub fn events(&self, id: &WatcherId, limit: usize) -> Vec<WatcherEvent> {
        let inner = self.inner.lock();
        let Some(events) = inner.state.events.get(id.as_str()) else {
            return Vec::new();
        };
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn put_metric(&self, metric: StoredMetric) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::MetricStored { metric })
    }

    pub fn metrics(&self, id: &WatcherId) -> Vec<StoredMetric> {
        self.inner
            .lock()
            .state
            .metrics
            .get(id.as_str())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
