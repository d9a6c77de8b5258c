//! Shared mutable state for a single workflow execution.
//!
//! One [`WorkflowState`] is created with the root context and shared by
//! reference across every primitive in the workflow. It holds a free-form
//! value map plus the saga compensation log. The runtime does not serialize
//! access beyond the per-operation locks: concurrent parallel branches that
//! coordinate through the value map must bring their own discipline.

use crate::error::Result;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// State key under which the compensation log mirrors its step IDs.
pub const SAGA_LOG_KEY: &str = "_saga_log";

/// Boxed undo action, invoked at most once during rollback.
pub type UndoAction = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send>;

/// A recorded compensation step: how to undo one completed side effect.
pub struct CompensationEntry {
    /// Identifier of the compensated step.
    pub step_id: String,
    /// When the step committed its side effect.
    pub committed_at: DateTime<Utc>,
    undo: UndoAction,
}

impl CompensationEntry {
    /// Create a new entry.
    pub fn new(step_id: impl Into<String>, undo: UndoAction) -> Self {
        Self {
            step_id: step_id.into(),
            committed_at: Utc::now(),
            undo,
        }
    }
}

impl std::fmt::Debug for CompensationEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompensationEntry")
            .field("step_id", &self.step_id)
            .field("committed_at", &self.committed_at)
            .finish()
    }
}

struct StateInner {
    values: RwLock<HashMap<String, Value>>,
    compensations: Mutex<Vec<CompensationEntry>>,
}

/// Shared mutable state for one workflow execution.
///
/// Cloning is cheap and shares the same underlying maps.
#[derive(Clone)]
pub struct WorkflowState {
    inner: Arc<StateInner>,
}

impl WorkflowState {
    /// Create empty workflow state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StateInner {
                values: RwLock::new(HashMap::new()),
                compensations: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get a value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.values.read().get(key).cloned()
    }

    /// Insert a value, returning the previous one if present.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.values.write().insert(key.into(), value.into())
    }

    /// Remove a value by key.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.values.write().remove(key)
    }

    /// Number of entries in the value map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.values.read().len()
    }

    /// Check whether the value map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.values.read().is_empty()
    }

    /// Append a compensation entry to the saga log.
    pub fn push_compensation(&self, entry: CompensationEntry) {
        let mut log = self.inner.compensations.lock();
        log.push(entry);
        let step_ids: Vec<Value> = log
            .iter()
            .map(|e| Value::String(e.step_id.clone()))
            .collect();
        drop(log);
        self.insert(SAGA_LOG_KEY, Value::Array(step_ids));
    }

    /// Current length of the compensation log.
    ///
    /// Compositions take this as a checkpoint on entry and roll back to it
    /// on failure, so nested compositions each unwind only their own steps.
    #[must_use]
    pub fn compensation_len(&self) -> usize {
        self.inner.compensations.lock().len()
    }

    /// Unwind the compensation log down to `mark`, invoking undo actions in
    /// reverse commit order.
    ///
    /// Rollback is best-effort: a failing undo action is logged and the
    /// unwind continues. Returns the IDs of the steps that were undone, in
    /// the order their undo actions ran.
    pub async fn rollback_to(&self, mark: usize) -> Vec<String> {
        let entries: Vec<CompensationEntry> = {
            let mut log = self.inner.compensations.lock();
            if log.len() <= mark {
                return Vec::new();
            }
            log.drain(mark..).collect()
        };

        let mut undone = Vec::with_capacity(entries.len());
        for entry in entries.into_iter().rev() {
            let step_id = entry.step_id;
            match (entry.undo)().await {
                Ok(()) => {
                    tracing::info!(step_id = %step_id, "compensation applied");
                }
                Err(e) => {
                    tracing::warn!(step_id = %step_id, error = %e, "compensation failed");
                }
            }
            undone.push(step_id);
        }

        let log = self.inner.compensations.lock();
        let step_ids: Vec<Value> = log
            .iter()
            .map(|e| Value::String(e.step_id.clone()))
            .collect();
        drop(log);
        self.insert(SAGA_LOG_KEY, Value::Array(step_ids));

        undone
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowState")
            .field("values", &self.len())
            .field("compensations", &self.compensation_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    fn entry(step_id: &str, order: Arc<SyncMutex<Vec<String>>>) -> CompensationEntry {
        let id = step_id.to_string();
        CompensationEntry::new(
            step_id,
            Box::new(move || {
                Box::pin(async move {
                    order.lock().push(id);
                    Ok(())
                })
            }),
        )
    }

    #[test]
    fn values_shared_across_clones() {
        let state = WorkflowState::new();
        let clone = state.clone();
        state.insert("tenant", "acme");
        assert_eq!(clone.get("tenant"), Some(Value::String("acme".into())));
    }

    #[test]
    fn saga_log_mirrored_in_values() {
        let state = WorkflowState::new();
        let order = Arc::new(SyncMutex::new(Vec::new()));
        state.push_compensation(entry("reserve", order.clone()));
        state.push_compensation(entry("charge", order));

        let mirror = state.get(SAGA_LOG_KEY).unwrap();
        assert_eq!(
            mirror,
            Value::Array(vec!["reserve".into(), "charge".into()])
        );
    }

    #[tokio::test]
    async fn rollback_runs_in_reverse_order() {
        let state = WorkflowState::new();
        let order = Arc::new(SyncMutex::new(Vec::new()));
        state.push_compensation(entry("a", order.clone()));
        state.push_compensation(entry("b", order.clone()));
        state.push_compensation(entry("c", order.clone()));

        let undone = state.rollback_to(0).await;
        assert_eq!(undone, vec!["c", "b", "a"]);
        assert_eq!(*order.lock(), vec!["c", "b", "a"]);
        assert_eq!(state.compensation_len(), 0);
    }

    #[tokio::test]
    async fn rollback_respects_checkpoint() {
        let state = WorkflowState::new();
        let order = Arc::new(SyncMutex::new(Vec::new()));
        state.push_compensation(entry("outer", order.clone()));
        let mark = state.compensation_len();
        state.push_compensation(entry("inner_1", order.clone()));
        state.push_compensation(entry("inner_2", order.clone()));

        let undone = state.rollback_to(mark).await;
        assert_eq!(undone, vec!["inner_2", "inner_1"]);
        // The outer entry survives for an enclosing composition to unwind.
        assert_eq!(state.compensation_len(), 1);
    }

    #[tokio::test]
    async fn rollback_continues_past_failing_undo() {
        let state = WorkflowState::new();
        let order = Arc::new(SyncMutex::new(Vec::new()));
        state.push_compensation(entry("first", order.clone()));
        state.push_compensation(CompensationEntry::new(
            "failing",
            Box::new(|| {
                Box::pin(async { Err(crate::error::WeftError::permanent("undo", "boom")) })
            }),
        ));

        let undone = state.rollback_to(0).await;
        assert_eq!(undone, vec!["failing", "first"]);
        assert_eq!(*order.lock(), vec!["first"]);
    }

    #[tokio::test]
    async fn rollback_with_empty_log_is_noop() {
        let state = WorkflowState::new();
        assert!(state.rollback_to(0).await.is_empty());
    }
}
