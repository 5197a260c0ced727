//! Replicated set of segment ids.
//!
//! A `Uint64Set` applies every mutation locally and, if a counterpart has
//! been registered, forwards the same logical operation to the peer context.
//! The peer applies it through [`Uint64Set::apply_remote`], which never
//! re-transmits, so replication is a single hop with no echo.

use std::collections::HashSet;
use std::collections::hash_set;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::Result;
use crate::rpc::protocol::{Batch, RpcMessage, SetOperation};
use crate::rpc::transport::{ReplicationSink, RpcHandle};
use crate::segments::signal::Signal;
use crate::segments::types::{ObjectId, Uint64};

/// Membership change reported through [`Uint64Set::changed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetChange {
    /// A local `add` inserted at least one new value; carries the full batch.
    Added(Batch),
    /// A local `delete` removed at least one value; carries the full batch.
    Removed(Batch),
    /// A local `clear` emptied a non-empty set.
    Cleared,
    /// A remote operation changed the set. Receivers only learn *that*
    /// something changed.
    Changed,
}

struct Counterpart {
    id: ObjectId,
    sink: Arc<dyn ReplicationSink>,
}

impl fmt::Debug for Counterpart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counterpart").field("id", &self.id).finish()
    }
}

/// Iterator over the members of a [`Uint64Set`], in hash order.
pub type Iter<'a> = std::iter::Copied<hash_set::Iter<'a, Uint64>>;

#[derive(Debug, Default)]
pub struct Uint64Set {
    hash_table: HashSet<Uint64>,
    changed: Signal<SetChange>,
    counterpart: Option<Counterpart>,
}

impl Uint64Set {
    /// Creates a purely local set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set whose counterpart is registered with the peer context.
    pub fn with_counterpart(rpc: &RpcHandle) -> Self {
        let id = rpc.register();
        let mut set = Self::new();
        set.attach_counterpart(id, Arc::new(rpc.clone()));
        set
    }

    /// Routes future mutations to `sink` under `id`.
    pub fn attach_counterpart(&mut self, id: ObjectId, sink: Arc<dyn ReplicationSink>) {
        self.counterpart = Some(Counterpart { id, sink });
    }

    pub fn rpc_id(&self) -> Option<ObjectId> {
        self.counterpart.as_ref().map(|counterpart| counterpart.id)
    }

    /// Subscription point for membership changes.
    pub fn changed(&mut self) -> &mut Signal<SetChange> {
        &mut self.changed
    }

    fn add_(&mut self, values: &[Uint64]) -> bool {
        let mut changed = false;
        for value in values {
            changed |= self.hash_table.insert(*value);
        }
        changed
    }

    /// Inserts one or more ids.
    ///
    /// If at least one was new, the whole batch is replicated and a single
    /// [`SetChange::Added`] is dispatched.
    pub fn add(&mut self, value: impl Into<Batch>) {
        let value = value.into();
        if self.add_(value.values()) {
            self.replicate(SetOperation::Add {
                value: value.clone(),
            });
            self.changed.dispatch(&SetChange::Added(value));
        }
    }

    fn delete_(&mut self, values: &[Uint64]) -> bool {
        let mut changed = false;
        for value in values {
            changed |= self.hash_table.remove(value);
        }
        changed
    }

    /// Removes one or more ids. Symmetric to [`Uint64Set::add`].
    pub fn delete(&mut self, value: impl Into<Batch>) {
        let value = value.into();
        if self.delete_(value.values()) {
            self.replicate(SetOperation::Delete {
                value: value.clone(),
            });
            self.changed.dispatch(&SetChange::Removed(value));
        }
    }

    pub fn has(&self, value: Uint64) -> bool {
        self.hash_table.contains(&value)
    }

    fn reserve_(&mut self, capacity: usize) -> bool {
        let before = self.hash_table.capacity();
        let additional = capacity.saturating_sub(self.hash_table.len());
        if let Err(e) = self.hash_table.try_reserve(additional) {
            warn!(capacity, "ignoring reserve hint: {}", e);
            return false;
        }
        self.hash_table.capacity() != before
    }

    /// Preallocates room for `capacity` members in total. Replicated only if
    /// the local capacity actually grew; never dispatches a change.
    pub fn reserve(&mut self, capacity: usize) {
        if self.reserve_(capacity) {
            self.replicate(SetOperation::Reserve { value: capacity });
        }
    }

    fn clear_(&mut self) -> bool {
        if self.hash_table.is_empty() {
            return false;
        }
        self.hash_table.clear();
        true
    }

    pub fn clear(&mut self) {
        if self.clear_() {
            self.replicate(SetOperation::Clear);
            self.changed.dispatch(&SetChange::Cleared);
        }
    }

    pub fn len(&self) -> usize {
        self.hash_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hash_table.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        self.hash_table.iter().copied()
    }

    /// Applies an operation received from the peer context without
    /// re-transmitting it. Dispatches [`SetChange::Changed`] iff the set changed.
    pub fn apply_remote(&mut self, op: SetOperation) -> bool {
        let changed = match op {
            SetOperation::Add { value } => self.add_(value.values()),
            SetOperation::Delete { value } => self.delete_(value.values()),
            SetOperation::Reserve { value } => self.reserve_(value),
            SetOperation::Clear => self.clear_(),
        };
        if changed {
            self.changed.dispatch(&SetChange::Changed);
        }
        changed
    }

    /// Canonical serialization: decimal strings sorted lexicographically,
    /// so "10" precedes "2".
    pub fn to_json(&self) -> Vec<String> {
        let mut result: Vec<String> = self.iter().map(|id| id.to_string()).collect();
        result.sort_unstable();
        result
    }

    /// Replaces the contents with the ids in `value`, a JSON array of decimal
    /// strings. On a parse error the set is left untouched.
    pub fn restore_state(&mut self, value: &serde_json::Value) -> Result<()> {
        let ids: Vec<Uint64> = serde_json::from_value(value.clone())?;
        self.clear();
        if !ids.is_empty() {
            self.add(ids);
        }
        Ok(())
    }

    /// Detaches from the peer and drops every subscriber. Further mutations
    /// stay local.
    pub fn dispose(&mut self) {
        if let Some(counterpart) = self.counterpart.take() {
            counterpart
                .sink
                .invoke(RpcMessage::DisposeObject { id: counterpart.id });
        }
        self.changed.clear();
    }

    fn replicate(&self, op: SetOperation) {
        if let Some(counterpart) = &self.counterpart {
            debug!(object = counterpart.id, ?op, "replicating set operation");
            counterpart.sink.invoke(RpcMessage::Set {
                id: counterpart.id,
                op,
            });
        }
    }
}

impl<'a> IntoIterator for &'a Uint64Set {
    type Item = Uint64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for Uint64Set {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_json())
    }
}
