//! Replication transport.
//!
//! The sending side owns an [`RpcHandle`], an ordered, reliable channel into
//! the peer context that also hands out object ids. The receiving side keeps
//! a [`Counterparts`] registry and dispatches each typed message to the
//! object it addresses.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::rpc::protocol::RpcMessage;
use crate::segments::{ObjectId, Uint64Set};

/// Outbound half of a replication link.
///
/// Objects with no sink attached behave as purely local data structures.
pub trait ReplicationSink: Send + Sync {
    /// Sends `message` to the peer context. Fire-and-forget.
    fn invoke(&self, message: RpcMessage);
}

/// Sending end of the channel between the two contexts.
#[derive(Debug, Clone)]
pub struct RpcHandle {
    sender: mpsc::UnboundedSender<RpcMessage>,
    next_id: Arc<AtomicU64>,
}

impl RpcHandle {
    /// Creates a connected handle/receiver pair.
    pub fn channel() -> (RpcHandle, mpsc::UnboundedReceiver<RpcMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = RpcHandle {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (handle, receiver)
    }

    /// Allocates a fresh object id and asks the peer to create its counterpart.
    pub fn register(&self) -> ObjectId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.invoke(RpcMessage::NewObject { id });
        id
    }

    /// True once the receiving context has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl ReplicationSink for RpcHandle {
    fn invoke(&self, message: RpcMessage) {
        let id = message.object_id();
        if self.sender.send(message).is_err() {
            warn!(object = id, "peer context is gone, dropping replication message");
        }
    }
}

/// Receiving-side registry of replicated objects, keyed by object id.
#[derive(Debug, Default)]
pub struct Counterparts {
    objects: HashMap<ObjectId, Uint64Set>,
    halted: HashSet<ObjectId>,
}

impl Counterparts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one message. Returns whether any object's membership changed.
    ///
    /// A message for an unregistered id is a protocol violation: the id is
    /// halted and later messages for it are dropped until it is registered
    /// again. Other objects are unaffected.
    pub fn handle(&mut self, message: RpcMessage) -> Result<bool> {
        match message {
            RpcMessage::NewObject { id } => {
                if self.objects.contains_key(&id) {
                    return Err(Error::ProtocolViolation(format!(
                        "object {} registered twice",
                        id
                    )));
                }
                self.halted.remove(&id);
                self.objects.insert(id, Uint64Set::new());
                debug!(object = id, "counterpart created");
                Ok(false)
            }
            RpcMessage::DisposeObject { id } => match self.objects.remove(&id) {
                Some(mut set) => {
                    set.dispose();
                    debug!(object = id, "counterpart disposed");
                    Ok(false)
                }
                None => Err(self.halt(id)),
            },
            RpcMessage::Set { id, op } => {
                if self.halted.contains(&id) {
                    debug!(object = id, "dropping message for halted object");
                    return Ok(false);
                }
                match self.objects.get_mut(&id) {
                    Some(set) => Ok(set.apply_remote(op)),
                    None => Err(self.halt(id)),
                }
            }
        }
    }

    fn halt(&mut self, id: ObjectId) -> Error {
        self.halted.insert(id);
        Error::UnknownObject(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Uint64Set> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Uint64Set> {
        self.objects.get_mut(&id)
    }

    pub fn is_halted(&self, id: ObjectId) -> bool {
        self.halted.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Canonical serialization of every registered set, ordered by object id.
    pub fn snapshot(&self) -> BTreeMap<ObjectId, Vec<String>> {
        self.objects
            .iter()
            .map(|(id, set)| (*id, set.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::protocol::{Batch, SetOperation};
    use crate::segments::Uint64;

    fn add(id: ObjectId, values: &[u64]) -> RpcMessage {
        RpcMessage::Set {
            id,
            op: SetOperation::Add {
                value: Batch::Many(values.iter().copied().map(Uint64::new).collect()),
            },
        }
    }

    #[test]
    fn test_register_allocates_distinct_ids() {
        let (rpc, mut receiver) = RpcHandle::channel();
        let first = rpc.register();
        let second = rpc.register();
        assert_ne!(first, second);

        assert_eq!(receiver.try_recv().unwrap(), RpcMessage::NewObject { id: first });
        assert_eq!(receiver.try_recv().unwrap(), RpcMessage::NewObject { id: second });
    }

    #[test]
    fn test_send_after_peer_closed_is_dropped() {
        let (rpc, receiver) = RpcHandle::channel();
        drop(receiver);
        assert!(rpc.is_closed());
        // Must not panic.
        rpc.invoke(add(1, &[1]));
    }

    #[test]
    fn test_dispatch_by_object_id() {
        let mut counterparts = Counterparts::new();
        counterparts.handle(RpcMessage::NewObject { id: 1 }).unwrap();
        counterparts.handle(RpcMessage::NewObject { id: 2 }).unwrap();

        assert!(counterparts.handle(add(2, &[7, 8])).unwrap());
        assert!(!counterparts.handle(add(2, &[7])).unwrap());

        assert!(counterparts.get(1).unwrap().is_empty());
        assert!(counterparts.get(2).unwrap().has(Uint64::new(8)));
        assert_eq!(counterparts.snapshot()[&2], vec!["7", "8"]);
    }

    #[test]
    fn test_unknown_object_halts_only_that_channel() {
        let mut counterparts = Counterparts::new();
        counterparts.handle(RpcMessage::NewObject { id: 1 }).unwrap();

        let err = counterparts.handle(add(5, &[1])).unwrap_err();
        assert!(err.is_protocol_violation());
        assert!(counterparts.is_halted(5));

        // Further traffic for the halted id is dropped, not re-reported.
        assert!(!counterparts.handle(add(5, &[2])).unwrap());
        // The healthy object keeps working.
        assert!(counterparts.handle(add(1, &[3])).unwrap());

        // Re-registering clears the halt.
        counterparts.handle(RpcMessage::NewObject { id: 5 }).unwrap();
        assert!(!counterparts.is_halted(5));
        assert!(counterparts.handle(add(5, &[2])).unwrap());
    }

    #[test]
    fn test_duplicate_registration_is_a_violation() {
        let mut counterparts = Counterparts::new();
        counterparts.handle(RpcMessage::NewObject { id: 1 }).unwrap();
        let err = counterparts.handle(RpcMessage::NewObject { id: 1 }).unwrap_err();
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_dispose_removes_counterpart() {
        let mut counterparts = Counterparts::new();
        counterparts.handle(RpcMessage::NewObject { id: 4 }).unwrap();
        counterparts.handle(RpcMessage::DisposeObject { id: 4 }).unwrap();
        assert!(counterparts.get(4).is_none());
        assert!(counterparts.handle(RpcMessage::DisposeObject { id: 4 }).is_err());
    }
}
