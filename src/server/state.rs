//! State owned by the control context and shared with the HTTP handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::rpc::protocol::Batch;
use crate::rpc::transport::{Counterparts, RpcHandle};
use crate::segments::{DisjointUint64Sets, ObjectId, Uint64, Uint64Set};

/// Commands accepted from clients.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    Add { value: Batch },
    Delete { value: Batch },
    Clear,
    Reserve { value: usize },
    Link { a: Uint64, b: Uint64 },
    DeleteSet { value: Uint64 },
    GetState,
}

/// Serialized view of the control context.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    pub segments: Vec<String>,
    pub equivalences: Vec<Vec<String>>,
    pub generation: u64,
}

/// Segment state of one viewer session, on the control side.
#[derive(Debug)]
pub struct ControlContext {
    /// Replicated to the compute context.
    pub visible_segments: Uint64Set,
    /// Local to the control context.
    pub equivalences: DisjointUint64Sets,
}

impl ControlContext {
    pub fn new(rpc: &RpcHandle) -> Self {
        ControlContext {
            visible_segments: Uint64Set::with_counterpart(rpc),
            equivalences: DisjointUint64Sets::new(),
        }
    }

    /// Applies `command`. Returns whether any state changed.
    pub fn apply(&mut self, command: ClientCommand) -> bool {
        match command {
            ClientCommand::Add { value } => {
                let before = self.visible_segments.len();
                self.visible_segments.add(value);
                self.visible_segments.len() != before
            }
            ClientCommand::Delete { value } => {
                let before = self.visible_segments.len();
                self.visible_segments.delete(value);
                self.visible_segments.len() != before
            }
            ClientCommand::Clear => {
                let changed = !self.visible_segments.is_empty();
                self.visible_segments.clear();
                changed
            }
            ClientCommand::Reserve { value } => {
                self.visible_segments.reserve(value);
                false
            }
            ClientCommand::Link { a, b } => self.equivalences.link(a, b),
            ClientCommand::DeleteSet { value } => self.equivalences.delete_set(value),
            ClientCommand::GetState => false,
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            segments: self.visible_segments.to_json(),
            equivalences: self.equivalences.to_json(),
            generation: self.equivalences.generation(),
        }
    }
}

/// Everything the handlers need: the control context, and a read-only
/// window onto the compute context's counterparts.
pub struct SharedState {
    pub control: Mutex<ControlContext>,
    pub compute: Arc<parking_lot::Mutex<Counterparts>>,
}

impl SharedState {
    pub fn compute_snapshot(&self) -> BTreeMap<ObjectId, Vec<String>> {
        self.compute.lock().snapshot()
    }
}

/// Shared application state
pub type AppState = Arc<SharedState>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::worker::CounterpartWorker;

    fn command(json: &str) -> ClientCommand {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_command_wire_format() {
        assert_eq!(
            command(r#"{"type":"add","value":["1","2"]}"#),
            ClientCommand::Add {
                value: Batch::Many(vec![Uint64::new(1), Uint64::new(2)])
            }
        );
        assert_eq!(
            command(r#"{"type":"link","a":"10","b":"20"}"#),
            ClientCommand::Link {
                a: Uint64::new(10),
                b: Uint64::new(20)
            }
        );
        assert_eq!(command(r#"{"type":"get_state"}"#), ClientCommand::GetState);
        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"add","value":"x"}"#).is_err());
    }

    #[test]
    fn test_apply_replicates_visible_segments_only() {
        let (rpc, receiver) = RpcHandle::channel();
        let mut worker = CounterpartWorker::new(receiver);
        let mut control = ControlContext::new(&rpc);
        let id = control.visible_segments.rpc_id().unwrap();

        assert!(control.apply(command(r#"{"type":"add","value":["2","10"]}"#)));
        assert!(!control.apply(command(r#"{"type":"add","value":"2"}"#)));
        assert!(!control.apply(command(
            r#"{"type":"reserve","value":18446744073709551615}"#
        )));
        assert!(control.apply(command(r#"{"type":"link","a":"10","b":"20"}"#)));
        assert!(!control.apply(command(r#"{"type":"link","a":"20","b":"10"}"#)));

        worker.drain_pending();
        let compute = worker.counterparts();
        assert_eq!(compute.lock().snapshot()[&id], vec!["10", "2"]);

        let snapshot = control.snapshot();
        assert_eq!(snapshot.segments, vec!["10", "2"]);
        assert_eq!(snapshot.equivalences, vec![vec!["10", "20"]]);
        assert_eq!(snapshot.generation, 1);

        assert!(control.apply(command(r#"{"type":"delete_set","value":"20"}"#)));
        assert!(control.apply(command(r#"{"type":"clear"}"#)));
        assert!(!control.apply(command(r#"{"type":"clear"}"#)));
        worker.drain_pending();
        assert!(compute.lock().get(id).unwrap().is_empty());
    }
}
