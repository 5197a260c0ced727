//! Wire protocol between the control and compute contexts.
//!
//! Every message is addressed to a replicated object by the [`ObjectId`] it
//! was assigned at registration. Messages for the same object are applied in
//! the order they were sent; there are no acknowledgements.

use serde::{Deserialize, Serialize};

use crate::segments::{ObjectId, Uint64};

/// One identifier or a batch of identifiers, as carried by `add`/`delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Batch {
    One(Uint64),
    Many(Vec<Uint64>),
}

impl Batch {
    pub fn values(&self) -> &[Uint64] {
        match self {
            Batch::One(value) => std::slice::from_ref(value),
            Batch::Many(values) => values,
        }
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

impl From<Uint64> for Batch {
    fn from(value: Uint64) -> Self {
        Batch::One(value)
    }
}

impl From<Vec<Uint64>> for Batch {
    fn from(values: Vec<Uint64>) -> Self {
        Batch::Many(values)
    }
}

impl From<&[Uint64]> for Batch {
    fn from(values: &[Uint64]) -> Self {
        Batch::Many(values.to_vec())
    }
}

impl<const N: usize> From<[Uint64; N]> for Batch {
    fn from(values: [Uint64; N]) -> Self {
        Batch::Many(values.to_vec())
    }
}

/// Mutations replicated for a `Uint64Set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SetOperation {
    Add { value: Batch },
    Delete { value: Batch },
    Reserve { value: usize },
    Clear,
}

/// A message delivered to the peer context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RpcMessage {
    /// Creates an empty counterpart registered under `id`.
    NewObject { id: ObjectId },
    /// Removes the counterpart registered under `id`.
    DisposeObject { id: ObjectId },
    /// Applies `op` to the counterpart registered under `id`.
    Set { id: ObjectId, op: SetOperation },
}

impl RpcMessage {
    pub fn object_id(&self) -> ObjectId {
        match self {
            RpcMessage::NewObject { id }
            | RpcMessage::DisposeObject { id }
            | RpcMessage::Set { id, .. } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_accepts_single_value_or_array() {
        let one: Batch = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(one, Batch::One(Uint64::new(5)));

        let many: Batch = serde_json::from_str("[\"5\", \"18446744073709551615\"]").unwrap();
        assert_eq!(many.values(), &[Uint64::new(5), Uint64::MAX]);
    }

    #[test]
    fn test_message_wire_format() {
        let message = RpcMessage::Set {
            id: 3,
            op: SetOperation::Add {
                value: Batch::from(vec![Uint64::new(1), Uint64::new(2)]),
            },
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "set",
                "id": 3,
                "op": { "type": "add", "value": ["1", "2"] }
            })
        );
        assert_eq!(message.object_id(), 3);

        let clear: RpcMessage =
            serde_json::from_str(r#"{"kind":"set","id":9,"op":{"type":"clear"}}"#).unwrap();
        assert_eq!(
            clear,
            RpcMessage::Set {
                id: 9,
                op: SetOperation::Clear
            }
        );
    }
}
